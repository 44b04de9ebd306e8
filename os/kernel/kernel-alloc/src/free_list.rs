use core::mem::size_of;
use core::ptr;

/// Granularity of every block boundary.
const GRAIN: usize = 16;

/// Written right in front of every payload handed out.
#[repr(C)]
struct Tag {
    block_start: usize,
    block_len: usize,
}

/// Lives at the start of every free block.
#[repr(C)]
struct Free {
    len: usize,
    next: *mut Free,
}

const TAG: usize = size_of::<Tag>();
const MIN_BLOCK: usize = 2 * GRAIN;

const _: () = assert!(TAG <= GRAIN && size_of::<Free>() <= MIN_BLOCK);

/// Address-ordered first-fit free list.
///
/// Blocks start and end on [`GRAIN`] boundaries. A used block carries a
/// [`Tag`] directly before its payload so `release` can recover the block
/// without trusting the caller's layout.
pub(crate) struct FreeList {
    head: *mut Free,
    free_bytes: usize,
}

// SAFETY: the list is only touched under the heap's spin lock.
unsafe impl Send for FreeList {}

impl FreeList {
    pub(crate) const fn empty() -> Self {
        Self {
            head: ptr::null_mut(),
            free_bytes: 0,
        }
    }

    pub(crate) const fn free_bytes(&self) -> usize {
        self.free_bytes
    }

    /// Hand `[start, start + len)` to the list.
    ///
    /// # Safety
    /// The range must be writable, unused and owned by this list from now on.
    pub(crate) unsafe fn add_region(&mut self, start: usize, len: usize) {
        let aligned = start.next_multiple_of(GRAIN);
        let end = (start + len) & !(GRAIN - 1);
        if end > aligned && end - aligned >= MIN_BLOCK {
            unsafe { self.insert(aligned, end - aligned) };
        }
    }

    /// # Safety
    /// Caller holds the heap lock.
    pub(crate) unsafe fn take(&mut self, size: usize, align: usize) -> *mut u8 {
        let align = align.max(GRAIN);
        let size = size.max(1);

        let mut link: *mut *mut Free = &raw mut self.head;
        // SAFETY: every node on the list is a valid `Free` header.
        unsafe {
            while !(*link).is_null() {
                let block = *link;
                let start = block as usize;
                let end = start + (*block).len;

                let payload = (start + TAG).next_multiple_of(align);
                let used_end = (payload + size).next_multiple_of(GRAIN);
                if used_end <= end {
                    *link = (*block).next;
                    self.free_bytes -= end - start;

                    let block_end = if end - used_end >= MIN_BLOCK {
                        self.insert(used_end, end - used_end);
                        used_end
                    } else {
                        end
                    };

                    let tag = (payload - TAG) as *mut Tag;
                    tag.write(Tag {
                        block_start: start,
                        block_len: block_end - start,
                    });
                    return payload as *mut u8;
                }
                link = &raw mut (*block).next;
            }
        }
        ptr::null_mut()
    }

    /// # Safety
    /// `payload` came from [`take`](Self::take) on this list and was not yet released.
    pub(crate) unsafe fn release(&mut self, payload: *mut u8) {
        let tag = unsafe { ((payload as usize - TAG) as *const Tag).read() };
        unsafe { self.insert(tag.block_start, tag.block_len) };
    }

    /// Insert in address order and merge with touching neighbours.
    unsafe fn insert(&mut self, start: usize, len: usize) {
        self.free_bytes += len;

        let mut prev: *mut Free = ptr::null_mut();
        let mut next = self.head;
        // SAFETY: list nodes are valid `Free` headers; `start` is owned by us.
        unsafe {
            while !next.is_null() && (next as usize) < start {
                prev = next;
                next = (*next).next;
            }

            let node = start as *mut Free;
            node.write(Free { len, next });

            if !next.is_null() && start + len == next as usize {
                (*node).len += (*next).len;
                (*node).next = (*next).next;
            }

            if prev.is_null() {
                self.head = node;
            } else if prev as usize + (*prev).len == start {
                (*prev).len += (*node).len;
                (*prev).next = (*node).next;
            } else {
                (*prev).next = node;
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn block_count(&self) -> usize {
        let mut n = 0;
        let mut cur = self.head;
        while !cur.is_null() {
            n += 1;
            cur = unsafe { (*cur).next };
        }
        n
    }
}
