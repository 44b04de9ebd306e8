use crate::free_list::FreeList;
use core::alloc::{GlobalAlloc, Layout};
use core::ptr;
use core::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use kernel_sync::SpinLock;

#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum HeapError {
    #[error("the kernel heap is already active")]
    AlreadyActive,
    #[error("the kernel heap is not active yet")]
    NotActive,
    #[error("heap region of {0} bytes is too small")]
    RegionTooSmall(usize),
    #[error("core {0} is out of range for per-core activation")]
    CoreOutOfRange(u32),
    #[error("core {0} already activated its heap structures")]
    CoreAlreadyActive(u32),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct HeapStats {
    pub capacity: usize,
    pub free: usize,
    pub live_allocations: usize,
}

/// The kernel's global allocator.
///
/// Inactive until [`activate`](Self::activate); while inactive every
/// allocation returns null.
pub struct KernelHeap {
    list: SpinLock<FreeList>,
    active: AtomicBool,
    capacity: AtomicUsize,
    live: AtomicUsize,
    cores: AtomicU64,
}

impl Default for KernelHeap {
    fn default() -> Self {
        Self::new()
    }
}

impl KernelHeap {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            list: SpinLock::new(FreeList::empty()),
            active: AtomicBool::new(false),
            capacity: AtomicUsize::new(0),
            live: AtomicUsize::new(0),
            cores: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Turn the heap on over `[start, start + len)`. Boot core, once.
    ///
    /// # Safety
    /// The region must be writable and used by nothing else, for the lifetime
    /// of the heap.
    ///
    /// # Errors
    /// [`HeapError::AlreadyActive`] on a second call,
    /// [`HeapError::RegionTooSmall`] if the region cannot hold a block.
    pub unsafe fn activate(&self, start: *mut u8, len: usize) -> Result<(), HeapError> {
        if self.is_active() {
            return Err(HeapError::AlreadyActive);
        }

        let free = self.list.with_lock(|list| {
            unsafe { list.add_region(start as usize, len) };
            list.free_bytes()
        });
        if free == 0 {
            return Err(HeapError::RegionTooSmall(len));
        }

        self.capacity.store(free, Ordering::Relaxed);
        self.active.store(true, Ordering::Release);
        log::debug!("kernel heap active: {free} bytes at {start:p}");
        Ok(())
    }

    /// Record that `core` has set up its core-local allocator state.
    ///
    /// # Errors
    /// The shared heap must already be active and each core activates once.
    pub fn activate_core(&self, core: u32) -> Result<(), HeapError> {
        if !self.is_active() {
            return Err(HeapError::NotActive);
        }
        let bit = 1_u64
            .checked_shl(core)
            .ok_or(HeapError::CoreOutOfRange(core))?;
        let before = self.cores.fetch_or(bit, Ordering::AcqRel);
        if before & bit != 0 {
            return Err(HeapError::CoreAlreadyActive(core));
        }
        Ok(())
    }

    pub fn is_core_active(&self, core: u32) -> bool {
        1_u64
            .checked_shl(core)
            .is_some_and(|bit| self.cores.load(Ordering::Acquire) & bit != 0)
    }

    pub fn stats(&self) -> HeapStats {
        HeapStats {
            capacity: self.capacity.load(Ordering::Relaxed),
            free: self.list.with_lock(|l| l.free_bytes()),
            live_allocations: self.live.load(Ordering::Relaxed),
        }
    }
}

unsafe impl GlobalAlloc for KernelHeap {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if !self.is_active() {
            return ptr::null_mut();
        }
        let p = self
            .list
            .with_lock(|l| unsafe { l.take(layout.size(), layout.align()) });
        if !p.is_null() {
            self.live.fetch_add(1, Ordering::Relaxed);
        }
        p
    }

    unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
        if ptr.is_null() {
            return;
        }
        self.list.with_lock(|l| unsafe { l.release(ptr) });
        self.live.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(len: usize) -> *mut u8 {
        let mem = vec![0_u128; len / 16].into_boxed_slice();
        Box::leak(mem).as_mut_ptr().cast()
    }

    #[test]
    fn refuses_allocations_before_activation() {
        let heap = KernelHeap::new();
        let p = unsafe { heap.alloc(Layout::new::<u64>()) };
        assert!(p.is_null());
        assert_eq!(heap.activate_core(0), Err(HeapError::NotActive));
    }

    #[test]
    fn serves_allocations_after_activation() {
        let heap = KernelHeap::new();
        unsafe { heap.activate(region(8192), 8192) }.unwrap();

        let layout = Layout::from_size_align(200, 32).unwrap();
        let p = unsafe { heap.alloc(layout) };
        assert!(!p.is_null());
        assert_eq!(p as usize % 32, 0);
        assert_eq!(heap.stats().live_allocations, 1);

        unsafe { heap.dealloc(p, layout) };
        let stats = heap.stats();
        assert_eq!(stats.live_allocations, 0);
        assert_eq!(stats.free, stats.capacity);
    }

    #[test]
    fn activation_happens_once() {
        let heap = KernelHeap::new();
        unsafe { heap.activate(region(4096), 4096) }.unwrap();
        assert_eq!(
            unsafe { heap.activate(region(4096), 4096) },
            Err(HeapError::AlreadyActive)
        );
    }

    #[test]
    fn tiny_region_is_rejected() {
        let heap = KernelHeap::new();
        assert_eq!(
            unsafe { heap.activate(region(16), 16) },
            Err(HeapError::RegionTooSmall(16))
        );
        assert!(!heap.is_active());
    }

    #[test]
    fn per_core_activation_is_tracked() {
        let heap = KernelHeap::new();
        unsafe { heap.activate(region(4096), 4096) }.unwrap();
        heap.activate_core(0).unwrap();
        heap.activate_core(3).unwrap();
        assert!(heap.is_core_active(3));
        assert!(!heap.is_core_active(1));
        assert_eq!(heap.activate_core(3), Err(HeapError::CoreAlreadyActive(3)));
        assert_eq!(heap.activate_core(64), Err(HeapError::CoreOutOfRange(64)));
    }
}
