use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicUsize, Ordering};

/// Bump allocator over an inline byte array.
///
/// Memory handed out by the arena is never reclaimed. It is meant for the
/// handful of copies the boot path makes before the heap exists.
#[repr(C, align(16))]
pub struct StaticArena<const N: usize> {
    bytes: UnsafeCell<[u8; N]>,
    next: AtomicUsize,
}

// SAFETY: each byte range is handed out exactly once via `next`.
unsafe impl<const N: usize> Sync for StaticArena<N> {}

impl<const N: usize> Default for StaticArena<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> StaticArena<N> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bytes: UnsafeCell::new([0; N]),
            next: AtomicUsize::new(0),
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn used(&self) -> usize {
        self.next.load(Ordering::Acquire)
    }

    /// Reserve `len` bytes aligned to `align` (a power of two).
    #[allow(clippy::mut_from_ref)]
    pub fn alloc_bytes(&self, len: usize, align: usize) -> Option<&mut [u8]> {
        debug_assert!(align.is_power_of_two());
        let base = self.bytes.get().cast::<u8>() as usize;

        let mut current = self.next.load(Ordering::Relaxed);
        loop {
            let start = (base + current).next_multiple_of(align) - base;
            let end = start.checked_add(len).filter(|&end| end <= N)?;
            match self.next.compare_exchange_weak(
                current,
                end,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                // SAFETY: [start, end) was just claimed and lies within the array.
                Ok(_) => {
                    return Some(unsafe {
                        core::slice::from_raw_parts_mut(self.bytes.get().cast::<u8>().add(start), len)
                    });
                }
                Err(seen) => current = seen,
            }
        }
    }

    /// Copy `s` into the arena.
    pub fn copy_str(&self, s: &str) -> Option<&str> {
        let dst = self.alloc_bytes(s.len(), 1)?;
        dst.copy_from_slice(s.as_bytes());
        core::str::from_utf8(dst).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hands_out_disjoint_aligned_ranges() {
        let arena = StaticArena::<64>::new();
        let a = arena.alloc_bytes(3, 1).unwrap().as_ptr() as usize;
        let b = arena.alloc_bytes(8, 8).unwrap().as_ptr() as usize;
        assert_eq!(b % 8, 0);
        assert!(b >= a + 3);
    }

    #[test]
    fn refuses_when_exhausted() {
        let arena = StaticArena::<16>::new();
        assert!(arena.alloc_bytes(12, 1).is_some());
        assert!(arena.alloc_bytes(8, 1).is_none());
        assert_eq!(arena.used(), 12);
    }

    #[test]
    fn copies_strings() {
        let arena = StaticArena::<32>::new();
        let s = arena.copy_str("mode=selftest").unwrap();
        assert_eq!(s, "mode=selftest");
        assert_eq!(arena.copy_str(""), Some(""));
    }
}
