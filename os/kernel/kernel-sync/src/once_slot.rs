use core::{
    cell::UnsafeCell,
    fmt,
    hint::spin_loop,
    mem::MaybeUninit,
    sync::atomic::{AtomicU8, Ordering},
};

const EMPTY: u8 = 0;
const WRITING: u8 = 1;
const READY: u8 = 2;

/// Write-once storage with a stable address.
///
/// The slot can live in a `static` and be filled long after the program
/// started, without touching an allocator. Once filled, the value is never
/// moved or dropped for as long as the slot lives, so [`as_ptr`](Self::as_ptr)
/// and the reference returned by [`get`](Self::get) always name the same
/// storage.
pub struct OnceSlot<T> {
    state: AtomicU8,
    value: UnsafeCell<MaybeUninit<T>>,
}

/// Returned by [`OnceSlot::set`] when the slot was already filled; hands the
/// rejected value back.
pub struct SlotOccupied<T>(pub T);

impl<T> fmt::Debug for SlotOccupied<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SlotOccupied")
    }
}

impl<T> Default for OnceSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> OnceSlot<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(EMPTY),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        self.state.load(Ordering::Acquire) == READY
    }

    /// Address of the backing storage, valid whether or not the slot is filled.
    #[inline]
    pub const fn as_ptr(&self) -> *const T {
        self.value.get().cast::<T>().cast_const()
    }

    #[inline]
    pub fn get(&self) -> Option<&T> {
        if self.is_set() {
            // SAFETY: READY is only published after the write completed.
            Some(unsafe { (*self.value.get()).assume_init_ref() })
        } else {
            None
        }
    }

    /// Fill the slot exactly once.
    ///
    /// # Errors
    /// Returns the value back inside [`SlotOccupied`] if the slot is already
    /// filled or another writer is in progress.
    pub fn set(&self, value: T) -> Result<&T, SlotOccupied<T>> {
        if self
            .state
            .compare_exchange(EMPTY, WRITING, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return Err(SlotOccupied(value));
        }

        // SAFETY: WRITING makes us the only writer.
        let stored = unsafe { (*self.value.get()).write(value) };
        self.state.store(READY, Ordering::Release);
        Ok(stored)
    }

    /// Fill the slot with `init()` unless it is already filled.
    pub fn get_or_init(&self, init: impl FnOnce() -> T) -> &T {
        if let Some(v) = self.get() {
            return v;
        }

        if self
            .state
            .compare_exchange(EMPTY, WRITING, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            // SAFETY: WRITING makes us the only writer.
            unsafe { (*self.value.get()).write(init()) };
            self.state.store(READY, Ordering::Release);
        }

        while !self.is_set() {
            spin_loop();
        }

        // SAFETY: READY
        unsafe { (*self.value.get()).assume_init_ref() }
    }
}

impl<T> Drop for OnceSlot<T> {
    fn drop(&mut self) {
        if *self.state.get_mut() == READY {
            // SAFETY: READY means initialized, and `&mut self` means unshared.
            unsafe { self.value.get_mut().assume_init_drop() };
        }
    }
}

// SAFETY: shared access only happens after READY; writes are single-writer.
unsafe impl<T: Sync + Send> Sync for OnceSlot<T> {}
unsafe impl<T: Send> Send for OnceSlot<T> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_once_then_reject() {
        let slot = OnceSlot::new();
        assert!(slot.get().is_none());

        let first = slot.set(7_u32).map(|v| *v).ok();
        assert_eq!(first, Some(7));

        let second = slot.set(9);
        assert!(matches!(second, Err(SlotOccupied(9))));
        assert_eq!(slot.get(), Some(&7));
    }

    #[test]
    fn address_is_stable() {
        let slot = OnceSlot::new();
        let before = slot.as_ptr();
        let stored = slot.set([1_u8; 32]).ok().expect("empty slot");
        assert!(core::ptr::eq(before, stored));
        assert!(core::ptr::eq(before, slot.get().expect("filled")));
    }

    #[test]
    fn get_or_init_runs_once() {
        let slot = OnceSlot::new();
        let mut calls = 0;
        let a = *slot.get_or_init(|| {
            calls += 1;
            5
        });
        let b = *slot.get_or_init(|| 6);
        assert_eq!((a, b, calls), (5, 5, 1));
    }

    #[test]
    fn drops_stored_value() {
        use std::rc::Rc;
        let marker = Rc::new(());
        {
            let slot = OnceSlot::new();
            let _ = slot.set(Rc::clone(&marker));
            assert_eq!(Rc::strong_count(&marker), 2);
        }
        assert_eq!(Rc::strong_count(&marker), 1);
    }
}
