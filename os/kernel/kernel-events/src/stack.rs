use crate::bridge::InterruptContext;
use crate::event::InterruptEvent;
use core::marker::PhantomData;
use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};

/// Bounded single-producer/single-consumer LIFO of interrupt events.
///
/// When the stack is full, new events are dropped and counted.
pub struct EventStack<const N: usize> {
    slots: [AtomicU32; N],
    len: AtomicUsize,
    dropped: AtomicU64,
    consumer_taken: AtomicBool,
}

impl<const N: usize> Default for EventStack<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> EventStack<N> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: [const { AtomicU32::new(0) }; N],
            len: AtomicUsize::new(0),
            dropped: AtomicU64::new(0),
            consumer_taken: AtomicBool::new(false),
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Events lost to a full stack since boot.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// The push side, bound to the handler that asked for it.
    pub const fn producer<'a>(&'a self, _ctx: &'a InterruptContext) -> Producer<'a, N> {
        Producer {
            stack: self,
            _not_send: PhantomData,
        }
    }

    /// The one consumer handle; `None` once it has been handed out.
    pub fn take_consumer(&self) -> Option<Consumer<'_, N>> {
        self.consumer_taken
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
            .then_some(Consumer {
                stack: self,
                _not_sync: PhantomData,
            })
    }
}

/// Push side; only exists inside an interrupt handler.
pub struct Producer<'a, const N: usize> {
    stack: &'a EventStack<N>,
    _not_send: PhantomData<*const ()>,
}

impl<const N: usize> Producer<'_, N> {
    /// Returns `false` if the event was dropped because the stack is full.
    pub fn push(&self, event: InterruptEvent) -> bool {
        let s = self.stack;
        let n = s.len.load(Ordering::Relaxed);
        if n == N {
            s.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        s.slots[n].store(event.encode(), Ordering::Relaxed);
        s.len.store(n + 1, Ordering::Release);
        true
    }
}

/// Pop side; polled from script context with interrupts enabled.
pub struct Consumer<'a, const N: usize> {
    stack: &'a EventStack<N>,
    _not_sync: PhantomData<core::cell::Cell<()>>,
}

impl<const N: usize> Consumer<'_, N> {
    /// Remove and return the most recent event, or `None` when empty.
    ///
    /// An interrupt may push while we read; the length check makes the pop
    /// retry, and it then returns the newer event.
    pub fn pop(&self) -> Option<InterruptEvent> {
        let s = self.stack;
        let mut n = s.len.load(Ordering::Acquire);
        loop {
            if n == 0 {
                return None;
            }
            let raw = s.slots[n - 1].load(Ordering::Relaxed);
            match s
                .len
                .compare_exchange(n, n - 1, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return Some(InterruptEvent::decode(raw)),
                Err(now) => n = now,
            }
        }
    }

    pub fn pending(&self) -> usize {
        self.stack.len()
    }

    pub fn dropped(&self) -> u64 {
        self.stack.dropped()
    }
}
