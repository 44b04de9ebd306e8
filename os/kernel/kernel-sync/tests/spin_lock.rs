use kernel_sync::SpinLock;
use std::collections::VecDeque;
use std::sync::{Arc, Barrier};
use std::{panic, thread};

#[test]
fn guard_releases_on_drop() {
    let lock = SpinLock::new(VecDeque::new());
    {
        let mut inbox = lock.lock();
        inbox.push_back("first");
        assert!(lock.is_locked());
    }
    assert!(!lock.is_locked());
    assert_eq!(lock.lock().pop_front(), Some("first"));
}

#[test]
fn try_lock_fails_while_held() {
    let lock = SpinLock::new(0_u8);
    let held = lock.lock();
    assert!(lock.try_lock().is_none());
    assert_eq!(lock.try_with_lock(|v| *v), None);
    drop(held);
    assert_eq!(lock.try_with_lock(|v| *v + 1), Some(1));
}

#[test]
fn try_lock_on_a_free_lock_never_fails() {
    let lock = SpinLock::new(0_u32);
    for _ in 0..10_000 {
        let mut guard = lock.try_lock().expect("uncontended");
        *guard += 1;
    }
    assert_eq!(lock.into_inner(), 10_000);
}

#[test]
fn get_mut_and_into_inner_bypass_locking() {
    let mut lock = SpinLock::new(vec![1, 2]);
    lock.get_mut().push(3);
    assert_eq!(lock.into_inner(), vec![1, 2, 3]);
}

#[test]
fn concurrent_producers_lose_nothing() {
    const PRODUCERS: usize = 6;
    const PER_PRODUCER: usize = 2_000;

    let inbox = Arc::new(SpinLock::new(VecDeque::new()));
    let start = Arc::new(Barrier::new(PRODUCERS));

    let handles: Vec<_> = (0..PRODUCERS)
        .map(|id| {
            let inbox = Arc::clone(&inbox);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                for n in 0..PER_PRODUCER {
                    inbox.with_lock(|q| q.push_back((id, n)));
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    let drained = inbox.with_lock(|q| core::mem::take(q));
    assert_eq!(drained.len(), PRODUCERS * PER_PRODUCER);

    // each producer's messages stay in its own submission order
    for id in 0..PRODUCERS {
        let seq: Vec<_> = drained
            .iter()
            .filter(|(p, _)| *p == id)
            .map(|(_, n)| *n)
            .collect();
        assert!(seq.windows(2).all(|w| w[0] < w[1]));
    }
}

#[test]
fn panic_inside_critical_section_unlocks() {
    let lock = SpinLock::new(0_u32);
    let res = panic::catch_unwind(panic::AssertUnwindSafe(|| {
        lock.with_lock(|v| {
            *v = 9;
            panic!("boom");
        });
    }));
    assert!(res.is_err());
    assert_eq!(lock.with_lock(|v| *v), 9);
}

#[test]
fn spin_lock_is_sync_for_send_payloads() {
    fn takes_sync<S: Sync>(_: &S) {}
    takes_sync(&SpinLock::new(String::new()));
}
