mod support;

use kernel_realm::{RealmState, Transferable};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use support::Rig;

#[test]
fn kill_through_schedule_stops_an_infinite_loop() {
    let rig = Rig::new(&[]);
    let mut realm = rig.manager.spawn("spin.js").expect("realm spawns");
    let err = realm
        .run("schedule(realm(), 'kill(realm())'); while (true) {}", "spin.js")
        .unwrap_err();
    assert!(err.is_termination(), "{err:?}");
    assert_eq!(realm.state(), RealmState::Terminated);

    let handle = realm.handle().clone();
    realm.dispose();
    assert_eq!(handle.state(), RealmState::Disposed);
}

#[test]
fn nested_realm_can_kill_its_caller() {
    let rig = Rig::new(&[]);
    let mut realm = rig.manager.spawn("parent.js").expect("realm spawns");
    let err = realm
        .run(
            "var stopped = iso('kill(parent)', { parent: realm() });
             while (true) {}",
            "parent.js",
        )
        .unwrap_err();
    assert!(err.is_termination());
    assert_eq!(realm.state(), RealmState::Terminated);
    assert!(rig.recorder.failures().is_empty());
}

#[test]
fn kill_on_a_finished_realm_is_a_no_op() {
    let rig = Rig::new(&[]);
    let result = rig.eval("var h = iso('realm()'); [typeof h, kill(h), kill(h)].join()");
    assert_eq!(result.unwrap(), Transferable::from("object,false,false"));
}

#[test]
fn kill_rejects_non_handles() {
    let rig = Rig::new(&[]);
    let err = rig.eval("kill(1)").unwrap_err();
    let failure = err.to_string();
    assert!(
        failure.contains("TypeError: kill: expected a realm handle, got number"),
        "{failure}"
    );
}

#[test]
fn schedule_runs_at_the_next_safe_point() {
    let rig = Rig::new(&[]);
    let result = rig.eval("var queued = schedule(realm(), 'var late = 7'); [queued, typeof late].join()");
    assert_eq!(result.unwrap(), Transferable::from("true,number"));
}

#[test]
fn terminate_from_another_thread() {
    let (tx, rx) = mpsc::channel();
    let worker = thread::spawn(move || {
        let rig = Rig::new(&[]);
        let mut realm = rig.manager.spawn("stuck.js").expect("realm spawns");
        tx.send(realm.handle().clone()).expect("receiver alive");
        let outcome = realm.run("var n = 0; while (true) { n++; }", "stuck.js");
        let state = realm.state();
        realm.dispose();
        (outcome.map_err(|e| e.is_termination()), state)
    });

    let handle = rx.recv().expect("worker sends its handle");
    while handle.state() != RealmState::Running {
        thread::sleep(Duration::from_millis(1));
    }
    assert!(handle.terminate());

    let (outcome, state) = worker.join().expect("worker does not panic");
    assert_eq!(outcome, Err(true));
    assert_eq!(state, RealmState::Terminated);
    assert_eq!(handle.state(), RealmState::Disposed);
    assert!(!handle.terminate());
}
