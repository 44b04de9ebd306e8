mod support;

use kernel_bootstrap::{BootError, ModeOutcome, SELF_TESTS, run_mode};
use kernel_realm::{RealmError, RealmState};
use support::Machine;

#[test]
fn run_mode_runs_the_entry_script() {
    let machine = Machine::default();
    let ctx = machine
        .boot(&[("/boot/main.js", "var x = 1;")], "entry=/boot/main.js")
        .unwrap();
    let ModeOutcome::Entry(handle) = run_mode(&ctx).unwrap() else {
        panic!("expected the entry realm");
    };
    assert_eq!(handle.name(), "boot/main.js");
    assert_eq!(handle.state(), RealmState::Disposed);
}

#[test]
fn run_mode_needs_the_entry_script() {
    let machine = Machine::default();
    let ctx = machine.boot(&[("/other.js", "1")], "").unwrap();
    let err = run_mode(&ctx).unwrap_err();
    assert!(matches!(
        err,
        BootError::Realm(RealmError::MissingEntry { ref path }) if path == "/init.js"
    ));
}

#[test]
fn failing_entry_script_still_completes_the_mode() {
    let machine = Machine::default();
    let ctx = machine.boot(&[("/init.js", "missing()")], "").unwrap();
    assert!(matches!(run_mode(&ctx), Ok(ModeOutcome::Entry(_))));
}

#[test]
fn selftests_pass() {
    let machine = Machine::default();
    let ctx = machine.boot(&[("/init.js", "1")], "mode=selftest").unwrap();
    let ModeOutcome::SelfTest(report) = run_mode(&ctx).unwrap() else {
        panic!("expected a selftest report");
    };
    assert_eq!(report.failed, Vec::<&str>::new());
    assert!(report.is_success());
    assert_eq!(report.passed, SELF_TESTS.len());
    assert_eq!(ctx.keys.get("selftest.termination").as_deref(), Some("pass"));
}

#[test]
fn selftests_notice_a_broken_configuration() {
    let machine = Machine::default();
    let ctx = machine
        .boot(&[("/init.js", "1")], "mode=selftest nest=1")
        .unwrap();
    let ModeOutcome::SelfTest(report) = run_mode(&ctx).unwrap() else {
        panic!("expected a selftest report");
    };
    assert!(report.failed.contains(&"nested realm"));
    assert_eq!(ctx.keys.get("selftest.nested realm").as_deref(), Some("fail"));
    assert_eq!(ctx.keys.get("selftest.arithmetic").as_deref(), Some("pass"));
}

#[test]
fn snapshot_compiles_every_script() {
    let machine = Machine::default();
    let ctx = machine
        .boot(
            &[
                ("/init.js", "var a = 1; a + 1;"),
                ("/broken.js", "var = ;"),
                ("/hello.txt", "not a script"),
            ],
            "mode=snapshot",
        )
        .unwrap();
    let ModeOutcome::Snapshot(entries) = run_mode(&ctx).unwrap() else {
        panic!("expected a snapshot manifest");
    };

    let paths: Vec<_> = entries.iter().map(|e| e.path).collect();
    assert_eq!(paths, ["broken.js", "init.js"]);
    assert!(entries[0].result.is_err());
    assert_eq!(entries[1].result, Ok(2));
    assert_eq!(entries[1].bytes, 17);

    let manifest = ctx.keys.with_prefix("snapshot.");
    assert_eq!(manifest.len(), 2);
    assert_eq!(manifest[1].1, "ok 17 bytes, 2 statements");
    assert!(manifest[0].1.starts_with("error "));
}
