mod support;

use kernel_realm::{Capabilities, RealmConfig, RealmError, RealmState, Transferable};
use support::Rig;

fn text(s: &str) -> Transferable {
    Transferable::from(s)
}

#[test]
fn create_realm_runs_entry_and_disposes() {
    let rig = Rig::new(&[]);
    let handle = rig
        .manager
        .create_realm("print('booted', 1 + 1);", "boot.js")
        .expect("realm spawns");
    assert_eq!(rig.recorder.lines(), ["booted 2"]);
    assert!(rig.recorder.failures().is_empty());
    assert_eq!(handle.state(), RealmState::Disposed);
    assert_eq!(handle.name(), "boot.js");
    assert_eq!(handle.depth(), 0);
}

#[test]
fn uncaught_exception_is_reported_and_realm_still_disposed() {
    let rig = Rig::new(&[]);
    let handle = rig
        .manager
        .create_realm("var ok = 1;\nmissing();", "boot.js")
        .expect("realm spawns");

    assert_eq!(handle.state(), RealmState::Disposed);
    let failures = rig.recorder.failures();
    assert_eq!(failures.len(), 1);
    let report = &failures[0];
    assert!(report.contains("boot.js:2: Uncaught ReferenceError: missing is not defined"), "{report}");
    assert!(report.contains("missing();"), "{report}");
    assert!(report.contains('^'), "{report}");
}

#[test]
fn compile_error_is_reported() {
    let rig = Rig::new(&[]);
    let handle = rig.manager.create_realm("var = 3;", "bad.js").expect("realm spawns");
    assert_eq!(handle.state(), RealmState::Disposed);
    let failures = rig.recorder.failures();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].contains("bad.js:1: SyntaxError"), "{}", failures[0]);
}

#[test]
fn run_entry_reads_the_boot_image() {
    let rig = Rig::new(&[("init.js", "print(load('/note.txt'))"), ("note.txt", "from disk")]);
    let handle = rig.manager.run_entry("/init.js").expect("entry exists");
    assert_eq!(handle.name(), "init.js");
    assert_eq!(rig.recorder.lines(), ["from disk"]);

    let missing = rig.manager.run_entry("/nope.js").unwrap_err();
    assert!(matches!(missing, RealmError::MissingEntry { ref path } if path == "/nope.js"));
}

#[test]
fn a_realm_runs_only_once() {
    let rig = Rig::new(&[]);
    let mut realm = rig.manager.spawn("once.js").expect("realm spawns");
    assert_eq!(realm.state(), RealmState::Created);
    assert_eq!(realm.run("6 * 7", "once.js").unwrap(), Transferable::Number(42.0));
    assert_eq!(realm.state(), RealmState::Completed);

    let again = realm.run("1", "once.js").unwrap_err();
    assert!(matches!(again, RealmError::AlreadyRan { state: RealmState::Completed, .. }));

    let handle = realm.handle().clone();
    rig.manager.dispose(realm);
    assert_eq!(handle.state(), RealmState::Disposed);
}

#[test]
fn bindings_and_globals() {
    let rig = Rig::new(&[]);
    let mut realm = rig.manager.spawn("bound.js").expect("realm spawns");
    realm.bind("greeting", text("hi")).unwrap();
    realm.bind("count", Transferable::Number(2.0)).unwrap();
    let result = realm.run("var reply = greeting + ' x' + count; var obj = {}; reply", "bound.js");
    assert_eq!(result.unwrap(), text("hi x2"));
    assert_eq!(realm.global("reply"), Some(text("hi x2")));
    assert_eq!(realm.global("obj"), None);
    assert_eq!(realm.global("absent"), None);
}

#[test]
fn objects_do_not_leak_between_realms() {
    let rig = Rig::new(&[]);
    let mut a = rig.manager.spawn("a.js").expect("realm spawns");
    a.run("var secret = { value: 1 }; secret.value", "a.js").unwrap();

    let mut b = rig.manager.spawn("b.js").expect("realm spawns");
    assert_eq!(b.run("typeof secret", "b.js").unwrap(), text("undefined"));
    assert_ne!(a.handle(), b.handle());

    assert_eq!(
        rig.eval("var secret = { value: 1 }; iso('typeof secret')").unwrap(),
        text("undefined")
    );
}

#[test]
fn exec_delegate_is_the_one_way_in() {
    let rig = Rig::new(&[]);
    let result = rig.eval(
        "var shared = { hits: 0 };
         exec({ shared: shared }, 'inner.js', 'shared.hits = shared.hits + 1');
         shared.hits",
    );
    assert_eq!(result.unwrap(), Transferable::Number(1.0));
}

#[test]
fn proxy_context_snapshot_and_fallthrough() {
    let rig = Rig::new(&[]);
    assert_eq!(
        rig.eval("exec({ a: 1, b: 2 }, 'sum.js', 'a + b')").unwrap(),
        Transferable::Number(3.0)
    );

    let result = rig.eval(
        "var d = { a: 1 };
         d.self = d;
         exec(d, 'late.js', 'self.late = 5; var got = late; a + got')",
    );
    assert_eq!(result.unwrap(), Transferable::Number(6.0));

    // A property the delegate already had is read from the copy taken at
    // creation, even after the delegate changes it.
    let snapshot = rig.eval(
        "var d = { a: 1 };
         d.self = d;
         exec(d, 's.js', 'self.a = 9; [a, self.a].join()')",
    );
    assert_eq!(snapshot.unwrap(), text("1,9"));

    let writes = rig.eval(
        "var d = { a: 1 };
         exec(d, 'w.js', 'var a = 10; var fresh = 1;');
         [d.a, typeof d.fresh].join()",
    );
    assert_eq!(writes.unwrap(), text("1,undefined"));
}

#[test]
fn iso_blocks_and_leaves_caller_state_alone() {
    let rig = Rig::new(&[]);
    assert_eq!(rig.eval("iso('1+1')").unwrap(), Transferable::Number(2.0));
    assert_eq!(
        rig.eval("var x = 1; var r = iso('var x = 40; x + 2'); [r, x].join()").unwrap(),
        text("42,1")
    );
}

#[test]
fn iso_transfers_bindings_and_results() {
    let rig = Rig::new(&[]);
    assert_eq!(
        rig.eval("iso('label + n + typeof obj', { label: 'n=', n: 3, obj: {} })").unwrap(),
        text("n=3undefined")
    );
    assert_eq!(
        rig.eval("typeof iso('var o = { a: 1 }; o')").unwrap(),
        text("undefined")
    );
    assert_eq!(
        rig.eval("var h = realm(); iso('typeof parent', { parent: h })").unwrap(),
        text("object")
    );
}

#[test]
fn nested_failure_is_reported_and_caller_continues() {
    let rig = Rig::new(&[]);
    let result = rig.eval("var r = iso(\"throw 'boom'\"); typeof r");
    assert_eq!(result.unwrap(), text("undefined"));
    let failures = rig.recorder.failures();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].starts_with("iso: iso:1: Uncaught boom"), "{}", failures[0]);

    // Compile errors take the same path: reported, `undefined` in the caller.
    let result = rig.eval("var r = iso('var = ;'); [typeof r, 'after'].join()");
    assert_eq!(result.unwrap(), text("undefined,after"));
    let failures = rig.recorder.failures();
    assert_eq!(failures.len(), 2);
    assert!(failures[1].contains("SyntaxError"), "{}", failures[1]);
}

#[test]
fn nesting_beyond_the_limit_throws() {
    let config = RealmConfig {
        nest_limit: 1,
        ..RealmConfig::default()
    };
    let rig = Rig::with_config(&[], config);
    assert_eq!(rig.eval("iso('2')").unwrap(), Transferable::Number(2.0));

    let result = rig.eval("typeof iso(\"iso('1')\")");
    assert_eq!(result.unwrap(), text("undefined"));
    let failures = rig.recorder.failures();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].contains("RangeError: realm nesting limit of 1 reached"), "{}", failures[0]);

    let err = rig.manager.run_nested("1", Vec::new());
    assert_eq!(err.unwrap(), Transferable::Number(1.0));
}

#[test]
fn nested_realms_inherit_capabilities() {
    let rig = Rig::new(&[]);
    let mut realm = rig
        .manager
        .spawn_with("plain.js", Capabilities::restricted())
        .expect("realm spawns");
    let result = realm.run("iso('typeof inb + typeof iso')", "plain.js");
    assert_eq!(result.unwrap(), text("undefinedfunction"));
}

#[test]
fn heap_budget_applies_per_realm() {
    let config = RealmConfig {
        isolate: kernel_script::IsolateConfig {
            max_objects: 64,
            ..kernel_script::IsolateConfig::DEFAULT
        },
        ..RealmConfig::default()
    };
    let rig = Rig::with_config(&[], config);
    let err = rig
        .eval("var all = []; while (true) { all.push({}); }")
        .unwrap_err();
    let RealmError::Script(script) = err else {
        panic!("expected a script error, got {err:?}");
    };
    let failure = script.failure().expect("uncaught");
    assert!(failure.message.contains("heap budget exhausted"), "{}", failure.message);

    // a fresh realm starts with a fresh budget
    assert_eq!(rig.eval("[{}, {}].length").unwrap(), Transferable::Number(2.0));
}

fn small_heap() -> RealmConfig {
    RealmConfig {
        isolate: kernel_script::IsolateConfig {
            max_objects: 64,
            ..kernel_script::IsolateConfig::DEFAULT
        },
        ..RealmConfig::default()
    }
}

#[test]
fn exec_in_a_loop_reuses_its_proxy_global() {
    let rig = Rig::with_config(&[], small_heap());
    let result = rig.eval(
        "var d = { a: 1 };
         var n = 0;
         for (var i = 0; i < 5000; i++) { n += exec(d, 'x.js', 'a'); }
         n",
    );
    assert_eq!(result.unwrap(), Transferable::Number(5000.0));
}

#[test]
fn proxy_globals_count_against_the_heap_budget() {
    let rig = Rig::with_config(&[], small_heap());
    // The closure keeps its proxy scope alive, so every global stays.
    let err = rig
        .eval(
            "var d = { a: 1 };
             var keep = [];
             while (true) { keep.push(exec(d, 'x.js', 'function f() { return a; } f')); }",
        )
        .unwrap_err();
    let RealmError::Script(script) = err else {
        panic!("expected a script error, got {err:?}");
    };
    let failure = script.failure().expect("uncaught");
    assert!(failure.message.contains("heap budget exhausted"), "{}", failure.message);
}
