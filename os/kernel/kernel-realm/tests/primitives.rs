mod support;

use kernel_realm::{Capabilities, RealmError, Transferable};
use kernel_script::{Interrupt, ScriptError};
use support::{KEYBOARD_JS, MODULE_JS, Rig};

fn text(s: &str) -> Transferable {
    Transferable::from(s)
}

fn number(n: f64) -> Transferable {
    Transferable::Number(n)
}

fn uncaught(err: RealmError) -> String {
    match err {
        RealmError::Script(ScriptError::Uncaught(failure)) => failure.message,
        other => panic!("expected an uncaught exception, got {other:?}"),
    }
}

#[test]
fn eval_runs_in_the_calling_context() {
    let rig = Rig::new(&[]);
    assert_eq!(rig.eval("var a = 2; eval('var b = a * 21', 'e.js'); b").unwrap(), number(42.0));

    let err = rig.eval("eval('var = 1', 'e.js')").unwrap_err();
    let message = uncaught(err);
    assert!(message.starts_with("Uncaught SyntaxError:"), "{message}");
    assert!(message.contains("e.js:1:"), "{message}");
}

#[test]
fn load_reads_text_or_gives_undefined() {
    let rig = Rig::new(&[("hello.txt", "hi there"), ("dir/a.js", "1")]);
    assert_eq!(rig.eval("load('/hello.txt')").unwrap(), text("hi there"));
    assert_eq!(rig.eval("load('dir/a.js')").unwrap(), text("1"));
    assert_eq!(rig.eval("typeof load('/missing.txt')").unwrap(), text("undefined"));
}

#[test]
fn require_from_the_boot_image() {
    let rig = Rig::new(&[
        ("module.js", MODULE_JS),
        ("keyboard.js", KEYBOARD_JS),
        ("math.js", "exports.twice = function (x) { return 2 * x; }; var loaded = 1;"),
        ("user.js", "var math = require('math.js'); module.exports = math.twice(5) + 1;"),
    ]);
    let program = "
        var require = exec({ load: load, exec: exec }, 'module.js', load('/module.js'));
        var key = require('keyboard.js');
        var same = require('/math.js') === require('math.js');
        [require('user.js'), same, key(0x1E), key(0x1C) === '\\n', typeof key(0x9E), typeof loaded].join()
    ";
    assert_eq!(rig.eval(program).unwrap(), text("11,true,a,true,undefined,undefined"));

    let err = rig
        .eval("exec({ load: load, exec: exec }, 'module.js', load('/module.js'))('nope.js')")
        .unwrap_err();
    assert_eq!(uncaught(err), "Uncaught cannot find module /nope.js");
}

#[test]
fn poll_drains_most_recent_first() {
    let rig = Rig::new(&[]);
    rig.deliver(&[0x21, 0x22, 0x23]);
    assert_eq!(rig.controller.acks.get(), 3);
    assert_eq!(
        rig.eval("[poll(), poll(), poll(), typeof poll()].join()").unwrap(),
        text("35,34,33,undefined")
    );
}

#[test]
fn ticks_follow_timer_interrupts() {
    let rig = Rig::new(&[]);
    assert_eq!(rig.eval("ticks()").unwrap(), number(0.0));
    rig.timer(3);
    assert_eq!(rig.controller.eois.get(), 3);
    assert_eq!(rig.eval("ticks()").unwrap(), number(3.0));

    let mut realm = rig.manager.spawn("t.js").expect("realm spawns");
    let bridge = rig.bridge;
    let queued = realm.handle().request_interrupt(Interrupt::Host(Box::new(move |_: &mut kernel_script::Isolate| {
        // SAFETY: stands in for the timer handler between two statements.
        let ctx = unsafe { kernel_events::InterruptContext::enter() };
        bridge.handle_timer_interrupt(&ctx, &support::CountingController::default());
        Ok(())
    })));
    assert!(queued);
    let result = realm.run("var before = ticks(); var after = ticks(); after - before", "t.js");
    assert!(matches!(result.unwrap(), Transferable::Number(n) if n == 0.0 || n == 1.0));
    assert_eq!(rig.eval("ticks()").unwrap(), number(4.0));
}

#[test]
fn port_io_reaches_the_port_backend() {
    let rig = Rig::new(&[]);
    rig.ports.0.borrow_mut().inputs.insert(0x60, 0x1C);
    assert_eq!(rig.eval("outb(0x3F8, 65); outb(0x80, 0x1FF); inb(0x60)").unwrap(), number(28.0));
    assert_eq!(rig.ports.0.borrow().writes, [(0x3F8, 65), (0x80, 0xFF)]);
}

#[test]
fn buff_views_physical_memory() {
    let rig = Rig::new(&[]);
    let mut cells = vec![0u16; 4];
    let base = cells.as_mut_ptr() as usize;

    let program = format!(
        "var b = buff({base}, 8, 2);
         b[0] = 0x0741;
         b[3] = 0x11234;
         b[4] = 9;
         [b.length, b[0], typeof b[4], '' + b].join()"
    );
    assert_eq!(rig.eval(&program).unwrap(), text("4,1857,undefined,[object Buffer]"));
    assert_eq!(cells, [0x0741, 0, 0, 0x1234]);

    let bytes = format!("var b = buff({base}, 3); b[1] = 0xAB; b.length");
    assert_eq!(rig.eval(&bytes).unwrap(), number(3.0));
    assert_eq!(cells[0], 0xAB41);
}

#[test]
fn buff_rejects_bad_arguments() {
    let rig = Rig::new(&[]);
    let mut cells = vec![0u32; 2];
    let base = cells.as_mut_ptr() as usize;

    let misaligned = uncaught(rig.eval(&format!("buff({}, 4, 4)", base + 1)).unwrap_err());
    assert!(misaligned.contains("is not aligned to 4 bytes"), "{misaligned}");

    let width = uncaught(rig.eval(&format!("buff({base}, 4, 3)")).unwrap_err());
    assert!(width.contains("buff: width must be 1, 2 or 4"), "{width}");

    let negative = uncaught(rig.eval("buff(-1, 4)").unwrap_err());
    assert!(negative.contains("non-negative integers"), "{negative}");
}

#[test]
fn capability_sets_shape_the_namespace() {
    let rig = Rig::new(&[]);
    let probe = "[typeof inb, typeof outb, typeof buff, typeof print, typeof iso].join()";

    let mut restricted = rig
        .manager
        .spawn_with("r.js", Capabilities::restricted())
        .expect("realm spawns");
    assert_eq!(
        restricted.run(probe, "r.js").unwrap(),
        text("undefined,undefined,undefined,function,function")
    );

    let mut bare = rig
        .manager
        .spawn_with("bare.js", Capabilities::new().with_print(true))
        .expect("realm spawns");
    assert_eq!(
        bare.run(probe, "bare.js").unwrap(),
        text("undefined,undefined,undefined,function,undefined")
    );
}

#[test]
fn print_joins_its_arguments() {
    let rig = Rig::new(&[]);
    rig.eval("print('a', 1, true, [1, 2]); print()").unwrap();
    assert_eq!(rig.recorder.lines(), ["a 1 true 1,2", ""]);
}

#[test]
fn realm_handle_is_opaque() {
    let rig = Rig::new(&[]);
    assert_eq!(rig.eval("'' + realm()").unwrap(), text("[object Realm]"));
    assert_eq!(rig.eval("typeof realm()").unwrap(), text("object"));
}
