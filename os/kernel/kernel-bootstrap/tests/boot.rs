mod support;

use kernel_alloc::HeapError;
use kernel_bootstrap::{BootError, LocateError, Stage};
use kernel_events::{InterruptContext, InterruptController, PortIo};
use kernel_info::cmdline::{BootMode, CapabilityProfile};
use kernel_realm::Transferable;
use packer_abi::unbundle::BundleError;
use support::{FakePlatform, KEYBOARD_PORT, KEYBOARD_VECTOR, Machine};

const INIT: (&str, &str) = ("/init.js", "print('hello'); 1");

#[test]
fn stages_reach_the_platform_in_order() {
    let machine = Machine::default();
    machine.boot(&[INIT], "").unwrap();
    assert_eq!(
        machine.platform.calls(),
        ["boot services", "mask", "interrupts", "heap", "cpu 0", "ports", "enable"]
    );
    assert!(machine.slots.is_booted());
    assert!(machine.heap.is_core_active(0));
}

#[test]
fn context_exposes_every_singleton() {
    let machine = Machine::default();
    let ctx = machine
        .boot(&[INIT, ("/lib/a.js", "1")], "mode=selftest caps=restricted nest=3 vga=off")
        .unwrap();

    assert_eq!(ctx.boot_services.console, "test");
    assert_eq!(ctx.memory.phys_offset, 0);
    assert_eq!(ctx.interrupts.timer_vector, 0xE0);
    assert_eq!(ctx.allocator.core, 0);
    assert!(ctx.allocator.stats.capacity > 0);
    assert_eq!(ctx.cpu.apic_id, 10);

    assert_eq!(ctx.params.cmdline(), "mode=selftest caps=restricted nest=3 vga=off");
    assert_eq!(ctx.config().mode, BootMode::SelfTest);
    assert_eq!(ctx.config().capabilities, CapabilityProfile::Restricted);
    assert_eq!(ctx.realms.config().nest_limit, 3);
    assert_eq!(ctx.keys.get("vga").as_deref(), Some("off"));

    assert_eq!(ctx.image.paths(), ["init.js", "lib/a.js"]);
    assert_eq!(ctx.image.get("/lib/a.js"), Some(&b"1"[..]));
    assert_eq!(ctx.trace.target, "realm");
}

#[test]
fn singletons_live_in_their_slots() {
    let machine = Machine::default();
    let ctx = machine.boot(&[INIT], "").unwrap();
    let core = machine.slots.core(0).unwrap();
    assert!(std::ptr::eq(core.cpu().unwrap(), ctx.cpu));
    assert!(std::ptr::eq(core.allocator().unwrap(), ctx.allocator));
}

#[test]
fn booting_twice_is_refused() {
    let machine = Machine::default();
    machine.boot(&[INIT], "").unwrap();
    let err = machine.boot(&[INIT], "").unwrap_err();
    assert!(matches!(err, BootError::AlreadyConstructed(Stage::BootServices)));
}

#[test]
fn a_missing_boot_block_stops_the_boot() {
    let machine = Machine::default();
    let err = unsafe { machine.bootstrap.boot(std::ptr::null()) }.unwrap_err();
    assert!(matches!(err, BootError::Locate(LocateError::MissingBootInfo)));
    assert_eq!(machine.platform.calls(), ["boot services"]);
    assert!(!machine.slots.is_booted());
}

#[test]
fn an_image_that_is_not_a_bundle_stops_the_boot() {
    let machine = Machine::default();
    let block = support::boot_block(b"definitely not a bundle, but long enough to have a header", "");
    let err = unsafe { machine.bootstrap.boot(&raw const block.info) }.unwrap_err();
    assert!(matches!(err, BootError::Image(BundleError::BadMagic)));
}

#[test]
fn heap_that_never_came_up_stops_the_boot() {
    let machine = Machine::new(FakePlatform {
        skip_heap: true,
        ..FakePlatform::default()
    });
    let err = machine.boot(&[INIT], "").unwrap_err();
    assert!(matches!(err, BootError::Heap(HeapError::NotActive)));
    assert!(!machine.slots.is_booted());
    assert!(!machine.platform.calls().contains(&"enable".to_string()));
}

#[test]
fn secondary_cores_run_their_own_stages() {
    let machine = Machine::default();

    let err = machine.bootstrap.boot_secondary(1).unwrap_err();
    assert!(matches!(err, BootError::Heap(HeapError::NotActive)));

    machine.boot(&[INIT], "").unwrap();
    let ctx = machine.bootstrap.boot_secondary(2).unwrap();
    assert_eq!(ctx.cpu.core, 2);
    assert_eq!(ctx.allocator.core, 2);
    assert!(machine.heap.is_core_active(2));
    assert_eq!(machine.platform.calls().last().map(String::as_str), Some("cpu 2"));

    assert!(matches!(
        machine.bootstrap.boot_secondary(2),
        Err(BootError::AlreadyConstructed(Stage::AllocatorActivation))
    ));
    assert!(matches!(
        machine.bootstrap.boot_secondary(0),
        Err(BootError::CoreOutOfRange(0))
    ));
    assert!(matches!(
        machine.bootstrap.boot_secondary(99),
        Err(BootError::CoreOutOfRange(99))
    ));
}

struct Keyboard(u8);

impl PortIo for Keyboard {
    unsafe fn inb(&self, port: u16) -> u8 {
        assert_eq!(port, KEYBOARD_PORT);
        self.0
    }

    unsafe fn outb(&self, _port: u16, _value: u8) {}
}

struct Quiet;

impl InterruptController for Quiet {
    fn acknowledge(&self, _vector: u8) {}

    fn end_of_interrupt(&self) {}
}

#[test]
fn interrupts_reach_booted_realms() {
    let machine = Machine::default();
    let ctx = machine.boot(&[INIT], "").unwrap();

    let irq = unsafe { InterruptContext::enter() };
    machine
        .bridge
        .handle_device_interrupt(&irq, KEYBOARD_VECTOR, &Keyboard(0x1E), &Quiet);
    machine.bridge.handle_timer_interrupt(&irq, &Quiet);
    drop(irq);

    let seen = ctx
        .realms
        .run_nested("[poll(), inb(0x60), ticks(), poll()].join(',')", Vec::new())
        .unwrap();
    assert_eq!(seen, Transferable::from("33,255,1,"));
}
