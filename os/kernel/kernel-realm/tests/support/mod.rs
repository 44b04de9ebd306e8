#![allow(dead_code)]

use kernel_events::{InterruptBridge, InterruptContext, InterruptController, PortIo};
use kernel_realm::services::{DirectMap, ResourceStore};
use kernel_realm::{DiagnosticSink, RealmConfig, RealmHandle, RealmManager, Services};
use kernel_script::Failure;
use packer_abi::bundle::BundleBuilder;
use packer_abi::unbundle::Bundle;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

pub const MODULE_JS: &str = include_str!("../../../../../initrd/module.js");
pub const KEYBOARD_JS: &str = include_str!("../../../../../initrd/keyboard.js");

/// Collects everything realms report.
#[derive(Default)]
pub struct Recorder {
    pub failures: RefCell<Vec<String>>,
    pub lines: RefCell<Vec<String>>,
}

impl DiagnosticSink for Recorder {
    fn report(&self, realm: &RealmHandle, failure: &Failure) {
        self.failures.borrow_mut().push(format!("{}: {failure}", realm.name()));
    }

    fn print(&self, _realm: &RealmHandle, line: &str) {
        self.lines.borrow_mut().push(line.to_string());
    }
}

impl Recorder {
    pub fn failures(&self) -> Vec<String> {
        self.failures.borrow().clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }
}

#[derive(Default)]
pub struct PortState {
    pub inputs: HashMap<u16, u8>,
    pub writes: Vec<(u16, u8)>,
}

#[derive(Clone, Default)]
pub struct FakePorts(pub Rc<RefCell<PortState>>);

impl PortIo for FakePorts {
    unsafe fn inb(&self, port: u16) -> u8 {
        self.0.borrow().inputs.get(&port).copied().unwrap_or(0xFF)
    }

    unsafe fn outb(&self, port: u16, value: u8) {
        self.0.borrow_mut().writes.push((port, value));
    }
}

#[derive(Default)]
pub struct CountingController {
    pub acks: Cell<u32>,
    pub eois: Cell<u32>,
}

impl InterruptController for CountingController {
    fn acknowledge(&self, _vector: u8) {
        self.acks.set(self.acks.get() + 1);
    }

    fn end_of_interrupt(&self) {
        self.eois.set(self.eois.get() + 1);
    }
}

/// A realm manager over fake hardware.
pub struct Rig {
    pub manager: RealmManager,
    pub recorder: Rc<Recorder>,
    pub ports: FakePorts,
    pub bridge: &'static InterruptBridge,
    pub controller: CountingController,
}

impl Rig {
    pub fn new(files: &[(&str, &str)]) -> Self {
        Self::with_config(files, RealmConfig::default())
    }

    pub fn with_config(files: &[(&str, &str)], config: RealmConfig) -> Self {
        let bridge: &'static InterruptBridge = Box::leak(Box::new(InterruptBridge::new()));
        let recorder = Rc::new(Recorder::default());
        let ports = FakePorts::default();
        let services = Services {
            resources: Box::new(bundle(files)),
            ports: Box::new(ports.clone()),
            memory: Box::new(DirectMap::new(0)),
            events: Box::new(bridge.take_consumer().expect("fresh bridge")),
            ticks: Box::new(bridge.ticks()),
            diagnostics: recorder.clone(),
        };
        Self {
            manager: RealmManager::new(services, config),
            recorder,
            ports,
            bridge,
            controller: CountingController::default(),
        }
    }

    /// Delivers device interrupts in order, as the handler stubs would.
    pub fn deliver(&self, vectors: &[u8]) {
        for &vector in vectors {
            // SAFETY: single-threaded test standing in for a masked handler.
            let ctx = unsafe { InterruptContext::enter() };
            self.bridge
                .handle_device_interrupt(&ctx, vector, &self.ports, &self.controller);
        }
    }

    pub fn timer(&self, count: u32) {
        for _ in 0..count {
            // SAFETY: as in `deliver`.
            let ctx = unsafe { InterruptContext::enter() };
            self.bridge.handle_timer_interrupt(&ctx, &self.controller);
        }
    }

    /// Runs `source` in a fresh top-level realm and renders the completion.
    pub fn eval(&self, source: &str) -> Result<kernel_realm::Transferable, kernel_realm::RealmError> {
        let mut realm = self.manager.spawn("test.js")?;
        let result = realm.run(source, "test.js");
        realm.dispose();
        result
    }
}

pub fn bundle(files: &[(&str, &str)]) -> Bundle<'static> {
    let mut builder = BundleBuilder::new();
    for (path, contents) in files {
        builder.add(path, contents.as_bytes().to_vec());
    }
    let blob: &'static [u8] = Box::leak(builder.finish().into_boxed_slice());
    let bundle = Bundle::parse(blob).expect("bundle parses");
    assert_eq!(bundle.paths().len(), files.len());
    bundle
}
