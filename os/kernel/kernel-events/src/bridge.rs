use crate::event::InterruptEvent;
use crate::ports::PortIo;
use crate::stack::{Consumer, EventStack};
use crate::ticks::TickCounter;
use core::marker::PhantomData;
use core::sync::atomic::{AtomicU32, Ordering};
use kernel_info::memory::EVENT_CAPACITY;

/// Proof that the current code is an interrupt handler running with
/// interrupts masked.
///
/// Only interrupt entry code creates one, and it cannot leave the handler
/// (`!Send`, borrowed by everything derived from it).
pub struct InterruptContext {
    _not_send: PhantomData<*const ()>,
}

impl InterruptContext {
    /// # Safety
    /// Call only at the top of an interrupt handler entered through an
    /// interrupt gate (so `IF` is clear), and drop before `iretq`.
    #[inline]
    #[must_use]
    pub const unsafe fn enter() -> Self {
        Self {
            _not_send: PhantomData,
        }
    }
}

/// Acknowledgement side of the interrupt controller.
pub trait InterruptController {
    /// Tell the controller a device interrupt on `vector` was serviced.
    /// Until this happens no further interrupts of that vector arrive.
    fn acknowledge(&self, vector: u8);

    /// End-of-interrupt write to the local timer's register window.
    fn end_of_interrupt(&self);
}

pub type BridgeConsumer<'a> = Consumer<'a, EVENT_CAPACITY>;

const NO_PORT: u32 = 0;
const PORT_SET: u32 = 1 << 16;

/// Per-core interrupt event state: the event stack, the tick counter and the
/// payload port table.
pub struct InterruptBridge {
    events: EventStack<EVENT_CAPACITY>,
    ticks: TickCounter,
    payload_ports: [AtomicU32; 256],
}

impl Default for InterruptBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl InterruptBridge {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            events: EventStack::new(),
            ticks: TickCounter::new(),
            payload_ports: [const { AtomicU32::new(NO_PORT) }; 256],
        }
    }

    /// Read `port` whenever `vector` fires and store the byte in the event.
    pub fn set_payload_port(&self, vector: u8, port: Option<u16>) {
        match port {
            Some(p) => log::debug!("vector {vector:#x}: payload from port {p:#x}"),
            None => log::debug!("vector {vector:#x}: no payload port"),
        }
        let raw = port.map_or(NO_PORT, |p| PORT_SET | u32::from(p));
        self.payload_ports[usize::from(vector)].store(raw, Ordering::Release);
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn payload_port(&self, vector: u8) -> Option<u16> {
        let raw = self.payload_ports[usize::from(vector)].load(Ordering::Acquire);
        (raw & PORT_SET != 0).then_some(raw as u16)
    }

    /// Device interrupt body: read payload, record, acknowledge.
    ///
    /// Allocation-free and non-blocking. Interrupts are unmasked again by the
    /// `iretq` that ends the handler.
    pub fn handle_device_interrupt(
        &self,
        ctx: &InterruptContext,
        vector: u8,
        ports: &impl PortIo,
        controller: &impl InterruptController,
    ) {
        let event = match self.payload_port(vector) {
            // SAFETY: the port was registered for exactly this device.
            Some(port) => InterruptEvent::with_payload(vector, unsafe { ports.inb(port) }),
            None => InterruptEvent::new(vector),
        };

        self.events.producer(ctx).push(event);

        controller.acknowledge(vector);
    }

    /// Timer interrupt body: count the tick and signal end of interrupt.
    pub fn handle_timer_interrupt(
        &self,
        ctx: &InterruptContext,
        controller: &impl InterruptController,
    ) {
        self.ticks.increment(ctx);
        controller.end_of_interrupt();
    }

    pub fn ticks(&self) -> &TickCounter {
        &self.ticks
    }

    pub fn events(&self) -> &EventStack<EVENT_CAPACITY> {
        &self.events
    }

    /// The script-side consumer; handed out once.
    pub fn take_consumer(&self) -> Option<BridgeConsumer<'_>> {
        let consumer = self.events.take_consumer();
        if consumer.is_none() {
            log::warn!("interrupt event consumer already taken");
        }
        consumer
    }
}
