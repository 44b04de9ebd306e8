//! Legacy 8259 pair, remapped above the CPU exceptions.

use kernel_events::PortIo;
use kernel_events::ports::X86Ports;

const PRIMARY_COMMAND: u16 = 0x20;
const PRIMARY_DATA: u16 = 0x21;
const SECONDARY_COMMAND: u16 = 0xA0;
const SECONDARY_DATA: u16 = 0xA1;

const ICW1_INIT: u8 = 0x11;
const ICW4_8086: u8 = 0x01;
const EOI: u8 = 0x20;

/// Line 2 of the primary chip carries the secondary one.
const CASCADE_LINE: u8 = 2;

/// Remaps both chips to `base..base + 16` and unmasks only the lines in
/// `enabled` (bit `n` = IRQ `n`). The cascade line is always unmasked.
///
/// # Safety
/// Interrupts must be masked; CPL0.
pub unsafe fn remap(base: u8, enabled: u16) {
    let ports = X86Ports;
    let mask = !(enabled | (1 << CASCADE_LINE));
    let [primary_mask, secondary_mask] = mask.to_le_bytes();
    unsafe {
        ports.outb(PRIMARY_COMMAND, ICW1_INIT);
        ports.outb(SECONDARY_COMMAND, ICW1_INIT);
        ports.outb(PRIMARY_DATA, base);
        ports.outb(SECONDARY_DATA, base + 8);
        ports.outb(PRIMARY_DATA, 1 << CASCADE_LINE);
        ports.outb(SECONDARY_DATA, CASCADE_LINE);
        ports.outb(PRIMARY_DATA, ICW4_8086);
        ports.outb(SECONDARY_DATA, ICW4_8086);
        ports.outb(PRIMARY_DATA, primary_mask);
        ports.outb(SECONDARY_DATA, secondary_mask);
    }
}

/// Acknowledges IRQ `line` (0..16).
pub fn end_of_interrupt(line: u8) {
    let ports = X86Ports;
    // SAFETY: EOI writes to the command ports have no other effect.
    unsafe {
        if line >= 8 {
            ports.outb(SECONDARY_COMMAND, EOI);
        }
        ports.outb(PRIMARY_COMMAND, EOI);
    }
}
