//! Single-byte port I/O.

/// Raw x86 I/O port access.
///
/// Implemented by the real CPU ([`X86Ports`]) and by fakes in tests.
pub trait PortIo {
    /// # Safety
    /// Reading a device register can have side effects; the caller must know
    /// what lives at `port`.
    unsafe fn inb(&self, port: u16) -> u8;

    /// # Safety
    /// Writing a device register can reconfigure or break hardware.
    unsafe fn outb(&self, port: u16, value: u8);
}

/// The CPU's own `in`/`out` instructions.
#[derive(Debug, Default, Copy, Clone)]
pub struct X86Ports;

#[cfg(target_arch = "x86_64")]
impl PortIo for X86Ports {
    #[inline]
    unsafe fn inb(&self, port: u16) -> u8 {
        let value: u8;
        unsafe {
            core::arch::asm!(
                "in al, dx",
                in("dx") port,
                out("al") value,
                options(nomem, nostack, preserves_flags)
            );
        }
        value
    }

    #[inline]
    unsafe fn outb(&self, port: u16, value: u8) {
        unsafe {
            core::arch::asm!(
                "out dx, al",
                in("dx") port,
                in("al") value,
                options(nomem, nostack, preserves_flags)
            );
        }
    }
}
