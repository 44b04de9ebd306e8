//! # QEMU debug console output
//!
//! Routes kernel log output to QEMU's debug console (I/O port `0x402`):
//!
//! ```text
//! log::info!  ──►  QemuLogger  ──►  qemu_trace!  ──►  out 0x402  ──►  -debugcon
//! ```
//!
//! * [`QemuLogger`] is the `log::Log` implementation the kernel installs
//!   first thing on boot. Each line is prefixed with the current timer tick
//!   once a clock has been registered via [`QemuLogger::set_clock`].
//! * [`qemu_trace!`] writes formatted text straight to the port, bypassing
//!   `log`; used by the panic and fatal-halt paths.
//!
//! With the `enabled` feature off every write compiles to nothing.
//!
//! ```bash
//! qemu-system-x86_64 ... -debugcon stdio
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod logger;

pub use logger::QemuLogger;

#[cfg(feature = "enabled")]
#[doc(hidden)]
pub mod qemu_fmt {
    use core::fmt::{self, Write};

    const QEMU_DEBUG_PORT: u16 = 0x402;

    #[allow(clippy::inline_always)]
    #[inline(always)]
    fn dbg_putc(c: u8) {
        #[cfg(target_arch = "x86_64")]
        unsafe {
            core::arch::asm!(
                "out dx, al",
                in("dx") QEMU_DEBUG_PORT,
                in("al") c,
                options(nomem, nostack, preserves_flags)
            );
        }
        #[cfg(not(target_arch = "x86_64"))]
        let _ = (QEMU_DEBUG_PORT, c);
    }

    pub struct QemuSink;

    impl Write for QemuSink {
        #[inline]
        fn write_str(&mut self, s: &str) -> fmt::Result {
            s.bytes().for_each(dbg_putc);
            Ok(())
        }
    }

    #[inline]
    pub fn qemu_write(args: fmt::Arguments) {
        // best effort; there is nowhere to report a failed debug write
        let _ = fmt::write(&mut QemuSink, args);
    }
}

#[cfg(not(feature = "enabled"))]
#[doc(hidden)]
pub mod qemu_fmt {
    #[inline(always)]
    pub fn qemu_write(_: core::fmt::Arguments) {}
}

#[macro_export]
macro_rules! qemu_trace {
    ($($arg:tt)*) => {{
        $crate::qemu_fmt::qemu_write(core::format_args!($($arg)*));
    }};
}
