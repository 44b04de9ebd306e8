//! Local interrupt masking.
//!
//! On x86-64 these compile to `cli`/`sti`/`pushfq`. On other targets (the
//! host running unit tests) masking is a no-op and interrupts report as
//! disabled, which lets code that takes an [`IrqGuard`] run unchanged.

/// `RFLAGS.IF`
const IF_BIT: u64 = 1 << 9;

/// Mask maskable interrupts on this core.
///
/// # Safety
/// Ring 0 only.
#[inline]
pub unsafe fn mask() {
    #[cfg(target_arch = "x86_64")]
    unsafe {
        core::arch::asm!("cli", options(nomem, nostack, preserves_flags));
    }
}

/// Unmask maskable interrupts on this core.
///
/// # Safety
/// Ring 0 only. Anything that relied on being uninterrupted must be done.
#[inline]
pub unsafe fn unmask() {
    #[cfg(target_arch = "x86_64")]
    unsafe {
        core::arch::asm!("sti", options(nomem, nostack, preserves_flags));
    }
}

/// Whether `RFLAGS.IF` is set on this core.
#[inline]
#[must_use]
pub fn enabled() -> bool {
    #[cfg(target_arch = "x86_64")]
    {
        let flags: u64;
        unsafe {
            core::arch::asm!("pushfq; pop {}", out(reg) flags, options(nomem, preserves_flags));
        }
        flags & IF_BIT != 0
    }

    #[cfg(not(target_arch = "x86_64"))]
    {
        let _ = IF_BIT;
        false
    }
}

/// Masks interrupts for its lifetime, restoring the previous state on drop.
///
/// Nesting is fine: an inner guard sees interrupts already masked and leaves
/// them masked when it goes away.
pub struct IrqGuard {
    were_enabled: bool,
}

impl IrqGuard {
    /// # Safety
    /// Ring 0 only.
    #[inline]
    #[must_use]
    pub unsafe fn new() -> Self {
        let were_enabled = enabled();
        if were_enabled {
            unsafe { mask() };
        }
        Self { were_enabled }
    }
}

impl Drop for IrqGuard {
    fn drop(&mut self) {
        if self.were_enabled {
            unsafe { unmask() };
        }
    }
}

/// Run `f` with interrupts masked.
///
/// # Safety
/// Ring 0 only.
#[inline]
pub unsafe fn without_interrupts<R>(f: impl FnOnce() -> R) -> R {
    let _guard = unsafe { IrqGuard::new() };
    f()
}
