//! # Kernel Boot Information

/// Kernel entry point as seen by the bootloader.
///
/// # ABI
/// System V: the boot information pointer arrives in `rdi`.
pub type KernelEntryFn = extern "sysv64" fn(*const KernelBootInfo) -> !;

/// `"SCRIPTOS"` in little-endian; lets the kernel reject a garbage pointer.
pub const BOOT_INFO_MAGIC: u64 = 0x534F_5450_4952_4353;

/// Parameter block handed over by the bootloader.
///
/// All addresses are physical. Keep this `#[repr(C)]` with fixed-size fields.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default)]
pub struct KernelBootInfo {
    /// Must equal [`BOOT_INFO_MAGIC`].
    pub magic: u64,

    /// Number of entries in the module table.
    pub module_count: u64,

    /// Physical address of the first [`ModuleEntry`], or 0.
    pub module_table: u64,

    /// Physical address of the UTF-8 command line, or 0 when absent.
    pub cmdline_ptr: u64,

    /// Length of the command line in bytes (no terminator).
    pub cmdline_len: u64,
}

/// One module loaded by the bootloader. The first one is the boot image.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct ModuleEntry {
    /// First byte of the module (physical).
    pub start: u64,
    /// One past the last byte of the module (physical).
    pub end: u64,
}

impl ModuleEntry {
    /// `end - start`, or `None` if the entry is inverted.
    #[must_use]
    pub const fn len(&self) -> Option<u64> {
        self.end.checked_sub(self.start)
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_length() {
        let m = ModuleEntry {
            start: 0x10_0000,
            end: 0x10_4000,
        };
        assert_eq!(m.len(), Some(0x4000));
        assert!(!m.is_empty());

        let inverted = ModuleEntry { start: 8, end: 4 };
        assert_eq!(inverted.len(), None);
    }

    #[test]
    fn abi_sizes() {
        assert_eq!(size_of::<KernelBootInfo>(), 40);
        assert_eq!(size_of::<ModuleEntry>(), 16);
    }
}
