//! Finding the boot image in the bootloader's parameter block.

use kernel_info::boot::{BOOT_INFO_MAGIC, KernelBootInfo, ModuleEntry};
use kernel_info::memory::{HHDM_BASE, MAX_BOOT_IMAGE_LEN};

#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum LocateError {
    #[error("no boot information was passed")]
    MissingBootInfo,
    #[error("boot information magic {0:#018x} is wrong")]
    BadMagic(u64),
    #[error("the bootloader loaded no modules")]
    NoModules,
    #[error("the boot image module starts at physical address 0")]
    NullImage,
    #[error("module {start:#x}..{end:#x} ends before it starts")]
    InvertedModule { start: u64, end: u64 },
    #[error("the boot image is empty")]
    EmptyImage,
    #[error("boot image of {0} bytes exceeds the {MAX_BOOT_IMAGE_LEN} byte limit")]
    ImageTooLarge(u64),
    #[error("physical address {0:#x} is outside the direct map")]
    Unmapped(u64),
    #[error("the command line is not UTF-8")]
    CmdlineNotUtf8,
}

/// Where the boot image lives, as validated by [`Locator::locate`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BootImageDescriptor<'a> {
    /// Physical address of the first byte.
    pub start: u64,
    /// Length in bytes, in `1..=MAX_BOOT_IMAGE_LEN`.
    pub len: u64,
    /// Kernel command line; empty when the bootloader passed none.
    pub cmdline: &'a str,
    virt: usize,
}

impl<'a> BootImageDescriptor<'a> {
    /// The image contents.
    ///
    /// # Safety
    /// The module must still be mapped and unmodified for `'a`.
    #[must_use]
    pub unsafe fn bytes(&self) -> &'a [u8] {
        let ptr = core::ptr::with_exposed_provenance::<u8>(self.virt);
        // SAFETY: the locator checked the range; the caller vouches for its lifetime.
        #[allow(clippy::cast_possible_truncation)]
        unsafe {
            core::slice::from_raw_parts(ptr, self.len as usize)
        }
    }

    /// The same image with a different command line.
    #[must_use]
    pub fn with_cmdline<'b>(self, cmdline: &'b str) -> BootImageDescriptor<'b>
    where
        'a: 'b,
    {
        BootImageDescriptor { cmdline, ..self }
    }
}

/// Reads the parameter block through a constant physical-to-virtual offset.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Locator {
    phys_offset: u64,
}

impl Default for Locator {
    fn default() -> Self {
        Self::direct_map()
    }
}

impl Locator {
    /// Physical memory at [`HHDM_BASE`].
    #[must_use]
    pub const fn direct_map() -> Self {
        Self::new(HHDM_BASE)
    }

    #[must_use]
    pub const fn new(phys_offset: u64) -> Self {
        Self { phys_offset }
    }

    fn translate(&self, pa: u64, len: u64) -> Result<usize, LocateError> {
        self.phys_offset
            .checked_add(pa)
            .filter(|va| va.checked_add(len).is_some())
            .and_then(|va| usize::try_from(va).ok())
            .ok_or(LocateError::Unmapped(pa))
    }

    /// Validates the block at `info` and returns the first module as the boot
    /// image. Only the block, the module table and the command line are read;
    /// the image itself is left untouched.
    ///
    /// # Safety
    /// `info` must be null or point to a readable [`KernelBootInfo`] whose
    /// physical addresses are mapped at this locator's offset.
    pub unsafe fn locate(
        &self,
        info: *const KernelBootInfo,
    ) -> Result<BootImageDescriptor<'static>, LocateError> {
        // SAFETY: null or readable, per the caller.
        let info = unsafe { info.as_ref() }.ok_or(LocateError::MissingBootInfo)?;
        if info.magic != BOOT_INFO_MAGIC {
            return Err(LocateError::BadMagic(info.magic));
        }
        if info.module_count == 0 || info.module_table == 0 {
            return Err(LocateError::NoModules);
        }

        let table = self.translate(info.module_table, size_of::<ModuleEntry>() as u64)?;
        // SAFETY: module_count > 0, so the first entry exists.
        let module = unsafe {
            core::ptr::with_exposed_provenance::<ModuleEntry>(table).read_unaligned()
        };
        if module.start == 0 {
            return Err(LocateError::NullImage);
        }
        let len = module.len().ok_or(LocateError::InvertedModule {
            start: module.start,
            end: module.end,
        })?;
        if len == 0 {
            return Err(LocateError::EmptyImage);
        }
        if len > MAX_BOOT_IMAGE_LEN {
            return Err(LocateError::ImageTooLarge(len));
        }
        let virt = self.translate(module.start, len)?;

        let cmdline = if info.cmdline_ptr == 0 || info.cmdline_len == 0 {
            ""
        } else {
            let at = self.translate(info.cmdline_ptr, info.cmdline_len)?;
            let len = usize::try_from(info.cmdline_len).map_err(|_| LocateError::Unmapped(info.cmdline_ptr))?;
            // SAFETY: the bootloader placed `cmdline_len` bytes there.
            let bytes = unsafe { core::slice::from_raw_parts(core::ptr::with_exposed_provenance::<u8>(at), len) };
            core::str::from_utf8(bytes).map_err(|_| LocateError::CmdlineNotUtf8)?
        };

        log::debug!(
            "boot image at {:#x}, {len} bytes; {} module(s)",
            module.start,
            info.module_count
        );
        Ok(BootImageDescriptor {
            start: module.start,
            len,
            cmdline,
            virt,
        })
    }
}
