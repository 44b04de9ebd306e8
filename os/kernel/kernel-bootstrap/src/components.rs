//! The values each boot stage leaves behind.

use crate::locator::BootImageDescriptor;
use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;
use kernel_alloc::HeapStats;
use kernel_info::boot::KernelBootInfo;
use kernel_info::cmdline::KernelConfig;
use kernel_realm::LogDiagnostics;
use kernel_realm::services::DirectMap;
use kernel_sync::SpinLock;
use log::LevelFilter;
use packer_abi::unbundle::{Bundle, BundleError};

/// Early console the boot path logs to.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BootServices {
    pub console: &'static str,
}

/// What the bootloader handed over.
#[derive(Debug, Copy, Clone)]
pub struct BootParams {
    /// Copy of the parameter block.
    pub info: KernelBootInfo,
    /// Boot image location; its command line lives in the boot arena.
    pub image: BootImageDescriptor<'static>,
    pub config: KernelConfig<'static>,
}

impl BootParams {
    #[must_use]
    pub fn new(info: KernelBootInfo, image: BootImageDescriptor<'static>) -> Self {
        Self {
            info,
            image,
            config: KernelConfig::parse(image.cmdline),
        }
    }

    #[must_use]
    pub const fn cmdline(&self) -> &'static str {
        self.image.cmdline
    }
}

/// Address space layout after setup.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct MemoryManager {
    /// Virtual address of physical address zero.
    pub phys_offset: u64,
}

impl MemoryManager {
    #[must_use]
    pub const fn new(phys_offset: u64) -> Self {
        Self { phys_offset }
    }

    #[must_use]
    pub const fn direct_map(&self) -> DirectMap {
        DirectMap::new(self.phys_offset)
    }
}

/// Vectors the platform routed to the interrupt bridge.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct InterruptSetup {
    pub timer_vector: u8,
    /// First and last device vector.
    pub device_vectors: (u8, u8),
}

/// Heap state right after a core activated its allocator.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct AllocatorState {
    pub core: u32,
    pub stats: HeapStats,
}

/// Kernel-wide string settings: every `key=value` of the command line, plus
/// whatever the kernel records at run time.
#[derive(Default)]
pub struct KeyStore {
    entries: SpinLock<BTreeMap<String, String>>,
}

impl KeyStore {
    #[must_use]
    pub fn from_cmdline(cmdline: &str) -> Self {
        let entries = cmdline
            .split_ascii_whitespace()
            .filter_map(|token| token.split_once('='))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            entries: SpinLock::new(entries),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.with_lock(|e| e.get(key).cloned())
    }

    /// Returns the previous value.
    pub fn set(&self, key: &str, value: impl Into<String>) -> Option<String> {
        self.entries
            .with_lock(|e| e.insert(key.to_string(), value.into()))
    }

    /// Entries whose key starts with `prefix`, in key order.
    #[must_use]
    pub fn with_prefix(&self, prefix: &str) -> Vec<(String, String)> {
        self.entries.with_lock(|e| {
            e.iter()
                .filter(|(k, _)| k.starts_with(prefix))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.with_lock(|e| e.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyStore").field("len", &self.len()).finish()
    }
}

/// Read access to the files of the boot image.
#[derive(Clone, Copy)]
pub struct BootImageReader {
    descriptor: BootImageDescriptor<'static>,
    bundle: Bundle<'static>,
}

impl BootImageReader {
    /// # Errors
    /// The image must be a valid bundle.
    ///
    /// # Safety
    /// See [`BootImageDescriptor::bytes`].
    pub unsafe fn open(descriptor: BootImageDescriptor<'static>) -> Result<Self, BundleError> {
        // SAFETY: forwarded to the caller.
        let bundle = Bundle::parse(unsafe { descriptor.bytes() })?;
        log::info!(
            "boot image: {} file(s), {} bytes",
            bundle.len(),
            descriptor.len
        );
        Ok(Self { descriptor, bundle })
    }

    #[must_use]
    pub const fn descriptor(&self) -> &BootImageDescriptor<'static> {
        &self.descriptor
    }

    #[must_use]
    pub const fn bundle(&self) -> Bundle<'static> {
        self.bundle
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<&'static [u8]> {
        self.bundle.find(path)
    }

    /// Paths of every file, in image order.
    #[must_use]
    pub fn paths(&self) -> Vec<&'static str> {
        self.bundle.entries().filter_map(Result::ok).map(|(p, _)| p).collect()
    }
}

impl fmt::Debug for BootImageReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootImageReader")
            .field("descriptor", &self.descriptor)
            .field("files", &self.bundle.len())
            .finish()
    }
}

/// Log target script diagnostics are written under.
pub const SCRIPT_TARGET: &str = "realm";

/// Kernel-wide log filtering and the realms' diagnostic sink.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TraceSink {
    pub level: LevelFilter,
    pub target: &'static str,
}

impl TraceSink {
    /// Applies `level` to the `log` facade.
    #[must_use]
    pub fn install(level: LevelFilter, target: &'static str) -> Self {
        log::set_max_level(level);
        log::info!("log level {level}");
        Self { level, target }
    }

    #[must_use]
    pub const fn diagnostics(&self) -> LogDiagnostics {
        LogDiagnostics::new(self.target)
    }
}

/// Per-core CPU identity.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct CpuDescriptor {
    pub core: u32,
    pub apic_id: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_store_holds_the_command_line() {
        let keys = KeyStore::from_cmdline("mode=run vga=text quiet entry=/a.js");
        assert_eq!(keys.len(), 3);
        assert_eq!(keys.get("vga").as_deref(), Some("text"));
        assert_eq!(keys.get("quiet"), None);

        assert_eq!(keys.set("vga", "off").as_deref(), Some("text"));
        keys.set("snapshot./a.js", "ok");
        assert_eq!(
            keys.with_prefix("snapshot."),
            [("snapshot./a.js".into(), "ok".into())]
        );
    }
}
