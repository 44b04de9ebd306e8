//! Host services the primitives reach through.
//!
//! Each concern is a trait so the kernel can plug in the real hardware and
//! tests can plug in fakes.

use crate::RealmHandle;
use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use kernel_events::{Consumer, InterruptEvent, PortIo, TickCounter};
use kernel_script::Failure;
use packer_abi::unbundle::Bundle;

/// Named resources of the boot image.
pub trait ResourceStore {
    /// Contents of `path`; a leading `/` is optional.
    fn get(&self, path: &str) -> Option<&[u8]>;

    /// Every stored path.
    fn paths(&self) -> Vec<String>;
}

impl ResourceStore for Bundle<'_> {
    fn get(&self, path: &str) -> Option<&[u8]> {
        self.find(path)
    }

    fn paths(&self) -> Vec<String> {
        self.entries()
            .flatten()
            .map(|(name, _)| name.to_string())
            .collect()
    }
}

/// Script-side end of the interrupt event buffer.
pub trait EventSource {
    /// Removes the most recent event.
    fn poll(&self) -> Option<InterruptEvent>;
}

impl<const N: usize> EventSource for Consumer<'_, N> {
    fn poll(&self) -> Option<InterruptEvent> {
        self.pop()
    }
}

pub trait TickSource {
    fn ticks(&self) -> u64;
}

impl TickSource for TickCounter {
    fn ticks(&self) -> u64 {
        self.read()
    }
}

impl<T: TickSource + ?Sized> TickSource for &T {
    fn ticks(&self) -> u64 {
        (**self).ticks()
    }
}

/// Makes physical memory addressable for `buff`.
pub trait PhysicalMemory {
    /// Virtual address of physical `base`, valid for `size` bytes, or `None`
    /// if the range cannot be mapped.
    fn map(&self, base: u64, size: usize) -> Option<*mut u8>;
}

/// Physical memory reachable at a constant offset.
#[derive(Debug, Copy, Clone)]
pub struct DirectMap {
    offset: u64,
}

impl DirectMap {
    #[must_use]
    pub const fn new(offset: u64) -> Self {
        Self { offset }
    }
}

impl PhysicalMemory for DirectMap {
    fn map(&self, base: u64, size: usize) -> Option<*mut u8> {
        let end = base.checked_add(u64::try_from(size).ok()?)?;
        self.offset.checked_add(end)?;
        let virt = usize::try_from(self.offset + base).ok()?;
        Some(core::ptr::with_exposed_provenance_mut(virt))
    }
}

/// Where realm output and uncaught failures go.
pub trait DiagnosticSink {
    /// An uncaught exception or compile error ended a script in `realm`.
    fn report(&self, realm: &RealmHandle, failure: &Failure);

    /// A line written by the realm's `print` primitive.
    fn print(&self, realm: &RealmHandle, line: &str);
}

/// Writes diagnostics through the `log` facade under a fixed target.
#[derive(Debug, Copy, Clone)]
pub struct LogDiagnostics {
    target: &'static str,
}

impl LogDiagnostics {
    #[must_use]
    pub const fn new(target: &'static str) -> Self {
        Self { target }
    }

    #[must_use]
    pub const fn target(&self) -> &'static str {
        self.target
    }
}

impl Default for LogDiagnostics {
    fn default() -> Self {
        Self::new("realm")
    }
}

impl DiagnosticSink for LogDiagnostics {
    fn report(&self, realm: &RealmHandle, failure: &Failure) {
        log::error!(target: self.target, "{realm}: {failure}");
    }

    fn print(&self, realm: &RealmHandle, line: &str) {
        log::info!(target: self.target, "{}: {line}", realm.name());
    }
}

/// Everything the realm layer needs from the machine.
pub struct Services {
    pub resources: Box<dyn ResourceStore>,
    pub ports: Box<dyn PortIo>,
    pub memory: Box<dyn PhysicalMemory>,
    pub events: Box<dyn EventSource>,
    pub ticks: Box<dyn TickSource>,
    pub diagnostics: Rc<dyn DiagnosticSink>,
}

impl core::fmt::Debug for Services {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_map_offsets_and_rejects_overflow() {
        let map = DirectMap::new(0x1000);
        assert_eq!(map.map(0x20, 4), Some(0x1020 as *mut u8));
        assert_eq!(map.map(u64::MAX - 1, 4), None);
        assert_eq!(DirectMap::new(u64::MAX).map(1, 1), None);
    }
}
