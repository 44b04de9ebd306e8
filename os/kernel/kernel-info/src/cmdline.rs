//! # Boot Command Line
//!
//! The command line is a whitespace-separated list of `key=value` tokens:
//!
//! ```text
//! mode=selftest entry=/init.js log=debug caps=restricted nest=4 heap=65536
//! ```
//!
//! Unknown keys and malformed values are reported through `log` and
//! otherwise ignored; an empty command line yields [`KernelConfig::default`].

use core::str::FromStr;
use log::LevelFilter;

/// Terminal or normal path taken after bootstrap.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum BootMode {
    /// Load the entry script into the initial realm and run it.
    #[default]
    Run,
    /// Run the built-in engine checks and halt.
    SelfTest,
    /// Compile every script in the boot image, emit a manifest and halt.
    Snapshot,
}

impl BootMode {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Run)
    }
}

impl FromStr for BootMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "run" => Ok(Self::Run),
            "selftest" | "test" => Ok(Self::SelfTest),
            "snapshot" => Ok(Self::Snapshot),
            _ => Err(()),
        }
    }
}

/// Which primitives the initial realm receives.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum CapabilityProfile {
    /// Every primitive, including raw port and memory access.
    #[default]
    Full,
    /// No `inb`, `outb` or `buff`.
    Restricted,
}

impl FromStr for CapabilityProfile {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(Self::Full),
            "restricted" => Ok(Self::Restricted),
            _ => Err(()),
        }
    }
}

pub const DEFAULT_ENTRY: &str = "/init.js";
pub const DEFAULT_NEST_LIMIT: u32 = 8;
pub const DEFAULT_HEAP_OBJECTS: u32 = 1 << 20;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct KernelConfig<'a> {
    pub mode: BootMode,
    /// Boot image path of the entry script.
    pub entry: &'a str,
    pub log_level: LevelFilter,
    pub capabilities: CapabilityProfile,
    /// Maximum depth of nested realms.
    pub nest_limit: u32,
    /// Object budget of each realm heap.
    pub heap_objects: u32,
}

impl Default for KernelConfig<'_> {
    fn default() -> Self {
        Self {
            mode: BootMode::Run,
            entry: DEFAULT_ENTRY,
            log_level: LevelFilter::Info,
            capabilities: CapabilityProfile::Full,
            nest_limit: DEFAULT_NEST_LIMIT,
            heap_objects: DEFAULT_HEAP_OBJECTS,
        }
    }
}

impl<'a> KernelConfig<'a> {
    #[must_use]
    pub fn parse(cmdline: &'a str) -> Self {
        let mut config = Self::default();
        for token in cmdline.split_ascii_whitespace() {
            let Some((key, value)) = token.split_once('=') else {
                log::warn!("ignoring command line token without '=': {token}");
                continue;
            };

            let applied = match key {
                "mode" => value.parse::<BootMode>().map(|m| config.mode = m).is_ok(),
                "entry" => {
                    if value.is_empty() {
                        false
                    } else {
                        config.entry = value;
                        true
                    }
                }
                "log" => value.parse::<LevelFilter>().map(|l| config.log_level = l).is_ok(),
                "caps" => value.parse::<CapabilityProfile>().map(|c| config.capabilities = c).is_ok(),
                "nest" => value.parse::<u32>().map(|n| config.nest_limit = n).is_ok(),
                "heap" => value
                    .parse::<u32>()
                    .ok()
                    .filter(|&n| n > 0)
                    .map(|n| config.heap_objects = n)
                    .is_some(),
                _ => {
                    log::warn!("ignoring unknown command line key {key:?}");
                    continue;
                }
            };

            if !applied {
                log::warn!("ignoring malformed value {value:?} for {key:?}");
            }
        }
        config
    }
}
