//! Which primitives a realm's global namespace receives.

use kernel_info::cmdline::CapabilityProfile;

/// One bit per primitive.
///
/// Nested realms inherit the set of the realm that spawned them.
#[bitfield_struct::bitfield(u16)]
#[derive(PartialEq, Eq)]
pub struct Capabilities {
    /// `eval(code, name)`
    pub eval: bool,
    /// `load(path)`
    pub load: bool,
    /// `exec(delegate, name, code)`
    pub exec: bool,
    /// `iso(code, bindings)`
    pub iso: bool,
    /// `poll()`
    pub poll: bool,
    /// `ticks()`
    pub ticks: bool,
    /// `inb(port)`
    pub inb: bool,
    /// `outb(port, value)`
    pub outb: bool,
    /// `buff(base, size, width)`
    pub buff: bool,
    /// `kill(realm)`
    pub kill: bool,
    /// `schedule(realm, code)`
    pub schedule: bool,
    /// `realm()`
    pub realm: bool,
    /// `print(...)`
    pub print: bool,
    #[bits(3)]
    __: u8,
}

impl Capabilities {
    /// Every primitive.
    #[must_use]
    pub const fn full() -> Self {
        Self::restricted().with_inb(true).with_outb(true).with_buff(true)
    }

    /// Everything except raw port and memory access.
    #[must_use]
    pub const fn restricted() -> Self {
        Self::new()
            .with_eval(true)
            .with_load(true)
            .with_exec(true)
            .with_iso(true)
            .with_poll(true)
            .with_ticks(true)
            .with_kill(true)
            .with_schedule(true)
            .with_realm(true)
            .with_print(true)
    }

    /// Whether the realm may touch hardware directly.
    #[must_use]
    pub const fn is_privileged(self) -> bool {
        self.inb() || self.outb() || self.buff()
    }
}

impl From<CapabilityProfile> for Capabilities {
    fn from(profile: CapabilityProfile) -> Self {
        match profile {
            CapabilityProfile::Full => Self::full(),
            CapabilityProfile::Restricted => Self::restricted(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restricted_drops_hardware_access_only() {
        let full = Capabilities::full();
        let restricted = Capabilities::restricted();
        assert!(full.is_privileged());
        assert!(!restricted.is_privileged());
        assert_eq!(
            full.with_inb(false).with_outb(false).with_buff(false),
            restricted
        );
    }

    #[test]
    fn profiles_map_to_sets() {
        assert_eq!(Capabilities::from(CapabilityProfile::Full), Capabilities::full());
        assert_eq!(
            Capabilities::from(CapabilityProfile::Restricted),
            Capabilities::restricted()
        );
        assert_eq!(Capabilities::full().into_bits(), 0x1FFF);
    }
}
