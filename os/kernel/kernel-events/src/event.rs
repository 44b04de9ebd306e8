/// One recorded interrupt.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct InterruptEvent {
    pub vector: u8,
    /// Byte read from the device's payload port at handler time, if the
    /// vector has one configured.
    pub payload: Option<u8>,
}

const HAS_PAYLOAD: u32 = 1 << 8;

impl InterruptEvent {
    #[must_use]
    pub const fn new(vector: u8) -> Self {
        Self {
            vector,
            payload: None,
        }
    }

    #[must_use]
    pub const fn with_payload(vector: u8, payload: u8) -> Self {
        Self {
            vector,
            payload: Some(payload),
        }
    }

    /// Packed form stored in an atomic slot.
    pub(crate) const fn encode(self) -> u32 {
        match self.payload {
            Some(p) => self.vector as u32 | HAS_PAYLOAD | (p as u32) << 16,
            None => self.vector as u32,
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    pub(crate) const fn decode(raw: u32) -> Self {
        Self {
            vector: raw as u8,
            payload: if raw & HAS_PAYLOAD != 0 {
                Some((raw >> 16) as u8)
            } else {
                None
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packing_keeps_payload_presence() {
        for ev in [
            InterruptEvent::new(0),
            InterruptEvent::new(0x21),
            InterruptEvent::with_payload(0x21, 0),
            InterruptEvent::with_payload(0xFF, 0xFF),
        ] {
            assert_eq!(InterruptEvent::decode(ev.encode()), ev);
        }
    }
}
