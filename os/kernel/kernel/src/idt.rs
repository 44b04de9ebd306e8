//! # Interrupt Descriptor Table
//!
//! One table shared by every core. The boot core builds and loads it while
//! interrupts are masked; secondary cores only load it.

use bitfield_struct::bitfield;
use core::arch::asm;
use core::ops::{Index, IndexMut};
use kernel_sync::OnceSlot;

const _: () = assert!(size_of::<IdtEntry>() == 16);
const _: () = assert!(align_of::<Idt>() == 16);

/// Middle two bytes of a gate: `IST` in the low byte,
/// `| P | DPL(2) | S(0) | Type(4) |` in the high byte.
#[bitfield(u16)]
pub struct IdtGateAttr {
    #[bits(3)]
    pub ist: u8,

    #[bits(5)]
    __zero0: u8,

    /// 0xE = interrupt gate (clears `IF` on entry).
    #[bits(4)]
    pub typ: u8,

    #[bits(1)]
    pub s: bool,

    #[bits(2)]
    pub dpl: u8,

    #[bits(1)]
    pub present: bool,
}

impl IdtGateAttr {
    #[inline]
    #[must_use]
    pub const fn interrupt_gate() -> Self {
        Self::new().with_typ(0xE).with_s(false)
    }
}

#[repr(C, align(16))]
pub struct Idt {
    entries: [IdtEntry; 256],
}

impl Idt {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: [IdtEntry::MISSING; 256],
        }
    }

    /// # Safety
    /// CPL0, and every present entry must point at a valid handler.
    #[inline]
    unsafe fn load(&'static self) {
        #[allow(clippy::cast_possible_truncation)]
        let idtr = Idtr {
            limit: (size_of::<Self>() - 1) as u16,
            base: core::ptr::from_ref(self) as u64,
        };
        unsafe {
            asm!("lidt [{}]", in(reg) &raw const idtr, options(nostack, preserves_flags, readonly));
        }
    }
}

impl Index<u8> for Idt {
    type Output = IdtEntry;
    fn index(&self, vector: u8) -> &Self::Output {
        &self.entries[usize::from(vector)]
    }
}

impl IndexMut<u8> for Idt {
    fn index_mut(&mut self, vector: u8) -> &mut Self::Output {
        &mut self.entries[usize::from(vector)]
    }
}

#[repr(C, packed)]
struct Idtr {
    limit: u16,
    base: u64,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct IdtEntry {
    offset_lo: u16,
    selector: u16,
    ist_type: u16,
    offset_mid: u16,
    offset_hi: u32,
    zero: u32,
}

impl IdtEntry {
    pub const MISSING: Self = Self {
        offset_lo: 0,
        selector: 0,
        ist_type: IdtGateAttr::new().into_bits(),
        offset_mid: 0,
        offset_hi: 0,
        zero: 0,
    };

    /// Point this entry at `handler` as a ring-0 interrupt gate in the
    /// current code segment. The entry stays non-present until
    /// [`IdtEntryBuilder::present`].
    #[allow(clippy::cast_possible_truncation)]
    pub fn set_handler(&mut self, handler: extern "C" fn()) -> IdtEntryBuilder<'_> {
        let addr = handler as usize as u64;
        self.offset_lo = (addr & 0xFFFF) as u16;
        self.offset_mid = ((addr >> 16) & 0xFFFF) as u16;
        self.offset_hi = (addr >> 32) as u32;
        self.selector = current_cs();
        self.ist_type = IdtGateAttr::interrupt_gate()
            .with_present(false)
            .with_dpl(0)
            .with_ist(0)
            .into_bits();

        IdtEntryBuilder { entry: self }
    }
}

pub struct IdtEntryBuilder<'a> {
    entry: &'a mut IdtEntry,
}

impl IdtEntryBuilder<'_> {
    #[inline]
    pub const fn present(self, p: bool) -> Self {
        let bf = IdtGateAttr::from_bits(self.entry.ist_type).with_present(p);
        self.entry.ist_type = bf.into_bits();
        self
    }
}

#[inline]
fn current_cs() -> u16 {
    let cs: u16;
    unsafe {
        asm!("mov {0:x}, cs", out(reg) cs, options(nomem, nostack, preserves_flags));
    }
    cs
}

static IDT: OnceSlot<Idt> = OnceSlot::new();

/// Builds the shared table with `build` and loads it on this core.
///
/// # Safety
/// Interrupts must be masked; CPL0.
pub unsafe fn install(build: impl FnOnce(&mut Idt)) {
    let idt = IDT.get_or_init(|| {
        let mut idt = Idt::new();
        build(&mut idt);
        idt
    });
    unsafe { idt.load() };
}

/// Loads the already built table on a secondary core.
///
/// # Safety
/// As for [`install`]; returns `false` if the boot core has not built it.
pub unsafe fn load_installed() -> bool {
    IDT.get().is_some_and(|idt| {
        unsafe { idt.load() };
        true
    })
}
