//! Packed 64-bit operand encoding.
//!
//! Every operand has a compact tagged form in a single `u64`:
//!
//! ```text
//! absent          0
//! immediate       00000000 00000000 00000000 00000010 iiiiiiii iiiiiiii iiiiiiii iiiiiiii
//! register        ........ ........ ........ ........ ........ ........ ........ 0001rrrr
//! high byte       ........ ........ ........ ........ ........ ........ ........ 000001rr
//! SIMD register   ........ ........ ........ ........ ........ ........ ........ 001rrrrr
//! memory          00000000 00000000 01bbbbbi iiiissss oooooooo oooooooo oooooooo oooooooo
//! RIP relative    00000000 00000000 00000000 00000011 oooooooo oooooooo oooooooo oooooooo
//! ```
//!
//! In a memory reference, base and index values of 16 or more mean "no base"
//! and "no index"; the scale nibble holds the multiplier and is zero when
//! there is no index.

use core::fmt;

use crate::ir::{Gpr, HighByte, MemoryRef, Operand, Scale, SimdReg};

const IMMEDIATE_TAG: u64 = 0x0000_0002_0000_0000;
const RIP_TAG: u64 = 0x0000_0003_0000_0000;
const MEMORY_TAG: u64 = 0x0000_4000_0000_0000;
const MEMORY_TAG_MASK: u64 = 0xFFFF_C000_0000_0000;
const UPPER_MASK: u64 = 0xFFFF_FFFF_0000_0000;

const BASE_SHIFT: u32 = 41;
const INDEX_SHIFT: u32 = 36;
const SCALE_SHIFT: u32 = 32;
const BASE_FIELD: u64 = 0x1F << BASE_SHIFT;
const INDEX_FIELD: u64 = 0x1F << INDEX_SHIFT;
const SCALE_FIELD: u64 = 0xF << SCALE_SHIFT;

/// Sub-field value meaning "no base" or "no index".
pub const NO_REGISTER: u8 = 16;

/// Classification of a packed operand.
///
/// Exactly one class holds for every `u64`; values that match no operand
/// layout are [`OperandClass::Invalid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandClass {
    /// The zero value.
    Absent,
    /// Immediate payload.
    Immediate,
    /// General-purpose register.
    Register,
    /// Legacy high byte.
    HighByte,
    /// Vector register.
    Simd,
    /// Memory reference.
    Memory,
    /// RIP-relative reference.
    RipRelative,
    /// No operand layout matches.
    Invalid,
}

/// An operand in its packed 64-bit form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawOperand(pub u64);

impl RawOperand {
    /// The absent operand.
    pub const ABSENT: RawOperand = RawOperand(0);

    /// Which layout this value uses.
    pub fn class(self) -> OperandClass {
        let x = self.0;
        if x == 0 {
            OperandClass::Absent
        } else if x & UPPER_MASK == IMMEDIATE_TAG {
            OperandClass::Immediate
        } else if x & UPPER_MASK == RIP_TAG {
            OperandClass::RipRelative
        } else if x & MEMORY_TAG_MASK == MEMORY_TAG {
            OperandClass::Memory
        } else if x & !0xF == 0x10 {
            OperandClass::Register
        } else if x & !0x3 == 0x4 {
            OperandClass::HighByte
        } else if x & !0x1F == 0x20 {
            OperandClass::Simd
        } else {
            OperandClass::Invalid
        }
    }

    /// Whether this is the absent operand.
    #[inline]
    pub fn is_absent(self) -> bool {
        self.0 == 0
    }

    /// Immediate payload, if this is an immediate.
    pub fn immediate(self) -> Option<u32> {
        (self.class() == OperandClass::Immediate).then_some(self.0 as u32)
    }

    /// Register, if this is a general register.
    pub fn register(self) -> Option<Gpr> {
        if self.class() == OperandClass::Register {
            Gpr::from_index((self.0 & 0xF) as u8)
        } else {
            None
        }
    }

    /// High byte, if this is a high-byte register.
    pub fn high_byte(self) -> Option<HighByte> {
        if self.class() == OperandClass::HighByte {
            HighByte::from_index((self.0 & 0x3) as u8)
        } else {
            None
        }
    }

    /// Vector register, if this is one.
    pub fn simd(self) -> Option<SimdReg> {
        if self.class() == OperandClass::Simd {
            SimdReg::new((self.0 & 0x1F) as u8)
        } else {
            None
        }
    }

    /// Displacement, if this is RIP-relative.
    pub fn rip_relative(self) -> Option<i32> {
        (self.class() == OperandClass::RipRelative).then_some(self.0 as u32 as i32)
    }

    /// Raw base sub-field of a memory reference.
    pub fn memory_base_field(self) -> Option<u8> {
        (self.class() == OperandClass::Memory).then_some(((self.0 & BASE_FIELD) >> BASE_SHIFT) as u8)
    }

    /// Raw index sub-field of a memory reference.
    pub fn memory_index_field(self) -> Option<u8> {
        (self.class() == OperandClass::Memory)
            .then_some(((self.0 & INDEX_FIELD) >> INDEX_SHIFT) as u8)
    }

    /// Raw scale sub-field of a memory reference.
    pub fn memory_scale_field(self) -> Option<u8> {
        (self.class() == OperandClass::Memory)
            .then_some(((self.0 & SCALE_FIELD) >> SCALE_SHIFT) as u8)
    }

    /// Decoded memory reference.
    ///
    /// Returns `None` when this is not a memory reference or when an index is
    /// present with a scale other than 1, 2, 4 or 8.
    pub fn memory(self) -> Option<MemoryRef> {
        let base = self.memory_base_field()?;
        let index = self.memory_index_field()?;
        let scale = self.memory_scale_field()?;
        let index = if index >= NO_REGISTER {
            None
        } else {
            Some((
                Gpr::from_index(index)?,
                Scale::from_factor(u64::from(scale))?,
            ))
        };
        Some(MemoryRef {
            base: Gpr::from_index(base),
            index,
            disp: self.0 as u32 as i32,
        })
    }

    /// Decode into an [`Operand`].
    ///
    /// Returns `None` for the absent value and for invalid encodings.
    pub fn decode(self) -> Option<Operand> {
        match self.class() {
            OperandClass::Absent | OperandClass::Invalid => None,
            OperandClass::Immediate => self.immediate().map(Operand::Immediate),
            OperandClass::Register => self.register().map(Operand::Register),
            OperandClass::HighByte => self.high_byte().map(Operand::HighByte),
            OperandClass::Simd => self.simd().map(Operand::Simd),
            OperandClass::Memory => self.memory().map(Operand::Memory),
            OperandClass::RipRelative => self.rip_relative().map(Operand::RipRelative),
        }
    }
}

impl fmt::Display for RawOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

impl Operand {
    /// Packed 64-bit form of this operand.
    pub fn encode(self) -> RawOperand {
        let bits = match self {
            Operand::Immediate(v) => IMMEDIATE_TAG | u64::from(v),
            Operand::Register(r) => 0x10 | u64::from(r.index()),
            Operand::HighByte(h) => 0x4 | u64::from(h.index()),
            Operand::Simd(s) => 0x20 | u64::from(s.index()),
            Operand::RipRelative(disp) => RIP_TAG | u64::from(disp as u32),
            Operand::Memory(mem) => {
                let base = mem.base.map_or(NO_REGISTER, Gpr::index);
                let (index, scale) = match mem.index {
                    Some((r, s)) => (r.index(), s.factor()),
                    None => (NO_REGISTER, 0),
                };
                MEMORY_TAG
                    | (u64::from(base) << BASE_SHIFT)
                    | (u64::from(index) << INDEX_SHIFT)
                    | (u64::from(scale) << SCALE_SHIFT)
                    | u64::from(mem.disp as u32)
            }
        };
        RawOperand(bits)
    }
}

/// Pack an optional operand; `None` becomes the absent value.
pub fn encode_slot(op: Option<Operand>) -> RawOperand {
    op.map_or(RawOperand::ABSENT, Operand::encode)
}
