//! Intermediate representation: registers, operands, instructions, programs.
//!
//! An [`Instruction`] names its opcode template through a [`FootprintId`] and
//! carries up to four [`Operand`]s positionally matching the template's slots.
//! A [`Program`] is an ordered sequence of instructions; index 0 runs first.

use alloc::vec::Vec;
use core::fmt;

/// One of the sixteen architectural general-purpose registers.
///
/// The discriminant is the register number used throughout the packed
/// encodings and the fixed-effect masks (`RAX` = 0, `RBX` = 1, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Gpr {
    /// Accumulator.
    Rax = 0,
    /// Base.
    Rbx = 1,
    /// Counter.
    Rcx = 2,
    /// Data.
    Rdx = 3,
    /// Source index.
    Rsi = 4,
    /// Destination index.
    Rdi = 5,
    /// Stack pointer.
    Rsp = 6,
    /// Frame pointer.
    Rbp = 7,
    /// Extended register 8.
    R8 = 8,
    /// Extended register 9.
    R9 = 9,
    /// Extended register 10.
    R10 = 10,
    /// Extended register 11.
    R11 = 11,
    /// Extended register 12.
    R12 = 12,
    /// Extended register 13.
    R13 = 13,
    /// Extended register 14.
    R14 = 14,
    /// Extended register 15.
    R15 = 15,
}

impl Gpr {
    /// All registers in numbering order.
    pub const ALL: [Gpr; 16] = [
        Gpr::Rax,
        Gpr::Rbx,
        Gpr::Rcx,
        Gpr::Rdx,
        Gpr::Rsi,
        Gpr::Rdi,
        Gpr::Rsp,
        Gpr::Rbp,
        Gpr::R8,
        Gpr::R9,
        Gpr::R10,
        Gpr::R11,
        Gpr::R12,
        Gpr::R13,
        Gpr::R14,
        Gpr::R15,
    ];

    /// Register number (0–15).
    #[inline]
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Register with the given number, if it exists.
    pub fn from_index(n: u8) -> Option<Gpr> {
        Gpr::ALL.get(n as usize).copied()
    }

    /// Upper-case register name.
    pub fn name(self) -> &'static str {
        match self {
            Gpr::Rax => "RAX",
            Gpr::Rbx => "RBX",
            Gpr::Rcx => "RCX",
            Gpr::Rdx => "RDX",
            Gpr::Rsi => "RSI",
            Gpr::Rdi => "RDI",
            Gpr::Rsp => "RSP",
            Gpr::Rbp => "RBP",
            Gpr::R8 => "R8",
            Gpr::R9 => "R9",
            Gpr::R10 => "R10",
            Gpr::R11 => "R11",
            Gpr::R12 => "R12",
            Gpr::R13 => "R13",
            Gpr::R14 => "R14",
            Gpr::R15 => "R15",
        }
    }

    /// Look up a register by name, ignoring ASCII case.
    pub fn from_name(name: &str) -> Option<Gpr> {
        Gpr::ALL
            .iter()
            .copied()
            .find(|r| r.name().eq_ignore_ascii_case(name))
    }

    /// The legacy high byte of this register, for `RAX`..`RDX`.
    pub fn high_byte(self) -> Option<HighByte> {
        HighByte::from_index(self.index())
    }
}

impl fmt::Display for Gpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One of the four legacy high-byte registers.
///
/// `AH` occupies bits 8..16 of `RAX`, and likewise for the others, so a high
/// byte always overlaps the general register with the same number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum HighByte {
    /// Bits 8..16 of `RAX`.
    Ah = 0,
    /// Bits 8..16 of `RBX`.
    Bh = 1,
    /// Bits 8..16 of `RCX`.
    Ch = 2,
    /// Bits 8..16 of `RDX`.
    Dh = 3,
}

impl HighByte {
    /// All high bytes in numbering order.
    pub const ALL: [HighByte; 4] = [HighByte::Ah, HighByte::Bh, HighByte::Ch, HighByte::Dh];

    /// High-byte number (0–3).
    #[inline]
    pub fn index(self) -> u8 {
        self as u8
    }

    /// High byte with the given number, if it exists.
    pub fn from_index(n: u8) -> Option<HighByte> {
        HighByte::ALL.get(n as usize).copied()
    }

    /// The general register this high byte is part of.
    pub fn full_register(self) -> Gpr {
        match self {
            HighByte::Ah => Gpr::Rax,
            HighByte::Bh => Gpr::Rbx,
            HighByte::Ch => Gpr::Rcx,
            HighByte::Dh => Gpr::Rdx,
        }
    }

    /// Upper-case register name.
    pub fn name(self) -> &'static str {
        match self {
            HighByte::Ah => "AH",
            HighByte::Bh => "BH",
            HighByte::Ch => "CH",
            HighByte::Dh => "DH",
        }
    }

    /// Look up a high byte by name, ignoring ASCII case.
    pub fn from_name(name: &str) -> Option<HighByte> {
        HighByte::ALL
            .iter()
            .copied()
            .find(|h| h.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for HighByte {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One of the 32 vector registers.
///
/// `XMMn`, `YMMn` and `ZMMn` all name the same register; registers 16..32
/// form the "high half" of the SIMD space that only some encodings reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimdReg(u8);

impl SimdReg {
    /// Number of vector registers.
    pub const COUNT: u8 = 32;

    /// Vector register `n`, if `n < 32`.
    pub fn new(n: u8) -> Option<SimdReg> {
        (n < Self::COUNT).then_some(SimdReg(n))
    }

    /// Register number (0–31).
    #[inline]
    pub fn index(self) -> u8 {
        self.0
    }

    /// Whether this register lies in the upper half (16–31).
    #[inline]
    pub fn is_high_half(self) -> bool {
        self.0 >= 16
    }
}

impl fmt::Display for SimdReg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "XMM{}", self.0)
    }
}

/// SIB scale factor of an index register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Scale {
    /// `index * 1`.
    One,
    /// `index * 2`.
    Two,
    /// `index * 4`.
    Four,
    /// `index * 8`.
    Eight,
}

impl Scale {
    /// Multiplier value.
    pub fn factor(self) -> u8 {
        match self {
            Scale::One => 1,
            Scale::Two => 2,
            Scale::Four => 4,
            Scale::Eight => 8,
        }
    }

    /// Scale for a multiplier value.
    pub fn from_factor(n: u64) -> Option<Scale> {
        match n {
            1 => Some(Scale::One),
            2 => Some(Scale::Two),
            4 => Some(Scale::Four),
            8 => Some(Scale::Eight),
            _ => None,
        }
    }
}

/// A `[base + scale*index + disp]` memory reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MemoryRef {
    /// Base register, or `None` for no base.
    pub base: Option<Gpr>,
    /// Index register and its scale, or `None` for no index.
    pub index: Option<(Gpr, Scale)>,
    /// Signed displacement.
    pub disp: i32,
}

impl MemoryRef {
    /// `[base + disp]`.
    pub fn based(base: Gpr, disp: i32) -> Self {
        Self {
            base: Some(base),
            index: None,
            disp,
        }
    }

    /// Whether `reg` participates in the address computation.
    pub fn uses(&self, reg: Gpr) -> bool {
        self.base == Some(reg) || self.index.map(|(r, _)| r) == Some(reg)
    }

    /// Address registers in base, index order.
    pub fn registers(&self) -> impl Iterator<Item = Gpr> {
        self.base.into_iter().chain(self.index.map(|(r, _)| r))
    }
}

/// A single instruction operand.
///
/// Absence is modelled as `Option<Operand>::None`; every `Operand` value is a
/// present, literal operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Operand {
    /// Unsigned immediate, at most 32 bits.
    Immediate(u32),
    /// General-purpose register.
    Register(Gpr),
    /// Legacy high-byte register.
    HighByte(HighByte),
    /// Vector register.
    Simd(SimdReg),
    /// Memory reference.
    Memory(MemoryRef),
    /// Instruction-pointer-relative reference.
    RipRelative(i32),
}

impl Operand {
    /// Whether this is a memory or RIP-relative reference.
    pub fn is_memory(&self) -> bool {
        matches!(self, Operand::Memory(_) | Operand::RipRelative(_))
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Immediate(v) => write!(f, "0x{:08X}", v),
            Operand::Register(r) => write!(f, "{}", r),
            Operand::HighByte(h) => write!(f, "{}", h),
            Operand::Simd(s) => write!(f, "{}", s),
            Operand::RipRelative(disp) => write!(f, "*RIP[{}]", disp),
            Operand::Memory(mem) => {
                f.write_str("*")?;
                if let Some(base) = mem.base {
                    write!(f, "{}", base)?;
                }
                match mem.index {
                    Some((index, scale)) => {
                        write!(f, "[{}*{}{:+}]", scale.factor(), index, mem.disp)
                    }
                    None => write!(f, "[{}]", mem.disp),
                }
            }
        }
    }
}

/// A storage location usable as a register-swap endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Position {
    /// A general-purpose register.
    Register(Gpr),
    /// A legacy high-byte register.
    HighByte(HighByte),
    /// A vector register.
    Simd(SimdReg),
}

impl Position {
    /// The operand naming exactly this position.
    pub fn operand(self) -> Operand {
        match self {
            Position::Register(r) => Operand::Register(r),
            Position::HighByte(h) => Operand::HighByte(h),
            Position::Simd(s) => Operand::Simd(s),
        }
    }

    /// The position an operand names, if it is a register of some kind.
    pub fn of_operand(op: Operand) -> Option<Position> {
        match op {
            Operand::Register(r) => Some(Position::Register(r)),
            Operand::HighByte(h) => Some(Position::HighByte(h)),
            Operand::Simd(s) => Some(Position::Simd(s)),
            _ => None,
        }
    }

    /// Whether both positions use the same register file.
    pub fn same_kind(self, other: Position) -> bool {
        core::mem::discriminant(&self) == core::mem::discriminant(&other)
    }

    /// The general register whose low eight fixed-effect bits cover this
    /// position, if any.
    pub fn fixed_mask_register(self) -> Option<Gpr> {
        match self {
            Position::Register(r) if r.index() < 8 => Some(r),
            Position::HighByte(h) => Some(h.full_register()),
            _ => None,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.operand())
    }
}

/// Addresses one footprint: `(extension index, footprint index)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FootprintId {
    /// Index of the extension in the instruction set.
    pub extension: u16,
    /// Index of the footprint inside the extension.
    pub index: u32,
}

impl FootprintId {
    /// Create an id.
    pub const fn new(extension: u16, index: u32) -> Self {
        Self { extension, index }
    }
}

impl fmt::Display for FootprintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.extension, self.index)
    }
}

/// One program occurrence of an opcode template.
///
/// `operands[i]` matches slot `i` of the footprint. Dereference slots and
/// slots past the end of the footprint hold `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Instruction {
    /// The opcode template.
    pub footprint: FootprintId,
    /// Operands, positionally matching the footprint's slots.
    pub operands: [Option<Operand>; 4],
}

impl Instruction {
    /// Create an instruction.
    pub fn new(footprint: FootprintId, operands: [Option<Operand>; 4]) -> Self {
        Self {
            footprint,
            operands,
        }
    }
}

/// An ordered, mutable instruction sequence.
///
/// Programs are built by parsing or by pushing instructions, and afterwards
/// mutated only through [`apply_change`](crate::change::apply_change) and
/// [`undo_last_change`](crate::change::undo_last_change).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Program {
    instructions: Vec<Instruction>,
}

impl Program {
    /// An empty program.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an instruction.
    pub fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Whether the program has no instructions.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Instruction at `index`.
    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    /// All instructions in order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Iterate over the instructions in order.
    pub fn iter(&self) -> core::slice::Iter<'_, Instruction> {
        self.instructions.iter()
    }

    pub(crate) fn instructions_mut(&mut self) -> &mut Vec<Instruction> {
        &mut self.instructions
    }
}

impl From<Vec<Instruction>> for Program {
    fn from(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }
}

impl FromIterator<Instruction> for Program {
    fn from_iter<T: IntoIterator<Item = Instruction>>(iter: T) -> Self {
        Self {
            instructions: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Program {
    type Item = &'a Instruction;
    type IntoIter = core::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.iter()
    }
}
