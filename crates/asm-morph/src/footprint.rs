//! Static opcode descriptions.
//!
//! An [`InstructionFootprint`] is the read/write/shape contract of one opcode
//! template. Footprints are grouped into [`InstructionSetExtension`]s, and an
//! [`InstructionSet`] is the ordered list of extensions a program is written
//! against. Extension 0 of every instruction set built with
//! [`InstructionSet::new`] holds the builtin footprints the change engine
//! needs to synthesize boundary moves and exchanges.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::error::{MorphError, Span};
use crate::ir::{FootprintId, Gpr, Instruction, Operand};

/// How an operand slot touches its storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Access {
    /// Read only (`in`).
    Read,
    /// Written only (`out`).
    Write,
    /// Read, then written (`io`).
    ReadWrite,
}

impl Access {
    /// Whether the slot reads its storage.
    #[inline]
    pub fn reads(self) -> bool {
        !matches!(self, Access::Write)
    }

    /// Whether the slot writes its storage.
    #[inline]
    pub fn writes(self) -> bool {
        !matches!(self, Access::Read)
    }

    /// ISA-file keyword (`in`, `out`, `io`).
    pub fn keyword(self) -> &'static str {
        match self {
            Access::Read => "in",
            Access::Write => "out",
            Access::ReadWrite => "io",
        }
    }
}

/// Register shapes a slot accepts.
///
/// General-register shapes (`register`, `high_byte`) and vector shapes
/// (`low_simd`, `high_simd`) are never mixed in one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Shapes {
    /// Any of the sixteen general registers (`r`).
    pub register: bool,
    /// `AH`, `BH`, `CH` or `DH` (`h`).
    pub high_byte: bool,
    /// Vector registers 0–15 (`x`).
    pub low_simd: bool,
    /// Vector registers 16–31 (`y`).
    pub high_simd: bool,
}

impl Shapes {
    /// Whether this is a vector slot.
    #[inline]
    pub fn is_simd(&self) -> bool {
        self.low_simd || self.high_simd
    }

    /// Whether any register shape is accepted.
    #[inline]
    pub fn any(&self) -> bool {
        self.register || self.high_byte || self.low_simd || self.high_simd
    }
}

const HEAD_TYPE: u8 = 0b1100_0000;
const HEAD_IN: u8 = 0b0100_0000;
const HEAD_OUT: u8 = 0b1000_0000;
const HEAD_IO: u8 = 0b1100_0000;
const HEAD_DEREF_TYPE: u8 = 0b0011_0000;
const HEAD_IN_DEREF: u8 = 0b0001_0000;
const HEAD_IO_DEREF: u8 = 0b0010_0000;
const HEAD_OUT_DEREF: u8 = 0b0011_0000;
const HEAD_PTR_REGISTER: u8 = 0b0000_0111;
const HEAD_SIMD: u8 = 0b0010_0000;
const HEAD_REGISTER: u8 = 0b0001_0000;
const HEAD_HIGH_BYTE: u8 = 0b0000_1000;
const HEAD_LOW_SIMD: u8 = 0b0011_0000;
const HEAD_HIGH_SIMD: u8 = 0b0010_1000;
const HEAD_IMMEDIATE_SIZE: u8 = 0b0000_0111;

/// The static shape of one operand slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OperandFootprint {
    /// A literal operand slot.
    Explicit {
        /// Read/write role.
        access: Access,
        /// Accepted register shapes.
        shapes: Shapes,
        /// Widest accepted immediate in bytes (0 = no immediate).
        immediate_bytes: u8,
        /// Memory access size in bytes (0 = no memory or RIP operand).
        memory_size: u8,
    },
    /// An implicit access through a pointer register; carries no operand.
    Deref {
        /// Read/write role of the dereference.
        access: Access,
        /// Pointer register (one of the first eight).
        pointer: Gpr,
        /// Access size in bytes.
        size: u8,
    },
}

impl OperandFootprint {
    /// Read/write role of the slot.
    pub fn access(&self) -> Access {
        match *self {
            OperandFootprint::Explicit { access, .. } | OperandFootprint::Deref { access, .. } => {
                access
            }
        }
    }

    /// Whether the slot carries a literal operand.
    pub fn is_explicit(&self) -> bool {
        matches!(self, OperandFootprint::Explicit { .. })
    }

    /// Packed head byte.
    pub fn to_head(&self) -> u8 {
        match *self {
            OperandFootprint::Explicit {
                access,
                shapes,
                immediate_bytes,
                ..
            } => {
                let mut head = match access {
                    Access::Read => HEAD_IN,
                    Access::Write => HEAD_OUT,
                    Access::ReadWrite => HEAD_IO,
                };
                if shapes.is_simd() {
                    head |= HEAD_SIMD;
                    if shapes.low_simd {
                        head |= HEAD_LOW_SIMD;
                    }
                    if shapes.high_simd {
                        head |= HEAD_HIGH_SIMD;
                    }
                } else {
                    if shapes.register {
                        head |= HEAD_REGISTER;
                    }
                    if shapes.high_byte {
                        head |= HEAD_HIGH_BYTE;
                    }
                }
                head | (immediate_bytes & HEAD_IMMEDIATE_SIZE)
            }
            OperandFootprint::Deref {
                access, pointer, ..
            } => {
                let kind = match access {
                    Access::Read => HEAD_IN_DEREF,
                    Access::ReadWrite => HEAD_IO_DEREF,
                    Access::Write => HEAD_OUT_DEREF,
                };
                kind | (pointer.index() & HEAD_PTR_REGISTER)
            }
        }
    }

    /// Size byte stored alongside the head.
    pub fn size_byte(&self) -> u8 {
        match *self {
            OperandFootprint::Explicit { memory_size, .. } => memory_size,
            OperandFootprint::Deref { size, .. } => size,
        }
    }

    /// Decode a packed head and size byte.
    ///
    /// Returns `None` for the zero head, which terminates a slot list.
    pub fn from_head(head: u8, size: u8) -> Option<OperandFootprint> {
        if head == 0 {
            return None;
        }
        let access = match head & HEAD_TYPE {
            HEAD_IN => Access::Read,
            HEAD_OUT => Access::Write,
            HEAD_IO => Access::ReadWrite,
            _ => {
                let access = match head & HEAD_DEREF_TYPE {
                    HEAD_IN_DEREF => Access::Read,
                    HEAD_IO_DEREF => Access::ReadWrite,
                    HEAD_OUT_DEREF => Access::Write,
                    _ => return None,
                };
                return Some(OperandFootprint::Deref {
                    access,
                    pointer: Gpr::from_index(head & HEAD_PTR_REGISTER)?,
                    size,
                });
            }
        };
        let shapes = if head & HEAD_SIMD != 0 {
            Shapes {
                low_simd: head & HEAD_LOW_SIMD == HEAD_LOW_SIMD,
                high_simd: head & HEAD_HIGH_SIMD == HEAD_HIGH_SIMD,
                ..Shapes::default()
            }
        } else {
            Shapes {
                register: head & HEAD_REGISTER != 0,
                high_byte: head & HEAD_HIGH_BYTE != 0,
                ..Shapes::default()
            }
        };
        Some(OperandFootprint::Explicit {
            access,
            shapes,
            immediate_bytes: head & HEAD_IMMEDIATE_SIZE,
            memory_size: size,
        })
    }

    /// Whether a literal operand may occupy this slot.
    pub fn admits(&self, op: &Operand) -> bool {
        let OperandFootprint::Explicit {
            shapes,
            immediate_bytes,
            memory_size,
            ..
        } = *self
        else {
            return false;
        };
        match *op {
            Operand::Immediate(v) => {
                immediate_bytes != 0
                    && (immediate_bytes >= 4 || u64::from(v) >> (8 * u32::from(immediate_bytes)) == 0)
            }
            Operand::Register(_) => !shapes.is_simd() && shapes.register,
            Operand::HighByte(_) => !shapes.is_simd() && shapes.high_byte,
            Operand::Simd(s) if s.is_high_half() => shapes.high_simd,
            Operand::Simd(_) => shapes.low_simd,
            Operand::Memory(_) | Operand::RipRelative(_) => memory_size != 0,
        }
    }
}

/// Condition-flag mask.
///
/// Bit layout: `CF`=0x80, `PF`=0x40, `AF`=0x20, `ZF`=0x10, `SF`=0x08,
/// `DF`=0x04, `OF`=0x02, and 0x01 for state the model does not track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Flags(pub u8);

impl Flags {
    /// No flags.
    pub const NONE: Flags = Flags(0);
    /// Carry.
    pub const CF: Flags = Flags(0x80);
    /// Parity.
    pub const PF: Flags = Flags(0x40);
    /// Auxiliary carry.
    pub const AF: Flags = Flags(0x20);
    /// Zero.
    pub const ZF: Flags = Flags(0x10);
    /// Sign.
    pub const SF: Flags = Flags(0x08);
    /// Direction.
    pub const DF: Flags = Flags(0x04);
    /// Overflow.
    pub const OF: Flags = Flags(0x02);
    /// Untracked processor state.
    pub const UNTRACKED: Flags = Flags(0x01);
    /// The six arithmetic status flags.
    pub const STATUS: Flags = Flags(0x80 | 0x40 | 0x20 | 0x10 | 0x08 | 0x02);

    /// Raw bits.
    #[inline]
    pub fn bits(self) -> u8 {
        self.0
    }

    /// Whether every flag in `other` is set.
    #[inline]
    pub fn contains(self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether no flag is set.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl core::ops::BitOr for Flags {
    type Output = Flags;

    fn bitor(self, rhs: Flags) -> Flags {
        Flags(self.0 | rhs.0)
    }
}

/// Control-transfer classification of an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum JumpKind {
    /// Falls through.
    #[default]
    None = 0,
    /// `jmp rel`.
    UnconditionalRelative = 1,
    /// `jmp r/m`.
    UnconditionalAbsolute = 2,
    /// `jmp far`.
    UnconditionalFar = 3,
    /// `jcc rel`.
    ConditionalRelative = 4,
    /// Conditional absolute.
    ConditionalAbsolute = 5,
    /// Conditional far.
    ConditionalFar = 6,
}

impl JumpKind {
    /// Digit used in ISA descriptions.
    pub fn digit(self) -> u8 {
        self as u8
    }

    /// Jump kind for an ISA digit.
    pub fn from_digit(d: u8) -> Option<JumpKind> {
        Some(match d {
            0 => JumpKind::None,
            1 => JumpKind::UnconditionalRelative,
            2 => JumpKind::UnconditionalAbsolute,
            3 => JumpKind::UnconditionalFar,
            4 => JumpKind::ConditionalRelative,
            5 => JumpKind::ConditionalAbsolute,
            6 => JumpKind::ConditionalFar,
            _ => return None,
        })
    }

    /// Whether control may leave the fall-through path.
    #[inline]
    pub fn is_jump(self) -> bool {
        self != JumpKind::None
    }
}

/// One opcode template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InstructionFootprint {
    /// Byte offset of the name in the extension's name pool.
    pub name: u32,
    /// Registers `RAX`..`RBP` the opcode always reads (bit 0 = `RAX`).
    pub always_read_registers: u8,
    /// Flags the opcode always reads.
    pub always_read_flags: Flags,
    /// Registers `RAX`..`RBP` the opcode always writes.
    pub always_written_registers: u8,
    /// Flags the opcode always writes.
    pub always_written_flags: Flags,
    /// Control-transfer classification.
    pub jump: JumpKind,
    /// Operand slots; the first `None` ends the list.
    pub operands: [Option<OperandFootprint>; 4],
}

impl InstructionFootprint {
    /// Present slots with their slot index, up to the first empty slot.
    pub fn slots(&self) -> impl Iterator<Item = (usize, &OperandFootprint)> {
        self.operands
            .iter()
            .map_while(Option::as_ref)
            .enumerate()
    }

    /// Number of literal operands an instruction of this opcode carries.
    pub fn explicit_count(&self) -> usize {
        self.slots().filter(|(_, s)| s.is_explicit()).count()
    }

    /// Fixed register mask (read and written) as a `u8`.
    #[inline]
    pub fn fixed_registers(&self) -> u8 {
        self.always_read_registers | self.always_written_registers
    }
}

/// An ordered collection of footprints with a shared name pool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InstructionSetExtension {
    names: String,
    footprints: Vec<InstructionFootprint>,
}

impl InstructionSetExtension {
    /// An empty extension.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a footprint under `name` and return its index.
    ///
    /// The footprint's `name` offset is overwritten.
    pub fn push(&mut self, name: &str, mut footprint: InstructionFootprint) -> u32 {
        footprint.name = self.names.len() as u32;
        self.names.push_str(name);
        self.names.push('\0');
        self.footprints.push(footprint);
        (self.footprints.len() - 1) as u32
    }

    /// Footprint at `index`.
    pub fn footprint(&self, index: u32) -> Option<&InstructionFootprint> {
        self.footprints.get(index as usize)
    }

    /// Name of a footprint of this extension.
    pub fn name_of(&self, footprint: &InstructionFootprint) -> &str {
        let tail = self.names.get(footprint.name as usize..).unwrap_or("");
        tail.split('\0').next().unwrap_or("")
    }

    /// Name of the footprint at `index`.
    pub fn name(&self, index: u32) -> Option<&str> {
        self.footprint(index).map(|fp| self.name_of(fp))
    }

    /// All footprints in order.
    pub fn footprints(&self) -> &[InstructionFootprint] {
        &self.footprints
    }

    /// Number of footprints.
    pub fn len(&self) -> usize {
        self.footprints.len()
    }

    /// Whether the extension has no footprints.
    pub fn is_empty(&self) -> bool {
        self.footprints.is_empty()
    }
}

/// Caps on input sizes.
///
/// # Examples
///
/// ```rust
/// use asm_morph::{InstructionSet, ResourceLimits};
///
/// let isa = InstructionSet::new().with_limits(ResourceLimits {
///     max_instructions: 10_000,
///     ..ResourceLimits::default()
/// });
/// assert_eq!(isa.limits().max_instructions, 10_000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourceLimits {
    /// Maximum instructions in one loaded program. Default: 1,000,000.
    pub max_instructions: usize,
    /// Maximum bytes in one instruction or ISA line. Default: 4096.
    pub max_line_len: usize,
    /// Maximum extensions in an instruction set, builtins included.
    /// Default: 256.
    pub max_extensions: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_instructions: 1_000_000,
            max_line_len: 4096,
            max_extensions: 256,
        }
    }
}

/// Footprints the change engine synthesizes at window boundaries.
///
/// Builtins take their source operand first and their destination last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    /// `MOV64 src dst` between general registers.
    Mov64,
    /// `XCHG64 a b` between general registers.
    Xchg64,
    /// `MOV8 src dst` between high bytes.
    Mov8,
    /// `XCHG8 a b` between high bytes.
    Xchg8,
    /// `MOVDQU src dst` between vector registers.
    MovdquRegister,
    /// `MOVDQU src *mem` vector store.
    MovdquStore,
    /// `MOVDQU *mem dst` vector load.
    MovdquLoad,
    /// `ADD64 imm dst`.
    Add64,
    /// `SUB64 imm dst`.
    Sub64,
}

impl Builtin {
    /// All builtins in extension order.
    pub const ALL: [Builtin; 9] = [
        Builtin::Mov64,
        Builtin::Xchg64,
        Builtin::Mov8,
        Builtin::Xchg8,
        Builtin::MovdquRegister,
        Builtin::MovdquStore,
        Builtin::MovdquLoad,
        Builtin::Add64,
        Builtin::Sub64,
    ];

    /// Mnemonic.
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Mov64 => "MOV64",
            Builtin::Xchg64 => "XCHG64",
            Builtin::Mov8 => "MOV8",
            Builtin::Xchg8 => "XCHG8",
            Builtin::MovdquRegister | Builtin::MovdquStore | Builtin::MovdquLoad => "MOVDQU",
            Builtin::Add64 => "ADD64",
            Builtin::Sub64 => "SUB64",
        }
    }

    /// Id inside the builtin extension.
    pub fn id(self) -> FootprintId {
        FootprintId::new(0, self as u32)
    }

    fn footprint(self) -> InstructionFootprint {
        let gpr = Shapes {
            register: true,
            ..Shapes::default()
        };
        let high = Shapes {
            high_byte: true,
            ..Shapes::default()
        };
        let vector = Shapes {
            low_simd: true,
            high_simd: true,
            ..Shapes::default()
        };
        let slot = |access, shapes| OperandFootprint::Explicit {
            access,
            shapes,
            immediate_bytes: 0,
            memory_size: 0,
        };
        let memory = |access| OperandFootprint::Explicit {
            access,
            shapes: Shapes::default(),
            immediate_bytes: 0,
            memory_size: 64,
        };
        let imm32 = OperandFootprint::Explicit {
            access: Access::Read,
            shapes: Shapes::default(),
            immediate_bytes: 4,
            memory_size: 0,
        };
        let (first, second) = match self {
            Builtin::Mov64 => (slot(Access::Read, gpr), slot(Access::Write, gpr)),
            Builtin::Xchg64 => (slot(Access::ReadWrite, gpr), slot(Access::ReadWrite, gpr)),
            Builtin::Mov8 => (slot(Access::Read, high), slot(Access::Write, high)),
            Builtin::Xchg8 => (slot(Access::ReadWrite, high), slot(Access::ReadWrite, high)),
            Builtin::MovdquRegister => (slot(Access::Read, vector), slot(Access::Write, vector)),
            Builtin::MovdquStore => (slot(Access::Read, vector), memory(Access::Write)),
            Builtin::MovdquLoad => (memory(Access::Read), slot(Access::Write, vector)),
            Builtin::Add64 | Builtin::Sub64 => (imm32, slot(Access::ReadWrite, gpr)),
        };
        let written_flags = match self {
            Builtin::Add64 | Builtin::Sub64 => Flags::STATUS,
            _ => Flags::NONE,
        };
        InstructionFootprint {
            always_written_flags: written_flags,
            operands: [Some(first), Some(second), None, None],
            ..InstructionFootprint::default()
        }
    }

    /// The extension holding every builtin at its fixed index.
    pub fn extension() -> InstructionSetExtension {
        let mut ext = InstructionSetExtension::new();
        for builtin in Builtin::ALL {
            ext.push(builtin.name(), builtin.footprint());
        }
        ext
    }
}

/// The active instruction set: an ordered list of extensions.
///
/// Passed by shared reference to every loader and analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InstructionSet {
    extensions: Vec<InstructionSetExtension>,
    has_builtins: bool,
    limits: ResourceLimits,
}

impl Default for InstructionSet {
    fn default() -> Self {
        Self::new()
    }
}

impl InstructionSet {
    /// An instruction set holding only the builtin extension.
    pub fn new() -> Self {
        Self {
            extensions: alloc::vec![Builtin::extension()],
            has_builtins: true,
            limits: ResourceLimits::default(),
        }
    }

    /// An instruction set with no extensions at all.
    ///
    /// Changes that need a synthesized boundary instruction fail with
    /// [`MorphError::MissingBuiltin`] against such a set.
    pub fn without_builtins() -> Self {
        Self {
            extensions: Vec::new(),
            has_builtins: false,
            limits: ResourceLimits::default(),
        }
    }

    /// Replace the resource limits.
    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Active resource limits.
    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }

    /// Append an extension and return its index.
    ///
    /// # Errors
    ///
    /// Returns [`MorphError::ResourceLimitExceeded`] if the set already
    /// holds `max_extensions` extensions.
    pub fn push_extension(&mut self, extension: InstructionSetExtension) -> Result<u16, MorphError> {
        let limit = self.limits.max_extensions.min(usize::from(u16::MAX) + 1);
        if self.extensions.len() >= limit {
            return Err(MorphError::ResourceLimitExceeded {
                resource: String::from("extensions"),
                limit,
            });
        }
        self.extensions.push(extension);
        Ok((self.extensions.len() - 1) as u16)
    }

    /// All extensions in order.
    pub fn extensions(&self) -> &[InstructionSetExtension] {
        &self.extensions
    }

    /// Extension at `index`.
    pub fn extension(&self, index: u16) -> Option<&InstructionSetExtension> {
        self.extensions.get(usize::from(index))
    }

    /// Footprint addressed by `id`.
    pub fn footprint(&self, id: FootprintId) -> Option<&InstructionFootprint> {
        self.extension(id.extension)?.footprint(id.index)
    }

    /// Name of the footprint addressed by `id`.
    pub fn name(&self, id: FootprintId) -> Option<&str> {
        self.extension(id.extension)?.name(id.index)
    }

    /// Every footprint carrying `name`, in (extension, index) order.
    pub fn footprints_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = (FootprintId, &'a InstructionFootprint)> + 'a {
        self.extensions
            .iter()
            .enumerate()
            .flat_map(move |(e, ext)| {
                ext.footprints()
                    .iter()
                    .enumerate()
                    .filter(move |(_, fp)| ext.name_of(fp) == name)
                    .map(move |(i, fp)| (FootprintId::new(e as u16, i as u32), fp))
            })
    }

    /// Id of a builtin footprint.
    ///
    /// # Errors
    ///
    /// Returns [`MorphError::MissingBuiltin`] if this set was created
    /// without the builtin extension.
    pub fn builtin(&self, builtin: Builtin) -> Result<FootprintId, MorphError> {
        if self.has_builtins {
            Ok(builtin.id())
        } else {
            Err(MorphError::MissingBuiltin {
                name: String::from(builtin.name()),
            })
        }
    }
}

/// Check an instruction against its footprint.
///
/// Every explicit slot must hold an operand it admits; dereference slots and
/// slots past the end of the footprint must be empty.
///
/// # Errors
///
/// Returns [`MorphError::UnknownFootprint`] for an id outside the set and
/// [`MorphError::InvalidInstruction`] naming the first offending slot.
pub fn check_instruction(isa: &InstructionSet, inst: &Instruction) -> Result<(), MorphError> {
    let fp = isa
        .footprint(inst.footprint)
        .ok_or(MorphError::UnknownFootprint {
            extension: inst.footprint.extension,
            index: inst.footprint.index,
            span: Span::dummy(),
        })?;
    let mut terminated = false;
    for (i, (slot, op)) in fp.operands.iter().zip(inst.operands.iter()).enumerate() {
        terminated |= slot.is_none();
        let slot = if terminated { None } else { slot.as_ref() };
        match (slot, op) {
            (Some(s), Some(op)) if s.is_explicit() => {
                if !s.admits(op) {
                    return Err(MorphError::InvalidInstruction {
                        detail: format!("operand {} ({}) does not fit its slot", i + 1, op),
                        span: Span::dummy(),
                    });
                }
            }
            (Some(s), None) if s.is_explicit() => {
                return Err(MorphError::InvalidInstruction {
                    detail: format!("operand {} is missing", i + 1),
                    span: Span::dummy(),
                });
            }
            (_, Some(op)) => {
                return Err(MorphError::InvalidInstruction {
                    detail: format!("unexpected operand {} ({})", i + 1, op),
                    span: Span::dummy(),
                });
            }
            _ => {}
        }
    }
    Ok(())
}

/// Whether an instruction satisfies its footprint.
pub fn instruction_is_valid(isa: &InstructionSet, inst: &Instruction) -> bool {
    check_instruction(isa, inst).is_ok()
}
