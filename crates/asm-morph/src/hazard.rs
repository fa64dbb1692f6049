//! Read/write sets and the adjacent-instruction swap test.
//!
//! Every instruction touches a set of [`Places`]: condition flags, general
//! registers, vector registers, and one catch-all bit standing for any
//! memory the model cannot name precisely.

use core::fmt;
use core::ops::{BitAnd, BitOr, BitOrAssign};

use crate::footprint::{Flags, InstructionFootprint, InstructionSet, OperandFootprint};
use crate::ir::{Gpr, HighByte, Instruction, Operand, SimdReg};

/// A set of storage locations.
///
/// Bit layout: flags in bits 0–7 (the [`Flags`] byte), the unknown-memory
/// bit 8, general registers in bits 16–31 (high bytes share their full
/// register's bit) and vector registers in bits 32–63.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Places(pub u64);

impl Places {
    /// The empty set.
    pub const NONE: Places = Places(0);
    /// Memory reached through an address the model does not track.
    pub const UNKNOWN: Places = Places(1 << 8);

    const REGISTER_SHIFT: u32 = 16;
    const SIMD_SHIFT: u32 = 32;

    /// The given flags.
    #[inline]
    pub fn flags(flags: Flags) -> Places {
        Places(u64::from(flags.bits()))
    }

    /// One general register.
    #[inline]
    pub fn register(reg: Gpr) -> Places {
        Places(1 << (Self::REGISTER_SHIFT + u32::from(reg.index())))
    }

    /// A high byte, which shares its full register's place.
    #[inline]
    pub fn high_byte(reg: HighByte) -> Places {
        Places::register(reg.full_register())
    }

    /// One vector register.
    #[inline]
    pub fn simd(reg: SimdReg) -> Places {
        Places(1 << (Self::SIMD_SHIFT + u32::from(reg.index())))
    }

    /// Registers `RAX`..`RBP` from a fixed-effect mask (bit 0 = `RAX`).
    #[inline]
    pub fn fixed_registers(mask: u8) -> Places {
        Places(u64::from(mask) << Self::REGISTER_SHIFT)
    }

    /// Whether the set is empty.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether the two sets share a place.
    #[inline]
    pub fn intersects(self, other: Places) -> bool {
        self.0 & other.0 != 0
    }

    /// Whether every place of `other` is in this set.
    #[inline]
    pub fn contains(self, other: Places) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Places {
    type Output = Places;

    fn bitor(self, rhs: Places) -> Places {
        Places(self.0 | rhs.0)
    }
}

impl BitOrAssign for Places {
    fn bitor_assign(&mut self, rhs: Places) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Places {
    type Output = Places;

    fn bitand(self, rhs: Places) -> Places {
        Places(self.0 & rhs.0)
    }
}

impl fmt::Display for Places {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// The place an operand names directly, if it is a register of some kind.
fn register_place(op: &Operand) -> Option<Places> {
    match *op {
        Operand::Register(r) => Some(Places::register(r)),
        Operand::HighByte(h) => Some(Places::high_byte(h)),
        Operand::Simd(s) => Some(Places::simd(s)),
        _ => None,
    }
}

/// Places an instruction may read.
pub fn read_places(fp: &InstructionFootprint, inst: &Instruction) -> Places {
    let mut places =
        Places::flags(fp.always_read_flags) | Places::fixed_registers(fp.always_read_registers);
    for (i, slot) in fp.slots() {
        let access = slot.access();
        if let OperandFootprint::Deref { pointer, .. } = *slot {
            places |= Places::register(pointer);
            if access.reads() {
                places |= Places::UNKNOWN;
            }
            continue;
        }
        let Some(op) = inst.operands[i] else {
            continue;
        };
        match op {
            Operand::Memory(mem) => {
                for reg in mem.registers() {
                    places |= Places::register(reg);
                }
                if access.reads() {
                    places |= Places::UNKNOWN;
                }
            }
            Operand::RipRelative(_) if access.reads() => places |= Places::UNKNOWN,
            _ if access.reads() => {
                if let Some(p) = register_place(&op) {
                    places |= p;
                }
            }
            _ => {}
        }
    }
    places
}

/// Places an instruction may write.
///
/// The always-read masks are folded in as well, so the result is a superset
/// of the true write set.
pub fn written_places(fp: &InstructionFootprint, inst: &Instruction) -> Places {
    let mut places = Places::flags(fp.always_read_flags | fp.always_written_flags)
        | Places::fixed_registers(fp.always_read_registers | fp.always_written_registers);
    for (i, slot) in fp.slots() {
        if !slot.access().writes() {
            continue;
        }
        if !slot.is_explicit() {
            places |= Places::UNKNOWN;
            continue;
        }
        match inst.operands[i] {
            Some(op) if op.is_memory() => places |= Places::UNKNOWN,
            Some(op) => {
                if let Some(p) = register_place(&op) {
                    places |= p;
                }
            }
            None => {}
        }
    }
    places
}

/// Whether two adjacent instructions may trade places.
///
/// Returns `false` if either is a jump or has an unknown footprint, if either
/// one writes a place the other reads, or if both write the same place.
///
/// # Examples
///
/// ```rust
/// use asm_morph::{can_swap_instructions, load_program, InstructionSet};
///
/// let isa = InstructionSet::new();
/// let p = load_program(&isa, "MOV64 RAX RBX\nMOV64 RCX RDX\nMOV64 RBX RSI\n").unwrap();
/// assert!(can_swap_instructions(&isa, &p.instructions()[0], &p.instructions()[1]));
/// assert!(!can_swap_instructions(&isa, &p.instructions()[0], &p.instructions()[2]));
/// ```
pub fn can_swap_instructions(isa: &InstructionSet, a: &Instruction, b: &Instruction) -> bool {
    let (Some(fa), Some(fb)) = (isa.footprint(a.footprint), isa.footprint(b.footprint)) else {
        return false;
    };
    if fa.jump.is_jump() || fb.jump.is_jump() {
        return false;
    }
    let (written_a, written_b) = (written_places(fa, a), written_places(fb, b));
    let conflict = read_places(fa, a).intersects(written_b)
        || read_places(fb, b).intersects(written_a)
        || written_a.intersects(written_b);
    if conflict {
        log::trace!("hazard between {} and {}", a.footprint, b.footprint);
    }
    !conflict
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{FootprintId, Program};
    use crate::parser::load_program;

    const BASE: &str = "\
ADD32 00000000 00000000 0000000 0 0 00000000 00000000 1111101 0 0 in r i4 m4 io r m4
ADC32 00000000 00000000 1000000 0 0 00000000 00000000 1111101 0 0 in r i4 io r
JMP 00000000 00000000 0000000 1 0 00000000 00000000 0000000 1 0 in i4
STORE 00000000 00000000 0000000 0 0 00000000 00000000 0000000 0 0 in r out m8
LOAD 00000000 00000000 0000000 0 0 00000000 00000000 0000000 0 0 in m8 out r
LEA 00000000 00000000 0000000 0 0 00000000 00000000 0000000 0 0 in m8 out r
MOVSB 00000000 00000000 0000010 0 0 00000000 00000000 0000000 0 0 in* RSI 1 out* RDI 1
CPUID 10000000 00000000 0000000 0 1 11110000 00000000 0000000 0 1
MOVH 00000000 00000000 0000000 0 0 00000000 00000000 0000000 0 0 in h out h
";

    fn setup(src: &str) -> (InstructionSet, Program) {
        let mut isa = InstructionSet::new();
        isa.parse_extension(BASE, "hazard.isa").unwrap();
        let program = load_program(&isa, src).unwrap();
        (isa, program)
    }

    fn places(isa: &InstructionSet, inst: &Instruction) -> (Places, Places) {
        let fp = isa.footprint(inst.footprint).unwrap();
        (read_places(fp, inst), written_places(fp, inst))
    }

    #[test]
    fn register_operands() {
        let (isa, p) = setup("ADD32 RAX RBX");
        let (r, w) = places(&isa, &p.instructions()[0]);
        assert_eq!(r, Places::register(Gpr::Rax) | Places::register(Gpr::Rbx));
        assert_eq!(w, Places::register(Gpr::Rbx) | Places::flags(Flags::STATUS));
    }

    #[test]
    fn always_read_flags_fold_into_writes() {
        let (isa, p) = setup("ADC32 RAX RBX");
        let (r, w) = places(&isa, &p.instructions()[0]);
        assert!(r.contains(Places::flags(Flags::CF)));
        assert!(w.contains(Places::flags(Flags::CF)));
    }

    #[test]
    fn memory_store_reads_address_and_writes_unknown() {
        let (isa, p) = setup("STORE RCX *RBX[4*RDX+8]");
        let (r, w) = places(&isa, &p.instructions()[0]);
        assert_eq!(
            r,
            Places::register(Gpr::Rcx) | Places::register(Gpr::Rbx) | Places::register(Gpr::Rdx)
        );
        assert_eq!(w, Places::UNKNOWN);
    }

    #[test]
    fn memory_load_reads_unknown() {
        let (isa, p) = setup("LOAD *RSP[16] RAX\nLOAD *RIP[0] RAX");
        let (r, w) = places(&isa, &p.instructions()[0]);
        assert_eq!(r, Places::register(Gpr::Rsp) | Places::UNKNOWN);
        assert_eq!(w, Places::register(Gpr::Rax));
        let (r, _) = places(&isa, &p.instructions()[1]);
        assert_eq!(r, Places::UNKNOWN);
    }

    #[test]
    fn dereference_slots() {
        let (isa, p) = setup("MOVSB");
        let (r, w) = places(&isa, &p.instructions()[0]);
        assert_eq!(
            r,
            Places::register(Gpr::Rsi)
                | Places::register(Gpr::Rdi)
                | Places::UNKNOWN
                | Places::flags(Flags::DF)
        );
        assert!(w.contains(Places::UNKNOWN));
        assert!(!w.intersects(Places::register(Gpr::Rsi)));
    }

    #[test]
    fn fixed_masks() {
        let (isa, p) = setup("CPUID");
        let (r, w) = places(&isa, &p.instructions()[0]);
        assert_eq!(r, Places::register(Gpr::Rax) | Places::flags(Flags::UNTRACKED));
        for reg in [Gpr::Rax, Gpr::Rbx, Gpr::Rcx, Gpr::Rdx] {
            assert!(w.contains(Places::register(reg)));
        }
    }

    #[test]
    fn high_bytes_alias_full_registers() {
        assert_eq!(Places::high_byte(HighByte::Bh), Places::register(Gpr::Rbx));
        let (isa, p) = setup("MOVH AH CH\nADD32 RCX RDX");
        assert!(!can_swap_instructions(&isa, &p.instructions()[0], &p.instructions()[1]));
    }

    #[test]
    fn simd_places_are_distinct() {
        let x0 = Places::simd(SimdReg::new(0).unwrap());
        let x31 = Places::simd(SimdReg::new(31).unwrap());
        assert_eq!(x0.0, 1 << 32);
        assert_eq!(x31.0, 1 << 63);
        assert!(!x0.intersects(Places::register(Gpr::R15)));
    }

    #[test]
    fn independent_instructions_swap() {
        let (isa, p) = setup("ADD32 RAX RBX\nLOAD *RSP[0] RCX");
        // ADD32 writes flags, LOAD does not read them.
        assert!(can_swap_instructions(&isa, &p.instructions()[0], &p.instructions()[1]));
    }

    #[test]
    fn flag_dependency_blocks() {
        let (isa, p) = setup("ADD32 RAX RBX\nADC32 RCX RDX");
        assert!(!can_swap_instructions(&isa, &p.instructions()[0], &p.instructions()[1]));
    }

    #[test]
    fn unknown_memory_conflicts() {
        let (isa, p) = setup("STORE RAX *RBX[0]\nLOAD *RCX[0] RDX\nSTORE RSI *RDI[0]");
        let ins = p.instructions();
        assert!(!can_swap_instructions(&isa, &ins[0], &ins[1]));
        assert!(!can_swap_instructions(&isa, &ins[0], &ins[2]));
    }

    #[test]
    fn shared_writes_block() {
        let (isa, p) = setup("ADD32 RAX RBX
ADD32 RCX RDX
LEA *RSI[0] RBX");
        let ins = p.instructions();
        // Only the status flags are shared.
        assert!(!can_swap_instructions(&isa, &ins[0], &ins[1]));
        assert!(!can_swap_instructions(&isa, &ins[0], &ins[2]));
        assert!(can_swap_instructions(&isa, &ins[1], &ins[2]));
    }

    #[test]
    fn jumps_never_swap() {
        let (isa, p) = setup("JMP 0x10\nADD32 RAX RBX");
        assert!(!can_swap_instructions(&isa, &p.instructions()[0], &p.instructions()[1]));
        assert!(!can_swap_instructions(&isa, &p.instructions()[1], &p.instructions()[0]));
    }

    #[test]
    fn unknown_footprint_never_swaps() {
        let (isa, p) = setup("ADD32 RAX RBX");
        let ghost = Instruction::new(FootprintId::new(42, 0), [None; 4]);
        assert!(!can_swap_instructions(&isa, &p.instructions()[0], &ghost));
    }

    #[test]
    fn swap_test_is_symmetric() {
        let (isa, p) = setup("ADD32 RAX RBX\nLOAD *RBX[0] RCX\nMOVSB\nLEA *RCX[0] RSI");
        let ins = p.instructions();
        for a in ins {
            for b in ins {
                assert_eq!(
                    can_swap_instructions(&isa, a, b),
                    can_swap_instructions(&isa, b, a)
                );
            }
        }
    }

    #[test]
    fn places_display() {
        assert_eq!(Places::UNKNOWN.to_string(), "0x0000000000000100");
    }
}
