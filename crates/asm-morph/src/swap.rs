//! Register swaps: renaming two positions over a window of instructions.
//!
//! A swap exchanges which storage holds which value over a contiguous window
//! `first..end`. Inside the window every mention of one position is renamed
//! to the other. At each edge of the window the values are either handed over
//! by an instruction that already writes the positions (the
//! [`BoundaryMode::None`] case) or by a synthesized move or exchange.

use alloc::format;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::ops::Range;

use crate::error::MorphError;
use crate::footprint::{Access, Builtin, InstructionFootprint, InstructionSet, OperandFootprint};
use crate::ir::{Gpr, Instruction, MemoryRef, Operand, Position, Program, SimdReg};

/// How values cross one edge of a swap window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum BoundaryMode {
    /// The edge instruction's own operands are renamed; nothing is inserted.
    None = 0,
    /// A move from the first position into the second.
    MoveFirstToSecond = 1,
    /// A move from the second position into the first.
    MoveSecondToFirst = 2,
    /// A full exchange of both positions.
    ///
    /// Vector registers have no exchange instruction, so the exchange goes
    /// through a scratch slot below `RSP`. The `SUB64`/`ADD64` pair around it
    /// overwrites the status flags.
    Swap = 3,
}

impl BoundaryMode {
    /// Numeric code: bit 0 set when the first position's value still has to
    /// reach the second, bit 1 for the opposite direction.
    pub fn bits(self) -> u8 {
        self as u8
    }

    /// Mode for a numeric code.
    pub fn from_bits(bits: u8) -> Option<BoundaryMode> {
        Some(match bits {
            0 => BoundaryMode::None,
            1 => BoundaryMode::MoveFirstToSecond,
            2 => BoundaryMode::MoveSecondToFirst,
            3 => BoundaryMode::Swap,
            _ => return None,
        })
    }

    fn from_open(first_to_second: bool, second_to_first: bool) -> BoundaryMode {
        match (first_to_second, second_to_first) {
            (false, false) => BoundaryMode::None,
            (true, false) => BoundaryMode::MoveFirstToSecond,
            (false, true) => BoundaryMode::MoveSecondToFirst,
            (true, true) => BoundaryMode::Swap,
        }
    }
}

/// A horizontal change: `pos1` and `pos2` exchange roles over
/// `first..end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RegisterSwap {
    /// First position.
    pub pos1: Position,
    /// Second position, of the same kind as `pos1`.
    pub pos2: Position,
    /// Index of the first instruction in the window.
    pub first: usize,
    /// One past the last instruction in the window.
    pub end: usize,
    /// How values enter the window.
    pub at_start: BoundaryMode,
    /// How values leave the window.
    pub at_end: BoundaryMode,
}

impl RegisterSwap {
    /// The renamed instruction range, in pre-apply indices.
    pub fn window(&self) -> Range<usize> {
        self.first..self.end
    }
}

/// How one instruction uses one tracked position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Usage {
    /// Read only.
    read: bool,
    /// Written only.
    written: bool,
    /// Read and written, or written in part.
    io: bool,
}

impl Usage {
    fn record(&mut self, access: Access) {
        match access {
            Access::Read => self.read = true,
            Access::Write => self.written = true,
            Access::ReadWrite => self.io = true,
        }
    }
}

/// How an operand relates to a position.
enum Match {
    Unrelated,
    /// The operand names the position.
    Exact,
    /// The operand names a high byte inside the register position.
    Partial,
    /// The operand addresses memory through the register position.
    Address,
    /// The operand overlaps the position in a way renaming cannot follow.
    Conflict,
}

fn match_operand(op: Operand, pos: Position) -> Match {
    match (op, pos) {
        (Operand::Register(r), Position::Register(p)) if r == p => Match::Exact,
        (Operand::HighByte(h), Position::HighByte(p)) if h == p => Match::Exact,
        (Operand::Simd(s), Position::Simd(p)) if s == p => Match::Exact,
        (Operand::HighByte(h), Position::Register(p)) if h.full_register() == p => Match::Partial,
        (Operand::Memory(m), Position::Register(p)) if m.uses(p) => Match::Address,
        (Operand::Register(r), Position::HighByte(p)) if r == p.full_register() => Match::Conflict,
        (Operand::Memory(m), Position::HighByte(p)) if m.uses(p.full_register()) => Match::Conflict,
        _ => Match::Unrelated,
    }
}

fn overlaps_register(pos: Position, reg: Gpr) -> bool {
    match pos {
        Position::Register(r) => r == reg,
        Position::HighByte(h) => h.full_register() == reg,
        Position::Simd(_) => false,
    }
}

#[inline]
fn exchange<T: PartialEq>(value: T, a: T, b: T) -> T {
    if value == a {
        b
    } else if value == b {
        a
    } else {
        value
    }
}

/// `op` with `a` and `b` exchanged, or `None` if the result has no encoding.
fn rename_operand(op: Operand, a: Position, b: Position) -> Option<Operand> {
    match (a, b) {
        (Position::Register(x), Position::Register(y)) => match op {
            Operand::Register(r) => Some(Operand::Register(exchange(r, x, y))),
            Operand::HighByte(h) => {
                let full = h.full_register();
                if full == x {
                    y.high_byte().map(Operand::HighByte)
                } else if full == y {
                    x.high_byte().map(Operand::HighByte)
                } else {
                    Some(op)
                }
            }
            Operand::Memory(m) => Some(Operand::Memory(MemoryRef {
                base: m.base.map(|r| exchange(r, x, y)),
                index: m.index.map(|(r, s)| (exchange(r, x, y), s)),
                disp: m.disp,
            })),
            _ => Some(op),
        },
        (Position::HighByte(x), Position::HighByte(y)) => match op {
            Operand::HighByte(h) => Some(Operand::HighByte(exchange(h, x, y))),
            _ => Some(op),
        },
        (Position::Simd(x), Position::Simd(y)) => match op {
            Operand::Simd(s) => Some(Operand::Simd(exchange(s, x, y))),
            _ => Some(op),
        },
        _ => Some(op),
    }
}

/// Exchange `a` and `b` in every operand.
fn rename_all(inst: &mut Instruction, a: Position, b: Position) {
    for slot in inst.operands.iter_mut() {
        if let Some(op) = *slot {
            if let Some(renamed) = rename_operand(op, a, b) {
                *slot = Some(renamed);
            }
        }
    }
}

/// Exchange `a` and `b` in the write-only register operands.
fn rename_outputs(fp: &InstructionFootprint, inst: &mut Instruction, a: Position, b: Position) {
    for (i, slot) in fp.slots() {
        if slot.access() != Access::Write {
            continue;
        }
        match inst.operands[i] {
            Some(op) if !op.is_memory() => {
                if let Some(renamed) = rename_operand(op, a, b) {
                    inst.operands[i] = Some(renamed);
                }
            }
            _ => {}
        }
    }
}

/// How `inst` uses both positions, or `None` if the rename cannot pass it.
fn classify(isa: &InstructionSet, inst: &Instruction, pos: [Position; 2]) -> Option<[Usage; 2]> {
    let fp = isa.footprint(inst.footprint)?;
    let fixed = fp.fixed_registers();
    for p in pos {
        if let Some(r) = p.fixed_mask_register() {
            if fixed & (1 << r.index()) != 0 {
                return None;
            }
        }
    }

    let mut usage = [Usage::default(); 2];
    for (i, slot) in fp.slots() {
        if let OperandFootprint::Deref { pointer, .. } = *slot {
            if pos.iter().any(|&p| overlaps_register(p, pointer)) {
                return None;
            }
            continue;
        }
        let Some(op) = inst.operands[i] else {
            continue;
        };
        let access = slot.access();
        for k in 0..2 {
            match match_operand(op, pos[k]) {
                Match::Unrelated => {}
                Match::Conflict => return None,
                Match::Address => usage[k].read = true,
                m @ (Match::Exact | Match::Partial) => {
                    let renamed = rename_operand(op, pos[0], pos[1])?;
                    if !slot.admits(&renamed) {
                        return None;
                    }
                    if matches!(m, Match::Partial) && access.writes() {
                        usage[k].io = true;
                    } else {
                        usage[k].record(access);
                    }
                }
            }
        }
    }
    Some(usage)
}

/// Which directions still have to be carried upward past an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UpState {
    Closed,
    FirstOpen,
    SecondOpen,
    BothOpen,
}

impl UpState {
    fn open(self) -> (bool, bool) {
        match self {
            UpState::Closed => (false, false),
            UpState::FirstOpen => (true, false),
            UpState::SecondOpen => (false, true),
            UpState::BothOpen => (true, true),
        }
    }

    fn mode(self) -> BoundaryMode {
        let (first, second) = self.open();
        BoundaryMode::from_open(first, second)
    }

    /// A direction stays open above `usage` while its position is live
    /// there: read, updated in place, or passed through untouched.
    fn step(self, usage: [Usage; 2]) -> UpState {
        let (open1, open2) = self.open();
        let live = |u: Usage, open: bool| u.read || u.io || (open && !u.written);
        match (live(usage[0], open1), live(usage[1], open2)) {
            (false, false) => UpState::Closed,
            (true, false) => UpState::FirstOpen,
            (false, true) => UpState::SecondOpen,
            (true, true) => UpState::BothOpen,
        }
    }
}

/// Liveness of the two renamed values below the starting index.
struct DownState {
    live1: bool,
    live2: bool,
    end: usize,
}

impl DownState {
    fn step(&mut self, usage: [Usage; 2], index: usize) {
        let [u1, u2] = usage;
        if !self.live1 && !u2.read {
            self.live2 = !u2.written;
            if !u2.io {
                return;
            }
        } else if !self.live2 && !u1.read {
            self.live1 = !u1.written;
            if !u1.io {
                return;
            }
        }
        self.live1 = !u1.written || u2.io;
        self.live2 = !u2.written || u1.io;
        self.end = index + 1;
    }
}

fn check_positions(pos1: Position, pos2: Position) -> Result<(), MorphError> {
    if pos1 == pos2 {
        return Err(MorphError::InvalidPosition {
            detail: format!("cannot swap {} with itself", pos1),
        });
    }
    if !pos1.same_kind(pos2) {
        return Err(MorphError::InvalidPosition {
            detail: format!("{} and {} are different kinds of register", pos1, pos2),
        });
    }
    Ok(())
}

/// Find the widest window around `index` over which `pos1` and `pos2` can
/// trade places by renaming.
///
/// `index` may equal the program length.
///
/// # Errors
///
/// Returns [`MorphError::InvalidPosition`] for equal positions or positions
/// of different kinds, and [`MorphError::IndexOutOfRange`] for an index past
/// the end.
pub fn build_horizontal_change(
    program: &Program,
    isa: &InstructionSet,
    index: usize,
    pos1: Position,
    pos2: Position,
) -> Result<RegisterSwap, MorphError> {
    check_positions(pos1, pos2)?;
    let insts = program.instructions();
    if index > insts.len() {
        return Err(MorphError::IndexOutOfRange {
            index,
            len: insts.len(),
        });
    }
    let pos = [pos1, pos2];

    let mut first = 0;
    let mut state = UpState::BothOpen;
    let mut at_start = None;
    for i in (0..index).rev() {
        let Some(usage) = classify(isa, &insts[i], pos) else {
            first = i + 1;
            at_start = Some(state.mode());
            break;
        };
        state = state.step(usage);
        if state == UpState::Closed {
            first = i;
            at_start = Some(BoundaryMode::None);
            break;
        }
    }
    let at_start = at_start.unwrap_or_else(|| state.mode());

    let mut down = DownState {
        live1: true,
        live2: true,
        end: index,
    };
    let mut stop = None;
    for (i, inst) in insts.iter().enumerate().skip(index) {
        let Some(usage) = classify(isa, inst, pos) else {
            stop = Some((down.end, BoundaryMode::Swap));
            break;
        };
        down.step(usage, i);
        if !down.live1 && !down.live2 {
            stop = Some((down.end, BoundaryMode::None));
            break;
        }
    }
    let (end, at_end) = stop.unwrap_or((insts.len(), BoundaryMode::Swap));

    let change = RegisterSwap {
        pos1,
        pos2,
        first,
        end,
        at_start,
        at_end,
    };
    log::debug!(
        "swap {} <-> {} at {}: window {}..{}, start {:?}, end {:?}",
        pos1,
        pos2,
        index,
        first,
        end,
        at_start,
        at_end
    );
    Ok(change)
}

const SCRATCH_BYTES: u32 = 0x40;

fn builtin(isa: &InstructionSet, b: Builtin, ops: &[Operand]) -> Result<Instruction, MorphError> {
    let mut operands = [None; 4];
    for (slot, op) in operands.iter_mut().zip(ops) {
        *slot = Some(*op);
    }
    Ok(Instruction::new(isa.builtin(b)?, operands))
}

fn simd_exchange(isa: &InstructionSet, a: SimdReg, b: SimdReg) -> Result<Vec<Instruction>, MorphError> {
    let rsp = Operand::Register(Gpr::Rsp);
    let scratch = Operand::Memory(MemoryRef::based(Gpr::Rsp, 0));
    let bytes = Operand::Immediate(SCRATCH_BYTES);
    let (a, b) = (Operand::Simd(a), Operand::Simd(b));
    Ok(vec![
        builtin(isa, Builtin::Sub64, &[bytes, rsp])?,
        builtin(isa, Builtin::MovdquStore, &[a, scratch])?,
        builtin(isa, Builtin::MovdquRegister, &[b, a])?,
        builtin(isa, Builtin::MovdquLoad, &[scratch, b])?,
        builtin(isa, Builtin::Add64, &[bytes, rsp])?,
    ])
}

/// Instructions materializing `mode` between `pos1` and `pos2`.
fn boundary_sequence(
    isa: &InstructionSet,
    mode: BoundaryMode,
    pos1: Position,
    pos2: Position,
) -> Result<Vec<Instruction>, MorphError> {
    let (src, dst) = match mode {
        BoundaryMode::None => return Ok(Vec::new()),
        BoundaryMode::MoveFirstToSecond | BoundaryMode::Swap => (pos1, pos2),
        BoundaryMode::MoveSecondToFirst => (pos2, pos1),
    };
    let ops = [src.operand(), dst.operand()];
    let b = match (mode, src, dst) {
        (BoundaryMode::Swap, Position::Simd(a), Position::Simd(b)) => {
            return simd_exchange(isa, a, b);
        }
        (BoundaryMode::Swap, Position::Register(_), _) => Builtin::Xchg64,
        (BoundaryMode::Swap, Position::HighByte(_), _) => Builtin::Xchg8,
        (_, Position::Register(_), _) => Builtin::Mov64,
        (_, Position::HighByte(_), _) => Builtin::Mov8,
        (_, Position::Simd(_), _) => Builtin::MovdquRegister,
    };
    Ok(vec![builtin(isa, b, &ops)?])
}

fn stale(detail: impl Into<String>) -> MorphError {
    MorphError::StaleChange {
        detail: detail.into(),
    }
}

fn check_window(change: &RegisterSwap, len: usize) -> Result<(), MorphError> {
    if change.first > change.end || change.end > len {
        return Err(stale(format!(
            "window {}..{} does not fit a program of {} instructions",
            change.first, change.end, len
        )));
    }
    let folds = change.at_start == BoundaryMode::None || change.at_end == BoundaryMode::None;
    if folds && change.first == change.end {
        return Err(stale("a folded boundary needs a non-empty window"));
    }
    Ok(())
}

fn edge_footprint(
    isa: &InstructionSet,
    program: &Program,
    index: usize,
) -> Result<InstructionFootprint, MorphError> {
    let inst = program
        .get(index)
        .ok_or_else(|| stale(format!("no instruction at {}", index)))?;
    isa.footprint(inst.footprint)
        .copied()
        .ok_or_else(|| stale(format!("instruction {} has unknown footprint {}", index, inst.footprint)))
}

pub(crate) fn apply(
    program: &mut Program,
    isa: &InstructionSet,
    change: &RegisterSwap,
) -> Result<(), MorphError> {
    check_positions(change.pos1, change.pos2)?;
    check_window(change, program.len())?;
    let (p1, p2) = (change.pos1, change.pos2);
    let start_seq = boundary_sequence(isa, change.at_start, p1, p2)?;
    let end_seq = boundary_sequence(isa, change.at_end, p1, p2)?;
    let start_fp = match change.at_start {
        BoundaryMode::None => Some(edge_footprint(isa, program, change.first)?),
        _ => None,
    };
    let end_fp = match change.at_end {
        BoundaryMode::None => Some(edge_footprint(isa, program, change.end - 1)?),
        _ => None,
    };

    let insts = program.instructions_mut();
    for inst in &mut insts[change.first..change.end] {
        rename_all(inst, p1, p2);
    }
    match end_fp {
        Some(fp) => rename_outputs(&fp, &mut insts[change.end - 1], p1, p2),
        None => {
            insts.splice(change.end..change.end, end_seq);
        }
    }
    match start_fp {
        Some(fp) => {
            let inst = &mut insts[change.first];
            rename_all(inst, p1, p2);
            rename_outputs(&fp, inst, p1, p2);
        }
        None => {
            insts.splice(change.first..change.first, start_seq);
        }
    }
    Ok(())
}

pub(crate) fn undo(
    program: &mut Program,
    isa: &InstructionSet,
    change: &RegisterSwap,
) -> Result<(), MorphError> {
    check_positions(change.pos1, change.pos2)?;
    let (p1, p2) = (change.pos1, change.pos2);
    let start_seq = boundary_sequence(isa, change.at_start, p1, p2)?;
    let end_seq = boundary_sequence(isa, change.at_end, p1, p2)?;
    let inserted = start_seq.len() + end_seq.len();
    let original_len = program
        .len()
        .checked_sub(inserted)
        .ok_or_else(|| stale("program is shorter than the inserted boundary code"))?;
    check_window(change, original_len)?;

    let shift = start_seq.len();
    let start_range = change.first..change.first + shift;
    let end_range = change.end + shift..change.end + shift + end_seq.len();
    if program.instructions()[start_range.clone()] != start_seq[..]
        || program.instructions()[end_range] != end_seq[..]
    {
        return Err(stale("synthesized boundary code is no longer in place"));
    }
    let start_fp = match change.at_start {
        BoundaryMode::None => Some(edge_footprint(isa, program, change.first)?),
        _ => None,
    };
    let end_fp = match change.at_end {
        BoundaryMode::None => Some(edge_footprint(isa, program, change.end + shift - 1)?),
        _ => None,
    };

    let insts = program.instructions_mut();
    match start_fp {
        Some(fp) => {
            let inst = &mut insts[change.first];
            rename_outputs(&fp, inst, p1, p2);
            rename_all(inst, p1, p2);
        }
        None => {
            insts.drain(start_range);
        }
    }
    match end_fp {
        Some(fp) => rename_outputs(&fp, &mut insts[change.end - 1], p1, p2),
        None => {
            insts.drain(change.end..change.end + end_seq.len());
        }
    }
    for inst in &mut insts[change.first..change.end] {
        rename_all(inst, p1, p2);
    }
    Ok(())
}
