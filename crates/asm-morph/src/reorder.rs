//! Instruction reordering: moving one instruction up or down past
//! independent neighbours.

use alloc::format;

use crate::error::MorphError;
use crate::footprint::InstructionSet;
use crate::hazard::can_swap_instructions;
use crate::ir::Program;

/// A vertical change: the instruction at `instruction` moves by
/// `displacement` places (negative = upward).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InstructionReorder {
    /// Pre-apply index of the moved instruction.
    pub instruction: usize,
    /// Signed number of places moved.
    pub displacement: isize,
}

impl InstructionReorder {
    /// Index of the moved instruction after apply.
    pub fn destination(&self) -> usize {
        self.instruction.saturating_add_signed(self.displacement)
    }
}

/// Move the instruction at `index` by up to `displacement` places.
///
/// The move stops before the program edge and before the first neighbour the
/// instruction may not trade places with, so the returned displacement can be
/// smaller in magnitude than requested (possibly zero).
///
/// # Errors
///
/// Returns [`MorphError::IndexOutOfRange`] if `index` is not an instruction
/// of `program`.
///
/// # Examples
///
/// ```rust
/// use asm_morph::{build_vertical_change, load_program, InstructionSet};
///
/// let isa = InstructionSet::new();
/// let program = load_program(&isa, "MOV64 RAX RBX\nMOV64 RCX RDX\n").unwrap();
/// let change = build_vertical_change(&program, &isa, 0, 5).unwrap();
/// assert_eq!(change.displacement, 1);
/// ```
pub fn build_vertical_change(
    program: &Program,
    isa: &InstructionSet,
    index: usize,
    displacement: isize,
) -> Result<InstructionReorder, MorphError> {
    let insts = program.instructions();
    let Some(moved) = insts.get(index) else {
        return Err(MorphError::IndexOutOfRange {
            index,
            len: insts.len(),
        });
    };

    let room = if displacement >= 0 {
        insts.len() - 1 - index
    } else {
        index
    };
    let wanted = displacement.unsigned_abs().min(room);
    let mut reached = wanted;
    for step in 1..=wanted {
        let neighbour = if displacement >= 0 {
            index + step
        } else {
            index - step
        };
        if !can_swap_instructions(isa, moved, &insts[neighbour]) {
            reached = step - 1;
            break;
        }
    }

    let magnitude = reached as isize;
    let clamped = if displacement >= 0 {
        magnitude
    } else {
        -magnitude
    };
    if clamped != displacement {
        log::debug!(
            "move of {} clamped from {} to {}",
            index,
            displacement,
            clamped
        );
    }
    Ok(InstructionReorder {
        instruction: index,
        displacement: clamped,
    })
}

fn affected(change: &InstructionReorder, len: usize) -> Result<(usize, usize), MorphError> {
    let low = change.instruction.checked_add_signed(change.displacement.min(0));
    let high = change.instruction.checked_add_signed(change.displacement.max(0));
    match (low, high) {
        (Some(low), Some(high)) if high < len => Ok((low, high)),
        _ => Err(MorphError::StaleChange {
            detail: format!(
                "move of {} by {} does not fit a program of {} instructions",
                change.instruction, change.displacement, len
            ),
        }),
    }
}

pub(crate) fn apply(program: &mut Program, change: &InstructionReorder) -> Result<(), MorphError> {
    let (low, high) = affected(change, program.len())?;
    let range = &mut program.instructions_mut()[low..=high];
    if change.displacement >= 0 {
        range.rotate_left(1);
    } else {
        range.rotate_right(1);
    }
    Ok(())
}

pub(crate) fn undo(program: &mut Program, change: &InstructionReorder) -> Result<(), MorphError> {
    let (low, high) = affected(change, program.len())?;
    let range = &mut program.instructions_mut()[low..=high];
    if change.displacement >= 0 {
        range.rotate_right(1);
    } else {
        range.rotate_left(1);
    }
    Ok(())
}
