//! The two kinds of edit and their shared apply/undo entry points.

use crate::error::MorphError;
use crate::footprint::InstructionSet;
use crate::ir::Program;
use crate::reorder::{self, InstructionReorder};
use crate::swap::{self, RegisterSwap};

/// One edit of a program.
///
/// Built against a program state with
/// [`build_horizontal_change`](crate::build_horizontal_change) or
/// [`build_vertical_change`](crate::build_vertical_change), then replayed
/// with [`apply_change`] and reverted with [`undo_last_change`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Change {
    /// Two positions trade places over a window.
    RegisterSwap(RegisterSwap),
    /// One instruction moves past its neighbours.
    InstructionReorder(InstructionReorder),
}

impl Change {
    /// Whether applying the change leaves every program unchanged.
    pub fn is_identity(&self) -> bool {
        match self {
            Change::RegisterSwap(_) => false,
            Change::InstructionReorder(r) => r.displacement == 0,
        }
    }
}

impl From<RegisterSwap> for Change {
    fn from(change: RegisterSwap) -> Self {
        Change::RegisterSwap(change)
    }
}

impl From<InstructionReorder> for Change {
    fn from(change: InstructionReorder) -> Self {
        Change::InstructionReorder(change)
    }
}

/// Apply a change to the program it was built for.
///
/// # Errors
///
/// Returns [`MorphError::StaleChange`] if the change does not fit the
/// program and [`MorphError::MissingBuiltin`] if a register swap needs a
/// boundary instruction `isa` lacks. The program is unchanged on error.
///
/// # Examples
///
/// ```rust
/// use asm_morph::{apply_change, build_vertical_change, load_program, undo_last_change};
/// use asm_morph::{Change, InstructionSet};
///
/// let isa = InstructionSet::new();
/// let mut program = load_program(&isa, "MOV64 RAX RBX\nMOV64 RCX RDX\n").unwrap();
/// let before = program.clone();
/// let change = Change::from(build_vertical_change(&program, &isa, 1, -1).unwrap());
///
/// apply_change(&mut program, &isa, &change).unwrap();
/// assert_eq!(program.instructions()[0], before.instructions()[1]);
///
/// undo_last_change(&mut program, &isa, &change).unwrap();
/// assert_eq!(program, before);
/// ```
pub fn apply_change(
    program: &mut Program,
    isa: &InstructionSet,
    change: &Change,
) -> Result<(), MorphError> {
    match change {
        Change::RegisterSwap(c) => swap::apply(program, isa, c),
        Change::InstructionReorder(c) => reorder::apply(program, c),
    }
}

/// Revert the most recently applied change.
///
/// `change` must be the last change applied to `program`.
///
/// # Errors
///
/// Returns [`MorphError::StaleChange`] if the program no longer has the
/// shape the change left behind.
pub fn undo_last_change(
    program: &mut Program,
    isa: &InstructionSet,
    change: &Change,
) -> Result<(), MorphError> {
    match change {
        Change::RegisterSwap(c) => swap::undo(program, isa, c),
        Change::InstructionReorder(c) => reorder::undo(program, c),
    }
}
