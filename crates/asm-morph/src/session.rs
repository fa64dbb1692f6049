//! An editing session: one program, its instruction set, and its history.

use alloc::string::String;

use crate::change::Change;
use crate::error::MorphError;
use crate::footprint::InstructionSet;
use crate::history::ChangeLog;
use crate::ir::{Position, Program};
use crate::parser::{load_program, print_program};
use crate::reorder::build_vertical_change;
use crate::swap::build_horizontal_change;

/// Interactive editing over one program.
///
/// A gesture in progress is shown as a preview; [`commit`](Session::commit)
/// keeps it and [`cancel`](Session::cancel) reverts it.
///
/// # Examples
///
/// ```rust
/// use asm_morph::{InstructionSet, Session};
///
/// let mut session = Session::new(InstructionSet::new());
/// session.paste_text("MOV64 RAX RBX\nMOV64 RCX RDX\n")?;
/// session.preview_move(0, 1)?;
/// session.commit();
/// assert_eq!(session.copy_text()?, "MOV64 RCX RDX (0,0)\nMOV64 RAX RBX (0,0)\n");
///
/// session.undo()?;
/// assert_eq!(session.copy_text()?, "MOV64 RAX RBX (0,0)\nMOV64 RCX RDX (0,0)\n");
/// # Ok::<(), asm_morph::MorphError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Session {
    isa: InstructionSet,
    program: Program,
    log: ChangeLog,
}

impl Session {
    /// A session over an empty program.
    pub fn new(isa: InstructionSet) -> Self {
        Self::with_program(isa, Program::new())
    }

    /// A session over an existing program.
    pub fn with_program(isa: InstructionSet, program: Program) -> Self {
        Self {
            isa,
            program,
            log: ChangeLog::new(),
        }
    }

    /// The instruction set.
    pub fn isa(&self) -> &InstructionSet {
        &self.isa
    }

    /// The program, including any preview.
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// The history.
    pub fn log(&self) -> &ChangeLog {
        &self.log
    }

    /// Preview swapping `pos1` and `pos2` around `index`.
    ///
    /// Equal positions discard the current preview and return `None`.
    ///
    /// # Errors
    ///
    /// As [`build_horizontal_change`] and [`apply_change`](crate::apply_change).
    pub fn preview_register_swap(
        &mut self,
        index: usize,
        pos1: Position,
        pos2: Position,
    ) -> Result<Option<Change>, MorphError> {
        if pos1 == pos2 {
            self.log.discard_preview(&mut self.program, &self.isa)?;
            return Ok(None);
        }
        self.log
            .set_preview(&mut self.program, &self.isa, |program, isa| {
                build_horizontal_change(program, isa, index, pos1, pos2).map(Change::from)
            })
            .map(Some)
    }

    /// Preview moving the instruction at `index` by `displacement` places.
    ///
    /// A zero displacement discards the current preview and returns `None`.
    ///
    /// # Errors
    ///
    /// As [`build_vertical_change`].
    pub fn preview_move(
        &mut self,
        index: usize,
        displacement: isize,
    ) -> Result<Option<Change>, MorphError> {
        if displacement == 0 {
            self.log.discard_preview(&mut self.program, &self.isa)?;
            return Ok(None);
        }
        self.log
            .set_preview(&mut self.program, &self.isa, |program, isa| {
                build_vertical_change(program, isa, index, displacement).map(Change::from)
            })
            .map(Some)
    }

    /// Keep the preview. Returns whether there was one.
    pub fn commit(&mut self) -> bool {
        self.log.commit_preview()
    }

    /// Revert the preview. Returns whether there was one.
    ///
    /// # Errors
    ///
    /// Returns [`MorphError::StaleChange`] if the preview no longer fits.
    pub fn cancel(&mut self) -> Result<bool, MorphError> {
        self.log.discard_preview(&mut self.program, &self.isa)
    }

    /// Revert the last committed change.
    ///
    /// # Errors
    ///
    /// As [`ChangeLog::undo`].
    pub fn undo(&mut self) -> Result<bool, MorphError> {
        self.log.undo(&mut self.program, &self.isa)
    }

    /// Re-apply the next undone change.
    ///
    /// # Errors
    ///
    /// As [`ChangeLog::redo`].
    pub fn redo(&mut self) -> Result<bool, MorphError> {
        self.log.redo(&mut self.program, &self.isa)
    }

    /// The program as text, preview included.
    ///
    /// # Errors
    ///
    /// As [`print_program`].
    pub fn copy_text(&self) -> Result<String, MorphError> {
        print_program(&self.isa, &self.program)
    }

    /// Replace the program with `text`, clearing the history.
    ///
    /// # Errors
    ///
    /// As [`load_program`]. On error the session is unchanged.
    pub fn paste_text(&mut self, text: &str) -> Result<(), MorphError> {
        let program = load_program(&self.isa, text)?;
        log::debug!("pasted {} instructions", program.len());
        self.program = program;
        self.log.clear();
        Ok(())
    }

    /// Take the program out, ending the session.
    pub fn into_program(self) -> Program {
        self.program
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Gpr;

    fn session(text: &str) -> Session {
        let mut s = Session::new(InstructionSet::new());
        s.paste_text(text).unwrap();
        s
    }

    #[test]
    fn equal_positions_cancel_the_preview() {
        let mut s = session("MOV64 RAX RBX\n");
        let before = s.program().clone();
        let rax = Position::Register(Gpr::Rax);
        let rcx = Position::Register(Gpr::Rcx);
        assert!(s.preview_register_swap(0, rax, rcx).unwrap().is_some());
        assert_ne!(s.program(), &before);
        assert!(s.preview_register_swap(0, rax, rax).unwrap().is_none());
        assert_eq!(s.program(), &before);
    }

    #[test]
    fn zero_move_cancels_the_preview() {
        let mut s = session("MOV64 RAX RBX\nMOV64 RCX RDX\n");
        let before = s.program().clone();
        s.preview_move(0, 1).unwrap();
        assert_ne!(s.program(), &before);
        assert!(s.preview_move(0, 0).unwrap().is_none());
        assert_eq!(s.program(), &before);
        assert!(!s.commit());
    }

    #[test]
    fn cancel_reverts() {
        let mut s = session("MOV64 RAX RBX\nMOV64 RCX RDX\n");
        let before = s.copy_text().unwrap();
        s.preview_move(1, -1).unwrap();
        assert!(s.cancel().unwrap());
        assert_eq!(s.copy_text().unwrap(), before);
        assert!(!s.cancel().unwrap());
    }

    #[test]
    fn failed_paste_keeps_state() {
        let mut s = session("MOV64 RAX RBX\nMOV64 RCX RDX\n");
        s.preview_move(0, 1).unwrap();
        s.commit();
        let text = s.copy_text().unwrap();
        assert!(s.paste_text("MOV64 RAX\n").is_err());
        assert_eq!(s.copy_text().unwrap(), text);
        assert!(s.log().can_undo());
    }

    #[test]
    fn paste_clears_history() {
        let mut s = session("MOV64 RAX RBX\nMOV64 RCX RDX\n");
        s.preview_move(0, 1).unwrap();
        s.commit();
        s.paste_text("MOV64 RSI RDI\n").unwrap();
        assert!(!s.log().can_undo());
        assert!(!s.undo().unwrap());
    }

    #[test]
    fn copy_then_paste_round_trips() {
        let mut s = session("MOV64 RAX RBX\nXCHG64 RCX RDX\n");
        s.preview_register_swap(1, Position::Register(Gpr::Rcx), Position::Register(Gpr::R9))
            .unwrap();
        s.commit();
        let text = s.copy_text().unwrap();
        let edited = s.program().clone();
        s.paste_text(&text).unwrap();
        assert_eq!(s.into_program(), edited);
    }
}
