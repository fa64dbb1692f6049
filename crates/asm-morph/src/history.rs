//! Linear undo history with one uncommitted preview.

use alloc::vec::Vec;

use crate::change::{apply_change, undo_last_change, Change};
use crate::error::MorphError;
use crate::footprint::InstructionSet;
use crate::ir::Program;

/// Committed changes plus at most one applied-but-uncommitted preview.
///
/// The log does not own the program; every call that edits takes the program
/// it was built against. Entries `..cursor` are applied, entries `cursor..`
/// can be redone. A preview is always applied on top of the first `cursor`
/// entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChangeLog {
    entries: Vec<Change>,
    cursor: usize,
    preview: Option<Change>,
}

impl ChangeLog {
    /// An empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every recorded change, applied or not.
    pub fn entries(&self) -> &[Change] {
        &self.entries
    }

    /// Number of applied entries.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The applied, uncommitted change.
    pub fn preview(&self) -> Option<&Change> {
        self.preview.as_ref()
    }

    /// Whether an undo would revert a committed change.
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    /// Whether a redo would re-apply a change.
    pub fn can_redo(&self) -> bool {
        self.cursor < self.entries.len()
    }

    /// Replace the preview with the change `build` computes.
    ///
    /// The old preview is undone before `build` runs, so `build` sees the
    /// committed program state.
    ///
    /// # Errors
    ///
    /// Propagates errors from undoing the old preview, from `build` and from
    /// applying the new change. After a build or apply error no preview is
    /// active.
    pub fn set_preview<F>(
        &mut self,
        program: &mut Program,
        isa: &InstructionSet,
        build: F,
    ) -> Result<Change, MorphError>
    where
        F: FnOnce(&Program, &InstructionSet) -> Result<Change, MorphError>,
    {
        self.discard_preview(program, isa)?;
        let change = build(program, isa)?;
        apply_change(program, isa, &change)?;
        log::trace!("preview {:?}", change);
        self.preview = Some(change);
        Ok(change)
    }

    /// Undo and forget the preview. Returns whether there was one.
    ///
    /// # Errors
    ///
    /// Returns the undo error; the preview is kept in that case.
    pub fn discard_preview(
        &mut self,
        program: &mut Program,
        isa: &InstructionSet,
    ) -> Result<bool, MorphError> {
        let Some(change) = self.preview else {
            return Ok(false);
        };
        undo_last_change(program, isa, &change)?;
        self.preview = None;
        Ok(true)
    }

    /// Make the preview permanent. Redo entries past the cursor are dropped.
    ///
    /// Returns whether there was a preview to commit.
    pub fn commit_preview(&mut self) -> bool {
        let Some(change) = self.preview.take() else {
            return false;
        };
        self.push(change);
        true
    }

    /// Record a change the caller has already applied.
    pub fn push(&mut self, change: Change) {
        let dropped = self.entries.len() - self.cursor;
        self.entries.truncate(self.cursor);
        self.entries.push(change);
        self.cursor += 1;
        log::debug!(
            "committed change {} ({} redo entries dropped)",
            self.cursor,
            dropped
        );
    }

    /// Revert the last applied entry. Any preview is discarded first.
    ///
    /// Returns `false` if there was nothing to undo.
    ///
    /// # Errors
    ///
    /// Propagates [`undo_last_change`] errors.
    pub fn undo(&mut self, program: &mut Program, isa: &InstructionSet) -> Result<bool, MorphError> {
        self.discard_preview(program, isa)?;
        if self.cursor == 0 {
            return Ok(false);
        }
        undo_last_change(program, isa, &self.entries[self.cursor - 1])?;
        self.cursor -= 1;
        log::debug!("undo to {}", self.cursor);
        Ok(true)
    }

    /// Re-apply the next entry. Any preview is discarded first.
    ///
    /// Returns `false` if there was nothing to redo.
    ///
    /// # Errors
    ///
    /// Propagates [`apply_change`] errors.
    pub fn redo(&mut self, program: &mut Program, isa: &InstructionSet) -> Result<bool, MorphError> {
        self.discard_preview(program, isa)?;
        let Some(change) = self.entries.get(self.cursor) else {
            return Ok(false);
        };
        apply_change(program, isa, change)?;
        self.cursor += 1;
        log::debug!("redo to {}", self.cursor);
        Ok(true)
    }

    /// Forget everything without touching any program.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
        self.preview = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::load_program;
    use crate::reorder::build_vertical_change;

    fn setup() -> (InstructionSet, Program) {
        let isa = InstructionSet::new();
        let program =
            load_program(&isa, "MOV64 RAX RBX\nMOV64 RCX RDX\nMOV64 RSI RDI\n").unwrap();
        (isa, program)
    }

    fn mover(index: usize, by: isize) -> impl FnOnce(&Program, &InstructionSet) -> Result<Change, MorphError> {
        move |p, isa| build_vertical_change(p, isa, index, by).map(Change::from)
    }

    #[test]
    fn preview_then_cancel() {
        let (isa, original) = setup();
        let mut program = original.clone();
        let mut log = ChangeLog::new();
        log.set_preview(&mut program, &isa, mover(0, 2)).unwrap();
        assert_ne!(program, original);
        assert!(log.discard_preview(&mut program, &isa).unwrap());
        assert_eq!(program, original);
        assert!(!log.discard_preview(&mut program, &isa).unwrap());
        assert!(!log.can_undo());
    }

    #[test]
    fn new_preview_replaces_old() {
        let (isa, original) = setup();
        let mut program = original.clone();
        let mut log = ChangeLog::new();
        log.set_preview(&mut program, &isa, mover(0, 1)).unwrap();
        let change = log.set_preview(&mut program, &isa, mover(0, 2)).unwrap();
        assert_eq!(
            change,
            Change::from(crate::reorder::InstructionReorder {
                instruction: 0,
                displacement: 2
            })
        );
        assert_eq!(program.instructions()[2], original.instructions()[0]);
        assert_eq!(program.instructions()[0], original.instructions()[1]);
    }

    #[test]
    fn commit_undo_redo() {
        let (isa, original) = setup();
        let mut program = original.clone();
        let mut log = ChangeLog::new();
        log.set_preview(&mut program, &isa, mover(0, 1)).unwrap();
        assert!(log.commit_preview());
        assert!(!log.commit_preview());
        let after_first = program.clone();
        log.set_preview(&mut program, &isa, mover(2, -2)).unwrap();
        assert!(log.commit_preview());
        assert_eq!(log.cursor(), 2);

        assert!(log.undo(&mut program, &isa).unwrap());
        assert_eq!(program, after_first);
        assert!(log.undo(&mut program, &isa).unwrap());
        assert_eq!(program, original);
        assert!(!log.undo(&mut program, &isa).unwrap());

        assert!(log.redo(&mut program, &isa).unwrap());
        assert_eq!(program, after_first);
        assert!(log.can_redo());
    }

    #[test]
    fn commit_after_undo_drops_redo() {
        let (isa, mut program) = setup();
        let mut log = ChangeLog::new();
        for by in [1, 1] {
            log.set_preview(&mut program, &isa, mover(0, by)).unwrap();
            log.commit_preview();
        }
        log.undo(&mut program, &isa).unwrap();
        assert!(log.can_redo());
        log.set_preview(&mut program, &isa, mover(2, -1)).unwrap();
        log.commit_preview();
        assert!(!log.can_redo());
        assert_eq!(log.entries().len(), 2);
    }

    #[test]
    fn undo_discards_preview_first() {
        let (isa, original) = setup();
        let mut program = original.clone();
        let mut log = ChangeLog::new();
        log.set_preview(&mut program, &isa, mover(1, 1)).unwrap();
        assert!(!log.undo(&mut program, &isa).unwrap());
        assert_eq!(program, original);
        assert!(log.preview().is_none());
    }

    #[test]
    fn failed_build_leaves_no_preview() {
        let (isa, original) = setup();
        let mut program = original.clone();
        let mut log = ChangeLog::new();
        log.set_preview(&mut program, &isa, mover(0, 1)).unwrap();
        assert!(log.set_preview(&mut program, &isa, mover(9, 1)).is_err());
        assert!(log.preview().is_none());
        assert_eq!(program, original);
    }
}
