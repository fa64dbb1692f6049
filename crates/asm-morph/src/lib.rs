//! # asm-morph: Footprint-Driven x86-64 Program Editing
//!
//! `asm-morph` models x86-64 instructions by their *footprints* (which
//! registers, flags and memory an opcode reads and writes) and uses that
//! model to make two kinds of semantics-preserving edit to an instruction
//! sequence: swapping two registers over a window (with boundary moves
//! synthesized where needed) and moving an instruction past independent
//! neighbours. Every edit can be undone exactly.
//!
//! ## Quick Start
//!
//! ```rust
//! use asm_morph::{apply_change, build_vertical_change, load_program, print_program};
//! use asm_morph::{Change, InstructionSet};
//!
//! let isa = InstructionSet::new();
//! let mut program = load_program(&isa, "MOV64 RAX RBX\nMOV64 RCX RDX\n").unwrap();
//! let change = Change::from(build_vertical_change(&program, &isa, 0, 1).unwrap());
//! apply_change(&mut program, &isa, &change).unwrap();
//! assert_eq!(
//!     print_program(&isa, &program).unwrap(),
//!     "MOV64 RCX RDX (0,0)\nMOV64 RAX RBX (0,0)\n"
//! );
//! ```
//!
//! ## Features
//!
//! - **Text ISA descriptions**: opcode footprints load from a line-based
//!   description format; extension 0 always holds the builtin moves.
//! - **Hazard analysis**: per-instruction read and write sets over flags,
//!   registers, vector registers and untracked memory.
//! - **Register swaps**: the widest window over which two positions can be
//!   renamed, with moves, exchanges or a stack-scratch sequence at its edges.
//! - **Reordering**: moves clamped at the first dependent neighbour.
//! - **History**: linear undo/redo with one uncommitted preview.
//! - **`no_std` + `alloc`**: file loading is the only `std` dependency.

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]
// ── Pedantic lint policy ─────────────────────────────────────────────────
// The operand codec packs registers and displacements into fixed bit fields,
// so narrowing casts and long hex literals are expected here.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_lossless,
    clippy::cast_possible_wrap,
    clippy::unreadable_literal,
    clippy::match_same_arms,
    clippy::redundant_closure_for_method_calls,
    clippy::wildcard_imports,
    clippy::needless_raw_string_hashes,
    clippy::semicolon_if_nothing_returned,
    clippy::must_use_candidate,
    clippy::module_name_repetitions,
    clippy::uninlined_format_args,
    clippy::doc_markdown,
    clippy::similar_names,
    clippy::too_many_lines,
    clippy::single_match_else,
    clippy::manual_let_else,
    clippy::many_single_char_names,
    clippy::return_self_not_must_use,
    clippy::missing_errors_doc,
    clippy::needless_continue,
    clippy::needless_range_loop
)]

extern crate alloc;

/// Register-swap and reorder edits behind one type.
pub mod change;
/// Packed 64-bit operand values.
pub mod codec;
/// Error types and source-span diagnostics.
pub mod error;
/// Opcode footprints, extensions, builtins and the instruction set.
pub mod footprint;
/// Read/write sets and the adjacent-instruction swap test.
pub mod hazard;
/// Undo/redo history with a preview slot.
pub mod history;
/// Registers, operands, instructions and programs.
pub mod ir;
/// ISA description loading and printing.
pub mod isa;
/// Zero-copy lexer (tokenizer) with span tracking.
pub mod lexer;
/// Instruction text loading and printing.
pub mod parser;
/// Instruction reordering.
pub mod reorder;
/// Editing sessions.
pub mod session;
/// Register swaps.
pub mod swap;

// Re-exports
pub use change::{apply_change, undo_last_change, Change};
pub use codec::{OperandClass, RawOperand};
pub use error::{MorphError, Span};
pub use footprint::{
    check_instruction, instruction_is_valid, Access, Builtin, Flags, InstructionFootprint,
    InstructionSet, InstructionSetExtension, JumpKind, OperandFootprint, ResourceLimits, Shapes,
};
pub use hazard::{can_swap_instructions, read_places, written_places, Places};
pub use history::ChangeLog;
pub use ir::{
    FootprintId, Gpr, HighByte, Instruction, MemoryRef, Operand, Position, Program, Scale,
    SimdReg,
};
pub use parser::{load_instruction, load_program, print_instruction, print_program};
pub use reorder::{build_vertical_change, InstructionReorder};
pub use session::Session;
pub use swap::{build_horizontal_change, BoundaryMode, RegisterSwap};

/// Build an instruction set from ISA description sources.
///
/// Each `(source, path)` pair becomes one extension, in order, after the
/// builtin extension. `path` only labels error messages.
///
/// # Errors
///
/// Returns the first [`MorphError::IsaSyntax`] or
/// [`MorphError::ResourceLimitExceeded`].
///
/// # Examples
///
/// ```rust
/// use asm_morph::{instruction_set_from_sources, load_instruction};
///
/// let isa = instruction_set_from_sources(&[(
///     "INC64 00000000 00000000 0000000 0 0 00000000 00000000 0111101 0 0 io r",
///     "inc.isa",
/// )])
/// .unwrap();
/// assert!(load_instruction(&isa, "INC64 R11").is_ok());
/// ```
pub fn instruction_set_from_sources(
    sources: &[(&str, &str)],
) -> Result<InstructionSet, MorphError> {
    let mut isa = InstructionSet::new();
    for (source, path) in sources {
        isa.parse_extension(source, path)?;
    }
    Ok(isa)
}

/// Load an instruction set from ISA description files.
///
/// # Errors
///
/// Returns [`MorphError::IsaOpen`] for an unreadable file and
/// [`MorphError::IsaSyntax`] for a malformed one.
#[cfg(feature = "std")]
pub fn load_instruction_set<P: AsRef<std::path::Path>>(
    paths: &[P],
) -> Result<InstructionSet, MorphError> {
    let mut isa = InstructionSet::new();
    for path in paths {
        isa.load_extension(path)?;
    }
    Ok(isa)
}
