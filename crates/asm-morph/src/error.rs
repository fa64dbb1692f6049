//! Error types and source span tracking for diagnostics.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

/// Source location for diagnostics.
///
/// Tracks the line, column, byte offset, and length of a token or construct
/// in instruction text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number (byte offset within line).
    pub col: u32,
    /// 0-based byte offset from start of source.
    pub offset: usize,
    /// Byte length of the spanned region.
    pub len: usize,
}

impl Span {
    /// Create a new span.
    #[must_use]
    pub fn new(line: u32, col: u32, offset: usize, len: usize) -> Self {
        Self {
            line,
            col,
            offset,
            len,
        }
    }

    /// A dummy span for generated/internal constructs.
    #[must_use]
    pub fn dummy() -> Self {
        Self::default()
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// Every failure the crate reports.
///
/// ISA description errors are fatal to setup and carry the file and line.
/// Instruction text errors carry a [`Span`]. Change errors mean a change was
/// replayed against a program it was not built for.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MorphError {
    /// An ISA extension file could not be opened.
    IsaOpen {
        /// Path of the file.
        path: String,
        /// Operating-system detail.
        detail: String,
    },

    /// A line of an ISA extension description is malformed.
    IsaSyntax {
        /// Path (or label) of the description.
        path: String,
        /// 1-based line number.
        line: u32,
        /// What was wrong with the line.
        msg: String,
    },

    /// Syntax error in instruction text.
    Syntax {
        /// The syntax error message.
        msg: String,
        /// Source location of the syntax error.
        span: Span,
    },

    /// No footprint in the instruction set carries this name.
    UnknownMnemonic {
        /// The name that was not recognized.
        mnemonic: String,
        /// Source location of the name.
        span: Span,
    },

    /// Footprints with this name exist, but none admits the given operands.
    NoMatchingFootprint {
        /// The instruction name.
        mnemonic: String,
        /// Source location of the instruction.
        span: Span,
    },

    /// More than one footprint admits the given operands.
    AmbiguousFootprint {
        /// The instruction name.
        mnemonic: String,
        /// `(extension, index)` of every admitting footprint.
        candidates: Vec<(u16, u32)>,
        /// Source location of the instruction.
        span: Span,
    },

    /// A pinned `(extension, index)` does not exist.
    UnknownFootprint {
        /// Extension index.
        extension: u16,
        /// Footprint index inside the extension.
        index: u32,
        /// Source location of the pin.
        span: Span,
    },

    /// A pinned footprint carries a different name than the text.
    MnemonicMismatch {
        /// Name of the pinned footprint.
        expected: String,
        /// Name written in the text.
        found: String,
        /// Source location of the instruction.
        span: Span,
    },

    /// The operands do not satisfy the footprint's slot constraints.
    InvalidInstruction {
        /// Description of the violated constraint.
        detail: String,
        /// Source location of the instruction.
        span: Span,
    },

    /// A register-swap position pair is unusable.
    InvalidPosition {
        /// Why the pair was rejected.
        detail: String,
    },

    /// An instruction index is outside the program.
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// Program length.
        len: usize,
    },

    /// A change does not fit the program it is applied to or undone from.
    StaleChange {
        /// What did not match.
        detail: String,
    },

    /// A builtin footprint needed for a synthesized instruction is missing.
    MissingBuiltin {
        /// Name of the builtin.
        name: String,
    },

    /// A configurable resource limit was exceeded.
    ResourceLimitExceeded {
        /// Human-readable name of the resource (e.g. "instructions").
        resource: String,
        /// The configured limit that was exceeded.
        limit: usize,
    },
}

impl fmt::Display for MorphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MorphError::IsaOpen { path, detail } => {
                write!(f, "could not open ISA-Extension file {}: {}", path, detail)
            }
            MorphError::IsaSyntax { path, line, msg } => {
                write!(
                    f,
                    "error parsing ISA-Extension file {} on line {}: {}",
                    path, line, msg
                )
            }
            MorphError::Syntax { msg, span } => write!(f, "{}: {}", span, msg),
            MorphError::UnknownMnemonic { mnemonic, span } => {
                write!(f, "{}: unknown instruction '{}'", span, mnemonic)
            }
            MorphError::NoMatchingFootprint { mnemonic, span } => {
                write!(
                    f,
                    "{}: no footprint of '{}' admits these operands",
                    span, mnemonic
                )
            }
            MorphError::AmbiguousFootprint {
                mnemonic,
                candidates,
                span,
            } => {
                write!(f, "{}: '{}' is ambiguous between", span, mnemonic)?;
                for (i, (ext, idx)) in candidates.iter().enumerate() {
                    let sep = if i == 0 { " " } else { ", " };
                    write!(f, "{}({},{})", sep, ext, idx)?;
                }
                Ok(())
            }
            MorphError::UnknownFootprint {
                extension,
                index,
                span,
            } => {
                write!(f, "{}: no footprint ({},{})", span, extension, index)
            }
            MorphError::MnemonicMismatch {
                expected,
                found,
                span,
            } => {
                write!(
                    f,
                    "{}: pinned footprint is '{}', text says '{}'",
                    span, expected, found
                )
            }
            MorphError::InvalidInstruction { detail, span } => {
                write!(f, "{}: invalid instruction: {}", span, detail)
            }
            MorphError::InvalidPosition { detail } => {
                write!(f, "invalid swap positions: {}", detail)
            }
            MorphError::IndexOutOfRange { index, len } => {
                write!(
                    f,
                    "instruction index {} out of range (program has {})",
                    index, len
                )
            }
            MorphError::StaleChange { detail } => {
                write!(f, "change does not fit the program: {}", detail)
            }
            MorphError::MissingBuiltin { name } => {
                write!(f, "builtin footprint '{}' is missing", name)
            }
            MorphError::ResourceLimitExceeded { resource, limit } => {
                write!(
                    f,
                    "resource limit exceeded: {} (limit: {})",
                    resource, limit
                )
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for MorphError {}
