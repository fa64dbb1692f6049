//! Instruction text loading and printing.
//!
//! Each line holds one instruction:
//!
//! ```text
//! NAME OPERAND... [(extension,index)] [# comment]
//! ```
//!
//! Operands are register names (`RAX`, `AH`, `XMM3`/`YMM3`/`ZMM3`),
//! immediates (`0x1F`, `42`, `-8`), memory references
//! (`*BASE[SCALE*INDEX+OFFSET]`) and RIP-relative references
//! (`*RIP[OFFSET]`). Without the trailing pin, the unique footprint of that
//! name whose slots admit the operands is selected.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Write as _;

use crate::error::{MorphError, Span};
use crate::footprint::{check_instruction, InstructionSet};
use crate::ir::{
    FootprintId, Gpr, HighByte, Instruction, MemoryRef, Operand, Program, Scale, SimdReg,
};
use crate::lexer::{tokenize, Token, TokenKind};

/// One parsed line before footprint resolution.
struct ParsedLine<'a> {
    mnemonic: &'a str,
    span: Span,
    operands: Vec<Operand>,
    pin: Option<FootprintId>,
}

struct Parser<'a> {
    tokens: &'a [Token<'a>],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token<'a>]) -> Self {
        Self { tokens, pos: 0 }
    }

    #[inline]
    fn peek(&self) -> &Token<'a> {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    #[inline]
    fn peek_kind_at(&self, offset: usize) -> TokenKind {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        self.tokens[idx].kind
    }

    #[inline]
    fn advance(&mut self) -> &Token<'a> {
        let tok = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    #[inline]
    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len() || self.peek().kind == TokenKind::Eof
    }

    #[inline]
    fn at_line_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Newline | TokenKind::Eof)
    }

    fn skip_newlines(&mut self) {
        while self.peek().kind == TokenKind::Newline {
            self.advance();
        }
    }

    fn error(&self, msg: impl Into<String>) -> MorphError {
        MorphError::Syntax {
            msg: msg.into(),
            span: self.peek().span,
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token<'a>, MorphError> {
        if self.peek().kind == kind {
            Ok(self.advance().clone())
        } else {
            Err(self.error(format!("expected {}, found '{}'", what, self.peek().text)))
        }
    }

    fn number(&mut self, what: &str) -> Result<(u64, Span), MorphError> {
        match self.peek().kind {
            TokenKind::Number(v) => {
                let span = self.advance().span;
                Ok((v, span))
            }
            _ => Err(self.error(format!("expected {}", what))),
        }
    }

    /// Parse one instruction line, leaving the cursor on its terminator.
    fn line(&mut self) -> Result<ParsedLine<'a>, MorphError> {
        let head = self.expect(TokenKind::Ident, "an instruction name")?;
        let mut operands = Vec::new();
        let mut pin = None;
        while !self.at_line_end() {
            if self.peek().kind == TokenKind::OpenParen {
                pin = Some(self.pin()?);
                if !self.at_line_end() {
                    return Err(self.error("unexpected text after the footprint pin"));
                }
                break;
            }
            if operands.len() == 4 {
                return Err(self.error("an instruction takes at most four operands"));
            }
            operands.push(self.operand()?);
        }
        Ok(ParsedLine {
            mnemonic: head.text,
            span: head.span,
            operands,
            pin,
        })
    }

    fn pin(&mut self) -> Result<FootprintId, MorphError> {
        self.expect(TokenKind::OpenParen, "'('")?;
        let (ext, ext_span) = self.number("an extension index")?;
        self.expect(TokenKind::Comma, "','")?;
        let (idx, idx_span) = self.number("a footprint index")?;
        self.expect(TokenKind::CloseParen, "')'")?;
        let extension = u16::try_from(ext).map_err(|_| MorphError::Syntax {
            msg: format!("extension index {} is too large", ext),
            span: ext_span,
        })?;
        let index = u32::try_from(idx).map_err(|_| MorphError::Syntax {
            msg: format!("footprint index {} is too large", idx),
            span: idx_span,
        })?;
        Ok(FootprintId::new(extension, index))
    }

    fn operand(&mut self) -> Result<Operand, MorphError> {
        match self.peek().kind {
            TokenKind::Ident => {
                let tok = self.advance().clone();
                register_operand(tok.text).ok_or_else(|| MorphError::Syntax {
                    msg: format!("unknown register '{}'", tok.text),
                    span: tok.span,
                })
            }
            TokenKind::Number(_) | TokenKind::Plus | TokenKind::Minus => {
                let value = self.signed(u64::from(u32::MAX), 1 << 31)?;
                Ok(Operand::Immediate(value as u32))
            }
            TokenKind::Star => self.memory(),
            _ => Err(self.error(format!("expected an operand, found '{}'", self.peek().text))),
        }
    }

    /// `[+|-] NUMBER` as a two's-complement `i64`.
    ///
    /// Positive values up to `max_positive` and negative values down to
    /// `-max_negative` are accepted.
    fn signed(&mut self, max_positive: u64, max_negative: u64) -> Result<i64, MorphError> {
        let negative = match self.peek().kind {
            TokenKind::Minus => {
                self.advance();
                true
            }
            TokenKind::Plus => {
                self.advance();
                false
            }
            _ => false,
        };
        let (value, span) = self.number("a number")?;
        let limit = if negative { max_negative } else { max_positive };
        if value > limit {
            return Err(MorphError::Syntax {
                msg: format!("value {}{} is out of range", if negative { "-" } else { "" }, value),
                span,
            });
        }
        let value = value as i64;
        Ok(if negative { -value } else { value })
    }

    fn memory(&mut self) -> Result<Operand, MorphError> {
        self.expect(TokenKind::Star, "'*'")?;
        let base = if self.peek().kind == TokenKind::Ident {
            let tok = self.advance().clone();
            if tok.text.eq_ignore_ascii_case("RIP") {
                Some(None)
            } else {
                let reg = Gpr::from_name(tok.text).ok_or_else(|| MorphError::Syntax {
                    msg: format!("'{}' cannot be a base register", tok.text),
                    span: tok.span,
                })?;
                Some(Some(reg))
            }
        } else {
            None
        };
        self.expect(TokenKind::OpenBracket, "'['")?;

        // A number followed by `*` or a register is a scale, otherwise the
        // displacement.
        let index_start = self.peek().span;
        let index = match (self.peek().kind, self.peek_kind_at(1)) {
            (TokenKind::Number(_), TokenKind::Star | TokenKind::Ident) => {
                let (factor, span) = self.number("a scale")?;
                let scale = Scale::from_factor(factor).ok_or_else(|| MorphError::Syntax {
                    msg: format!("scale {} is not 1, 2, 4 or 8", factor),
                    span,
                })?;
                if self.peek().kind == TokenKind::Star {
                    self.advance();
                }
                Some((self.index_register()?, scale))
            }
            (TokenKind::Ident, _) => Some((self.index_register()?, Scale::One)),
            _ => None,
        };

        let disp = if self.peek().kind == TokenKind::CloseBracket {
            0
        } else {
            self.signed(i32::MAX as u64, 1 << 31)? as i32
        };
        self.expect(TokenKind::CloseBracket, "']'")?;

        match base {
            Some(None) => {
                if index.is_some() {
                    return Err(MorphError::Syntax {
                        msg: String::from("RIP-relative references take no index"),
                        span: index_start,
                    });
                }
                Ok(Operand::RipRelative(disp))
            }
            base => Ok(Operand::Memory(MemoryRef {
                base: base.flatten(),
                index,
                disp,
            })),
        }
    }

    fn index_register(&mut self) -> Result<Gpr, MorphError> {
        let tok = self.expect(TokenKind::Ident, "an index register")?;
        Gpr::from_name(tok.text).ok_or_else(|| MorphError::Syntax {
            msg: format!("'{}' cannot be an index register", tok.text),
            span: tok.span,
        })
    }
}

/// A register operand named by `text`, ignoring ASCII case.
fn register_operand(text: &str) -> Option<Operand> {
    if let Some(r) = Gpr::from_name(text) {
        return Some(Operand::Register(r));
    }
    if let Some(h) = HighByte::from_name(text) {
        return Some(Operand::HighByte(h));
    }
    let prefix = text.get(..3)?;
    let digits = text.get(3..)?;
    let is_vector = ["XMM", "YMM", "ZMM"]
        .iter()
        .any(|p| p.eq_ignore_ascii_case(prefix));
    if !is_vector
        || digits.is_empty()
        || (digits.len() > 1 && digits.starts_with('0'))
        || !digits.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    SimdReg::new(digits.parse().ok()?).map(Operand::Simd)
}

fn with_span(err: MorphError, span: Span) -> MorphError {
    match err {
        MorphError::InvalidInstruction { detail, .. } => {
            MorphError::InvalidInstruction { detail, span }
        }
        MorphError::UnknownFootprint {
            extension, index, ..
        } => MorphError::UnknownFootprint {
            extension,
            index,
            span,
        },
        other => other,
    }
}

/// Resolve a parsed line against the instruction set.
fn resolve(isa: &InstructionSet, line: &ParsedLine<'_>) -> Result<Instruction, MorphError> {
    let id = match line.pin {
        Some(id) => {
            let name = isa.name(id).ok_or(MorphError::UnknownFootprint {
                extension: id.extension,
                index: id.index,
                span: line.span,
            })?;
            if name != line.mnemonic {
                return Err(MorphError::MnemonicMismatch {
                    expected: String::from(name),
                    found: String::from(line.mnemonic),
                    span: line.span,
                });
            }
            id
        }
        None => select_footprint(isa, line)?,
    };

    let mut inst = Instruction::new(id, [None; 4]);
    let Some(fp) = isa.footprint(id) else {
        return Err(MorphError::UnknownFootprint {
            extension: id.extension,
            index: id.index,
            span: line.span,
        });
    };
    let mut given = line.operands.iter().copied();
    for (i, slot) in fp.slots() {
        if slot.is_explicit() {
            inst.operands[i] = given.next();
        }
    }
    if given.next().is_some() {
        return Err(MorphError::InvalidInstruction {
            detail: format!(
                "'{}' takes {} operands, {} given",
                line.mnemonic,
                fp.explicit_count(),
                line.operands.len()
            ),
            span: line.span,
        });
    }
    check_instruction(isa, &inst).map_err(|e| with_span(e, line.span))?;
    Ok(inst)
}

fn select_footprint(isa: &InstructionSet, line: &ParsedLine<'_>) -> Result<FootprintId, MorphError> {
    let mut seen_name = false;
    let mut candidates = Vec::new();
    for (id, fp) in isa.footprints_named(line.mnemonic) {
        seen_name = true;
        let mut explicit = fp.slots().filter(|(_, s)| s.is_explicit()).map(|(_, s)| s);
        let fits = line.operands.iter().all(|op| explicit.next().is_some_and(|s| s.admits(op)))
            && explicit.next().is_none();
        log::trace!(
            "candidate {} {} for line {}: {}",
            line.mnemonic,
            id,
            line.span.line,
            if fits { "admits" } else { "rejects" }
        );
        if fits {
            candidates.push(id);
        }
    }
    match candidates.as_slice() {
        [id] => {
            log::debug!("line {}: selected {} {}", line.span.line, line.mnemonic, id);
            Ok(*id)
        }
        [] if !seen_name => Err(MorphError::UnknownMnemonic {
            mnemonic: String::from(line.mnemonic),
            span: line.span,
        }),
        [] => Err(MorphError::NoMatchingFootprint {
            mnemonic: String::from(line.mnemonic),
            span: line.span,
        }),
        many => Err(MorphError::AmbiguousFootprint {
            mnemonic: String::from(line.mnemonic),
            candidates: many.iter().map(|id| (id.extension, id.index)).collect(),
            span: line.span,
        }),
    }
}

/// Load a program from text.
///
/// Blank lines and `#` comments are skipped. The first bad line fails the
/// whole load.
///
/// # Errors
///
/// Returns the first line's [`MorphError`]: a syntax error, an unknown or
/// ambiguous mnemonic, an operand that does not fit, or
/// [`MorphError::ResourceLimitExceeded`].
///
/// # Examples
///
/// ```rust
/// use asm_morph::{load_program, print_program, InstructionSet};
///
/// let isa = InstructionSet::new();
/// let program = load_program(&isa, "MOV64 RAX RBX\nXCHG64 RCX RDX\n").unwrap();
/// assert_eq!(program.len(), 2);
/// assert_eq!(
///     print_program(&isa, &program).unwrap(),
///     "MOV64 RAX RBX (0,0)\nXCHG64 RCX RDX (0,1)\n"
/// );
/// ```
pub fn load_program(isa: &InstructionSet, source: &str) -> Result<Program, MorphError> {
    let limits = isa.limits();
    for (i, line) in source.lines().enumerate() {
        if line.len() > limits.max_line_len {
            log::debug!("line {} is {} bytes long", i + 1, line.len());
            return Err(MorphError::ResourceLimitExceeded {
                resource: String::from("line length"),
                limit: limits.max_line_len,
            });
        }
    }

    let tokens = tokenize(source)?;
    let mut parser = Parser::new(&tokens);
    let mut program = Program::new();
    loop {
        parser.skip_newlines();
        if parser.at_end() {
            break;
        }
        if program.len() >= limits.max_instructions {
            return Err(MorphError::ResourceLimitExceeded {
                resource: String::from("instructions"),
                limit: limits.max_instructions,
            });
        }
        let line = parser.line()?;
        program.push(resolve(isa, &line)?);
    }
    log::debug!("loaded {} instructions", program.len());
    Ok(program)
}

/// Load exactly one instruction from a line of text.
///
/// # Errors
///
/// As [`load_program`]; text holding no instruction or more than one is a
/// [`MorphError::Syntax`] error.
pub fn load_instruction(isa: &InstructionSet, source: &str) -> Result<Instruction, MorphError> {
    let program = load_program(isa, source)?;
    match program.instructions() {
        [inst] => Ok(*inst),
        other => Err(MorphError::Syntax {
            msg: format!("expected one instruction, found {}", other.len()),
            span: Span::new(1, 1, 0, source.len()),
        }),
    }
}

/// Render one instruction as `NAME OPERAND... (extension,index)`.
///
/// # Errors
///
/// Returns [`MorphError::UnknownFootprint`] if the instruction's footprint is
/// not in `isa`.
pub fn print_instruction(isa: &InstructionSet, inst: &Instruction) -> Result<String, MorphError> {
    let id = inst.footprint;
    let name = isa.name(id).ok_or(MorphError::UnknownFootprint {
        extension: id.extension,
        index: id.index,
        span: Span::dummy(),
    })?;
    let mut out = String::from(name);
    for op in inst.operands.iter().flatten() {
        let _ = write!(out, " {}", op);
    }
    let _ = write!(out, " {}", id);
    Ok(out)
}

/// Render a program, one instruction per line.
///
/// # Errors
///
/// As [`print_instruction`].
pub fn print_program(isa: &InstructionSet, program: &Program) -> Result<String, MorphError> {
    let mut out = String::new();
    for inst in program {
        out.push_str(&print_instruction(isa, inst)?);
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::footprint::{Builtin, ResourceLimits};

    const BASE: &str = "\
ADD32 00000000 00000000 0000000 0 0 00000000 00000000 1111101 0 0 in r i4 m4 io r m4
MOVH 00000000 00000000 0000000 0 0 00000000 00000000 0000000 0 0 in h out h
LEA 00000000 00000000 0000000 0 0 00000000 00000000 0000000 0 0 in m8 out r
PUSH 00000010 00000000 0000000 0 0 00000010 00000000 0000000 0 0 in r i4 out* RSP 8
MOVA 00000000 00000000 0000000 0 0 00000000 00000000 0000000 0 0 in r out r
MOVA 00000000 00000000 0000000 0 0 00000000 00000000 0000000 0 0 in r out r
";

    fn isa() -> InstructionSet {
        let mut isa = InstructionSet::new();
        isa.parse_extension(BASE, "base.isa").unwrap();
        isa
    }

    fn one(isa: &InstructionSet, text: &str) -> Instruction {
        load_instruction(isa, text).unwrap()
    }

    #[test]
    fn selects_unique_footprint() {
        let isa = isa();
        let inst = one(&isa, "ADD32 RAX RBX");
        assert_eq!(inst.footprint, FootprintId::new(1, 0));
        assert_eq!(inst.operands[0], Some(Operand::Register(Gpr::Rax)));
        assert_eq!(inst.operands[1], Some(Operand::Register(Gpr::Rbx)));
    }

    #[test]
    fn registers_are_case_insensitive() {
        let isa = isa();
        assert_eq!(one(&isa, "ADD32 rax rbx"), one(&isa, "ADD32 RAX RBX"));
    }

    #[test]
    fn immediates() {
        let isa = isa();
        let inst = one(&isa, "ADD32 0x10 RCX");
        assert_eq!(inst.operands[0], Some(Operand::Immediate(0x10)));
        let neg = one(&isa, "ADD32 -1 RCX");
        assert_eq!(neg.operands[0], Some(Operand::Immediate(0xFFFF_FFFF)));
        let neg8 = one(&isa, "ADD32 -8 RCX");
        assert_eq!(neg8.operands[0], Some(Operand::Immediate(0xFFFF_FFF8)));
        assert!(load_instruction(&isa, "ADD32 0x100000000 RCX").is_err());
    }

    #[test]
    fn memory_operands() {
        let isa = isa();
        let inst = one(&isa, "ADD32 *RBX[4*RCX+16] RDX");
        assert_eq!(
            inst.operands[0],
            Some(Operand::Memory(MemoryRef {
                base: Some(Gpr::Rbx),
                index: Some((Gpr::Rcx, Scale::Four)),
                disp: 16,
            }))
        );
        let plain = one(&isa, "ADD32 *RSP[-8] RDX");
        assert_eq!(
            plain.operands[0],
            Some(Operand::Memory(MemoryRef::based(Gpr::Rsp, -8)))
        );
        let no_base = one(&isa, "LEA *[8*R9] RAX");
        assert_eq!(
            no_base.operands[0],
            Some(Operand::Memory(MemoryRef {
                base: None,
                index: Some((Gpr::R9, Scale::Eight)),
                disp: 0,
            }))
        );
        let rip = one(&isa, "LEA *RIP[-12] RAX");
        assert_eq!(rip.operands[0], Some(Operand::RipRelative(-12)));
    }

    #[test]
    fn rip_rejects_index() {
        let isa = isa();
        assert!(matches!(
            load_instruction(&isa, "LEA *RIP[2*RAX+4] RAX"),
            Err(MorphError::Syntax { .. })
        ));
    }

    #[test]
    fn bad_scale() {
        let isa = isa();
        assert!(load_instruction(&isa, "LEA *RAX[3*RBX] RAX").is_err());
    }

    #[test]
    fn high_bytes_parse() {
        let isa = isa();
        let inst = one(&isa, "MOVH AH dh");
        assert_eq!(inst.operands[0], Some(Operand::HighByte(HighByte::Ah)));
        assert_eq!(inst.operands[1], Some(Operand::HighByte(HighByte::Dh)));
    }

    #[test]
    fn simd_names() {
        assert_eq!(
            register_operand("ymm31"),
            Some(Operand::Simd(SimdReg::new(31).unwrap()))
        );
        assert_eq!(register_operand("XMM32"), None);
        assert_eq!(register_operand("XMM01"), None);
        assert_eq!(register_operand("XMM"), None);
        assert_eq!(register_operand("ZMM0"), Some(Operand::Simd(SimdReg::new(0).unwrap())));
    }

    #[test]
    fn dereference_slots_stay_empty() {
        let isa = isa();
        let inst = one(&isa, "PUSH RBX");
        assert_eq!(inst.operands, [Some(Operand::Register(Gpr::Rbx)), None, None, None]);
    }

    #[test]
    fn unknown_mnemonic() {
        let isa = isa();
        assert!(matches!(
            load_instruction(&isa, "FROB RAX"),
            Err(MorphError::UnknownMnemonic { .. })
        ));
    }

    #[test]
    fn no_matching_footprint() {
        let isa = isa();
        assert!(matches!(
            load_instruction(&isa, "ADD32 XMM1 RAX"),
            Err(MorphError::NoMatchingFootprint { .. })
        ));
        assert!(matches!(
            load_instruction(&isa, "ADD32 RAX"),
            Err(MorphError::NoMatchingFootprint { .. })
        ));
    }

    #[test]
    fn ambiguous_without_pin() {
        let isa = isa();
        match load_instruction(&isa, "MOVA RAX RBX") {
            Err(MorphError::AmbiguousFootprint { candidates, .. }) => {
                assert_eq!(candidates, [(1, 4), (1, 5)]);
            }
            other => panic!("expected ambiguity, got {:?}", other),
        }
        let pinned = one(&isa, "MOVA RAX RBX (1,5)");
        assert_eq!(pinned.footprint, FootprintId::new(1, 5));
    }

    #[test]
    fn pin_must_match_name() {
        let isa = isa();
        assert!(matches!(
            load_instruction(&isa, "ADD32 RAX RBX (1,2)"),
            Err(MorphError::MnemonicMismatch { .. })
        ));
        assert!(matches!(
            load_instruction(&isa, "ADD32 RAX RBX (7,0)"),
            Err(MorphError::UnknownFootprint { .. })
        ));
    }

    #[test]
    fn pinned_operands_are_validated() {
        let isa = isa();
        assert!(matches!(
            load_instruction(&isa, "ADD32 RAX XMM0 (1,0)"),
            Err(MorphError::InvalidInstruction { .. })
        ));
        assert!(matches!(
            load_instruction(&isa, "ADD32 RAX RBX RCX (1,0)"),
            Err(MorphError::InvalidInstruction { .. })
        ));
    }

    #[test]
    fn text_after_pin_is_rejected() {
        let isa = isa();
        assert!(load_instruction(&isa, "ADD32 RAX RBX (1,0) RCX").is_err());
    }

    #[test]
    fn program_skips_blank_and_comment_lines() {
        let isa = isa();
        let src = "\n# prologue\nADD32 RAX RBX # add\n\n   \nMOVH AH BH\n# done\n";
        let program = load_program(&isa, src).unwrap();
        assert_eq!(program.len(), 2);
    }

    #[test]
    fn one_bad_line_fails_the_batch() {
        let isa = isa();
        let err = load_program(&isa, "ADD32 RAX RBX\nADD32 RAX\nADD32 RCX RDX\n").unwrap_err();
        match err {
            MorphError::NoMatchingFootprint { span, .. } => assert_eq!(span.line, 2),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn instruction_limit() {
        let isa = isa().with_limits(ResourceLimits {
            max_instructions: 1,
            ..ResourceLimits::default()
        });
        assert!(matches!(
            load_program(&isa, "ADD32 RAX RBX\nADD32 RAX RBX\n"),
            Err(MorphError::ResourceLimitExceeded { limit: 1, .. })
        ));
    }

    #[test]
    fn line_length_limit() {
        let isa = isa().with_limits(ResourceLimits {
            max_line_len: 8,
            ..ResourceLimits::default()
        });
        assert!(matches!(
            load_program(&isa, "ADD32 RAX RBX"),
            Err(MorphError::ResourceLimitExceeded { .. })
        ));
    }

    #[test]
    fn print_format() {
        let isa = isa();
        let inst = one(&isa, "ADD32 *RBX[4*RCX-16] RDX");
        assert_eq!(
            print_instruction(&isa, &inst).unwrap(),
            "ADD32 *RBX[4*RCX-16] RDX (1,0)"
        );
        let imm = one(&isa, "ADD32 255 RDX");
        assert_eq!(
            print_instruction(&isa, &imm).unwrap(),
            "ADD32 0x000000FF RDX (1,0)"
        );
        let high = one(&isa, "MOVH CH AH");
        assert_eq!(print_instruction(&isa, &high).unwrap(), "MOVH CH AH (1,1)");
    }

    #[test]
    fn printed_program_reloads() {
        let isa = isa();
        let src = "ADD32 *RSP[-8] RAX\nLEA *RIP[100] R15\nMOVH BH CH\nPUSH 0x7\nMOVDQU XMM3 *RSP[0]\nSUB64 64 RSP\n";
        let program = load_program(&isa, src).unwrap();
        let printed = print_program(&isa, &program).unwrap();
        assert_eq!(load_program(&isa, &printed).unwrap(), program);
    }

    #[test]
    fn builtins_are_loadable() {
        let isa = isa();
        let inst = one(&isa, "MOVDQU ZMM17 XMM2");
        assert_eq!(inst.footprint, Builtin::MovdquRegister.id());
        let load = one(&isa, "MOVDQU *RSP[0] XMM2");
        assert_eq!(load.footprint, Builtin::MovdquLoad.id());
    }

    #[test]
    fn too_many_operands() {
        let isa = isa();
        assert!(matches!(
            load_instruction(&isa, "ADD32 RAX RAX RAX RAX RAX"),
            Err(MorphError::Syntax { .. })
        ));
    }

    #[test]
    fn load_instruction_wants_exactly_one() {
        let isa = isa();
        assert!(load_instruction(&isa, "").is_err());
        assert!(load_instruction(&isa, "ADD32 RAX RBX\nADD32 RAX RBX").is_err());
    }

    #[test]
    fn print_unknown_footprint() {
        let isa = isa();
        let inst = Instruction::new(FootprintId::new(9, 9), [None; 4]);
        assert!(print_instruction(&isa, &inst).is_err());
    }
}
