//! ISA extension description files.
//!
//! One opcode per line:
//!
//! ```text
//! NAME <read regs>00000000<read flags><jump><untracked> <written regs>00000000<written flags><jump><untracked> <operand>*
//! ```
//!
//! Register masks list `RAX`..`RBP` left to right, flag digits list `CF`,
//! `PF`, `AF`, `ZF`, `SF`, `DF`, `OF` left to right, and both jump digits
//! must agree. Whitespace between the fields is optional. An operand is
//! either `in|io|out` followed by shape tokens (`r`, `h`, `x`, `y`, `i1`,
//! `i2`, `i4`, `mN`) or `in*|io*|out*` followed by a pointer register and a
//! byte size. Blank lines and `#` comments are skipped.

use alloc::format;
use alloc::string::String;
use core::fmt;

use crate::error::MorphError;
use crate::footprint::{
    Access, Flags, InstructionFootprint, InstructionSet, InstructionSetExtension, JumpKind,
    OperandFootprint, ResourceLimits, Shapes,
};
use crate::ir::{FootprintId, Gpr};

struct LineCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> LineCursor<'a> {
    fn new(line: &'a str) -> Self {
        Self {
            bytes: line.as_bytes(),
            pos: 0,
        }
    }

    #[inline]
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_ws(&mut self) -> usize {
        let start = self.pos;
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r')) {
            self.pos += 1;
        }
        self.pos - start
    }

    fn require_ws(&mut self, what: &str) -> Result<(), String> {
        if self.skip_ws() == 0 {
            return Err(format!("expected whitespace before {}", what));
        }
        Ok(())
    }

    /// Read `n` binary digits, first digit first.
    fn bits(&mut self, n: usize, what: &str) -> Result<&'a [u8], String> {
        let end = self.pos + n;
        match self.bytes.get(self.pos..end) {
            Some(digits) if digits.iter().all(|b| matches!(b, b'0' | b'1')) => {
                self.pos = end;
                Ok(digits)
            }
            _ => Err(format!("expected {} binary digits for {}", n, what)),
        }
    }

    fn zeros(&mut self) -> Result<(), String> {
        let digits = self.bits(8, "reserved bits")?;
        if digits.iter().any(|&b| b != b'0') {
            return Err(String::from("reserved register bits must be zero"));
        }
        Ok(())
    }

    fn digit(&mut self) -> Option<u8> {
        let d = self.peek().filter(u8::is_ascii_digit)?;
        self.pos += 1;
        Some(d - b'0')
    }

    fn word(&mut self) -> &'a str {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_alphanumeric() || b == b'_') {
            self.pos += 1;
        }
        core::str::from_utf8(&self.bytes[start..self.pos]).unwrap_or("")
    }

    /// A `[1-9][0-9]*` number that fits in a byte.
    fn size(&mut self, what: &str) -> Result<u8, String> {
        let start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        let digits = &self.bytes[start..self.pos];
        if digits.first().map_or(true, |&d| d == b'0') {
            return Err(format!("expected a nonzero size for {}", what));
        }
        core::str::from_utf8(digits)
            .ok()
            .and_then(|s| s.parse::<u8>().ok())
            .ok_or_else(|| format!("size for {} exceeds 255", what))
    }

    fn at_comment_or_end(&self) -> bool {
        matches!(self.peek(), None | Some(b'#'))
    }
}

fn register_mask(digits: &[u8]) -> u8 {
    digits
        .iter()
        .enumerate()
        .filter(|&(_, &d)| d == b'1')
        .fold(0, |mask, (i, _)| mask | (1 << i))
}

fn flag_mask(digits: &[u8], untracked: &[u8]) -> Flags {
    let mut bits = digits
        .iter()
        .enumerate()
        .filter(|&(_, &d)| d == b'1')
        .fold(0u8, |mask, (i, _)| mask | (0x80 >> i));
    if untracked == b"1" {
        bits |= Flags::UNTRACKED.bits();
    }
    Flags(bits)
}

/// One side (read or written) of the fixed-effect declaration.
fn fixed_side(cur: &mut LineCursor<'_>, side: &str) -> Result<(u8, Flags, u8), String> {
    let regs = register_mask(cur.bits(8, &format!("{} registers", side))?);
    cur.skip_ws();
    cur.zeros()?;
    cur.skip_ws();
    let flags = cur.bits(7, &format!("{} flags", side))?;
    cur.skip_ws();
    let jump = cur
        .digit()
        .filter(|d| *d <= 7)
        .ok_or_else(|| format!("expected a jump digit after the {} flags", side))?;
    cur.skip_ws();
    let untracked = cur.bits(1, &format!("{} untracked state", side))?;
    Ok((regs, flag_mask(flags, untracked), jump))
}

fn operand_slot(cur: &mut LineCursor<'_>) -> Result<OperandFootprint, String> {
    let keyword = cur.word();
    let deref = cur.peek() == Some(b'*');
    if deref {
        cur.pos += 1;
    }
    let access = match keyword {
        "in" => Access::Read,
        "out" => Access::Write,
        "io" => Access::ReadWrite,
        other => return Err(format!("unknown operand role '{}'", other)),
    };
    if !cur.at_comment_or_end() {
        cur.require_ws("operand shapes")?;
    }
    if deref {
        let name = cur.word();
        let pointer =
            Gpr::from_name(name).ok_or_else(|| format!("unknown pointer register '{}'", name))?;
        if pointer.index() >= 8 {
            return Err(format!(
                "pointer register {} is not one of RAX..RBP",
                pointer
            ));
        }
        cur.require_ws("dereference size")?;
        let size = cur.size("dereference")?;
        return Ok(OperandFootprint::Deref {
            access,
            pointer,
            size,
        });
    }

    let mut shapes = Shapes::default();
    let mut immediate_bytes = 0u8;
    let mut memory_size = 0u8;
    loop {
        let save = cur.pos;
        cur.skip_ws();
        match cur.peek() {
            Some(b'r' | b'h') => {
                if shapes.is_simd() {
                    return Err(String::from("general and vector shapes mixed in one slot"));
                }
                if cur.peek() == Some(b'r') {
                    shapes.register = true;
                } else {
                    shapes.high_byte = true;
                }
                cur.pos += 1;
            }
            Some(b'x' | b'y') => {
                if shapes.register || shapes.high_byte {
                    return Err(String::from("general and vector shapes mixed in one slot"));
                }
                if cur.peek() == Some(b'x') {
                    shapes.low_simd = true;
                } else {
                    shapes.high_simd = true;
                }
                cur.pos += 1;
            }
            Some(b'i') if matches!(cur.bytes.get(cur.pos + 1), Some(b'1' | b'2' | b'4')) => {
                if immediate_bytes != 0 {
                    return Err(String::from("immediate width given twice"));
                }
                immediate_bytes = cur.bytes[cur.pos + 1] - b'0';
                cur.pos += 2;
            }
            Some(b'm') if matches!(cur.bytes.get(cur.pos + 1), Some(b'1'..=b'9')) => {
                if memory_size != 0 {
                    return Err(String::from("memory size given twice"));
                }
                cur.pos += 1;
                memory_size = cur.size("memory operand")?;
            }
            _ => {
                cur.pos = save;
                break;
            }
        }
    }
    if !shapes.any() && immediate_bytes == 0 && memory_size == 0 {
        return Err(format!("operand role '{}' has no shapes", keyword));
    }
    Ok(OperandFootprint::Explicit {
        access,
        shapes,
        immediate_bytes,
        memory_size,
    })
}

/// Parse one non-blank line into a name and footprint.
fn footprint_line(line: &str) -> Result<(&str, InstructionFootprint), String> {
    let mut cur = LineCursor::new(line);
    cur.skip_ws();
    if !matches!(cur.peek(), Some(b) if b.is_ascii_alphabetic() || b == b'_') {
        return Err(String::from("expected an instruction name"));
    }
    let name = cur.word();
    cur.require_ws("the fixed-effect masks")?;
    let (read_regs, read_flags, read_jump) = fixed_side(&mut cur, "read")?;
    cur.skip_ws();
    let (written_regs, written_flags, written_jump) = fixed_side(&mut cur, "written")?;
    if read_jump != written_jump {
        return Err(format!(
            "jump digits differ ({} and {})",
            read_jump, written_jump
        ));
    }
    let jump = JumpKind::from_digit(read_jump)
        .ok_or_else(|| format!("unknown jump kind {}", read_jump))?;

    let mut operands = [None; 4];
    for slot in &mut operands {
        let save = cur.pos;
        if cur.skip_ws() == 0 || cur.at_comment_or_end() {
            cur.pos = save;
            break;
        }
        *slot = Some(operand_slot(&mut cur)?);
    }
    cur.skip_ws();
    if !cur.at_comment_or_end() {
        return Err(String::from("unexpected text after the operand list"));
    }
    Ok((
        name,
        InstructionFootprint {
            name: 0,
            always_read_registers: read_regs,
            always_read_flags: read_flags,
            always_written_registers: written_regs,
            always_written_flags: written_flags,
            jump,
            operands,
        },
    ))
}

fn is_blank_or_comment(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.is_empty() || trimmed.starts_with('#')
}

fn parse_with_limits(
    source: &str,
    path: &str,
    limits: &ResourceLimits,
) -> Result<InstructionSetExtension, MorphError> {
    let mut ext = InstructionSetExtension::new();
    for (i, line) in source.lines().enumerate() {
        let line_no = (i + 1) as u32;
        let syntax = |msg: String| MorphError::IsaSyntax {
            path: String::from(path),
            line: line_no,
            msg,
        };
        if line.len() > limits.max_line_len {
            return Err(syntax(format!(
                "line exceeds {} bytes",
                limits.max_line_len
            )));
        }
        if is_blank_or_comment(line) {
            continue;
        }
        let (name, footprint) = footprint_line(line).map_err(syntax)?;
        ext.push(name, footprint);
    }
    log::debug!("parsed {} footprints from {}", ext.len(), path);
    Ok(ext)
}

/// Parse an ISA extension description.
///
/// `path` only labels errors.
///
/// # Errors
///
/// Returns [`MorphError::IsaSyntax`] with the 1-based line number of the
/// first malformed line.
///
/// # Examples
///
/// ```rust
/// use asm_morph::isa::parse_extension;
///
/// let ext = parse_extension(
///     "NOP 00000000 00000000 0000000 0 0 00000000 00000000 0000000 0 0\n",
///     "nop.isa",
/// )
/// .unwrap();
/// assert_eq!(ext.name(0), Some("NOP"));
/// ```
pub fn parse_extension(source: &str, path: &str) -> Result<InstructionSetExtension, MorphError> {
    parse_with_limits(source, path, &ResourceLimits::default())
}

/// Read and parse an ISA extension file.
///
/// # Errors
///
/// Returns [`MorphError::IsaOpen`] if the file cannot be read, otherwise as
/// [`parse_extension`].
#[cfg(feature = "std")]
pub fn load_extension(
    path: impl AsRef<std::path::Path>,
) -> Result<InstructionSetExtension, MorphError> {
    let path = path.as_ref();
    let label = path.display().to_string();
    let source = std::fs::read_to_string(path).map_err(|e| MorphError::IsaOpen {
        path: label.clone(),
        detail: e.to_string(),
    })?;
    parse_extension(&source, &label)
}

impl InstructionSet {
    /// Parse a description and append it as a new extension.
    ///
    /// # Errors
    ///
    /// As [`parse_extension`] and [`InstructionSet::push_extension`].
    pub fn parse_extension(&mut self, source: &str, path: &str) -> Result<u16, MorphError> {
        let ext = parse_with_limits(source, path, self.limits())?;
        self.push_extension(ext)
    }

    /// Read a description file and append it as a new extension.
    ///
    /// # Errors
    ///
    /// As [`load_extension`] and [`InstructionSet::push_extension`].
    #[cfg(feature = "std")]
    pub fn load_extension(&mut self, path: impl AsRef<std::path::Path>) -> Result<u16, MorphError> {
        let path = path.as_ref();
        let label = path.display().to_string();
        let source = std::fs::read_to_string(path).map_err(|e| MorphError::IsaOpen {
            path: label.clone(),
            detail: e.to_string(),
        })?;
        self.parse_extension(&source, &label)
    }

    /// Render the footprint `id` as a description line.
    pub fn print_footprint(&self, id: FootprintId) -> Option<String> {
        let footprint = self.footprint(id)?;
        let name = self.name(id)?;
        Some(format!("{}", FootprintLine { name, footprint }))
    }
}

/// Display adapter rendering a footprint in description-line format.
#[derive(Debug, Clone, Copy)]
pub struct FootprintLine<'a> {
    /// Opcode name.
    pub name: &'a str,
    /// The footprint.
    pub footprint: &'a InstructionFootprint,
}

fn write_side(f: &mut fmt::Formatter<'_>, regs: u8, flags: Flags, jump: JumpKind) -> fmt::Result {
    for i in 0..8 {
        f.write_str(if regs & (1 << i) != 0 { "1" } else { "0" })?;
    }
    f.write_str("00000000 ")?;
    for i in 0..7 {
        f.write_str(if flags.bits() & (0x80 >> i) != 0 { "1" } else { "0" })?;
    }
    write!(
        f,
        " {} {}",
        jump.digit(),
        if flags.contains(Flags::UNTRACKED) { 1 } else { 0 }
    )
}

impl fmt::Display for FootprintLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fp = self.footprint;
        write!(f, "{} ", self.name)?;
        write_side(f, fp.always_read_registers, fp.always_read_flags, fp.jump)?;
        f.write_str(" ")?;
        write_side(
            f,
            fp.always_written_registers,
            fp.always_written_flags,
            fp.jump,
        )?;
        for (_, slot) in fp.slots() {
            match *slot {
                OperandFootprint::Deref {
                    access,
                    pointer,
                    size,
                } => write!(f, " {}* {} {}", access.keyword(), pointer, size)?,
                OperandFootprint::Explicit {
                    access,
                    shapes,
                    immediate_bytes,
                    memory_size,
                } => {
                    f.write_str(" ")?;
                    f.write_str(access.keyword())?;
                    let tokens = [
                        (shapes.register, "r"),
                        (shapes.high_byte, "h"),
                        (shapes.low_simd, "x"),
                        (shapes.high_simd, "y"),
                    ];
                    for (_, token) in tokens.iter().filter(|(on, _)| *on) {
                        write!(f, " {}", token)?;
                    }
                    if immediate_bytes != 0 {
                        write!(f, " i{}", immediate_bytes)?;
                    }
                    if memory_size != 0 {
                        write!(f, " m{}", memory_size)?;
                    }
                }
            }
        }
        Ok(())
    }
}
