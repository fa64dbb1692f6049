//! Lexer for instruction text.
//!
//! The lexer turns program text into a stream of [`Token`]s, each carrying
//! its [`Span`] so that load errors can point back at the offending line and
//! column.

use alloc::string::String;
use alloc::vec::Vec;
use core::str;

use crate::error::{MorphError, Span};

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'src> {
    /// Token classification.
    pub kind: TokenKind,
    /// Source text of the token.
    pub text: &'src str,
    /// Source location.
    pub span: Span,
}

/// The type of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// A mnemonic or register name.
    Ident,
    /// An unsigned decimal or `0x` hexadecimal literal.
    Number(u64),
    /// `*`, introducing a memory operand or separating scale and index.
    Star,
    /// `[`.
    OpenBracket,
    /// `]`.
    CloseBracket,
    /// `+`.
    Plus,
    /// `-`.
    Minus,
    /// `(`, opening a footprint pin.
    OpenParen,
    /// `)`.
    CloseParen,
    /// `,` inside a footprint pin.
    Comma,
    /// End of an instruction line.
    Newline,
    /// End of input.
    Eof,
}

/// Tokenize instruction text.
///
/// `#` starts a comment that runs to the end of the line.
///
/// # Errors
///
/// Returns [`MorphError::Syntax`] on an unexpected character or a number that
/// does not fit in 64 bits.
pub fn tokenize(source: &str) -> Result<Vec<Token<'_>>, MorphError> {
    let mut tokens = Vec::with_capacity(source.len() / 3 + 1);
    let bytes = source.as_bytes();
    let len = bytes.len();
    let mut pos = 0;
    let mut line: u32 = 1;
    let mut line_start = 0usize;

    while pos < len {
        let ch = bytes[pos];
        let col = (pos - line_start) as u32 + 1;

        if ch == b' ' || ch == b'\t' || ch == b'\r' {
            pos += 1;
            continue;
        }

        if ch == b'\n' {
            tokens.push(Token {
                kind: TokenKind::Newline,
                text: "\n",
                span: Span::new(line, col, pos, 1),
            });
            pos += 1;
            line += 1;
            line_start = pos;
            continue;
        }

        if ch == b'#' {
            while pos < len && bytes[pos] != b'\n' {
                pos += 1;
            }
            continue;
        }

        let punct = match ch {
            b'*' => Some(TokenKind::Star),
            b'[' => Some(TokenKind::OpenBracket),
            b']' => Some(TokenKind::CloseBracket),
            b'+' => Some(TokenKind::Plus),
            b'-' => Some(TokenKind::Minus),
            b'(' => Some(TokenKind::OpenParen),
            b')' => Some(TokenKind::CloseParen),
            b',' => Some(TokenKind::Comma),
            _ => None,
        };
        if let Some(kind) = punct {
            tokens.push(Token {
                kind,
                text: &source[pos..pos + 1],
                span: Span::new(line, col, pos, 1),
            });
            pos += 1;
            continue;
        }

        if ch.is_ascii_digit() {
            let start = pos;
            let value = parse_number_at(bytes, &mut pos, line, col)?;
            tokens.push(Token {
                kind: TokenKind::Number(value),
                text: &source[start..pos],
                span: Span::new(line, col, start, pos - start),
            });
            continue;
        }

        if ch.is_ascii_alphabetic() || ch == b'_' {
            let start = pos;
            while pos < len && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_') {
                pos += 1;
            }
            tokens.push(Token {
                kind: TokenKind::Ident,
                text: &source[start..pos],
                span: Span::new(line, col, start, pos - start),
            });
            continue;
        }

        let shown = source[pos..].chars().next().unwrap_or('?');
        return Err(MorphError::Syntax {
            msg: alloc::format!("unexpected character '{}'", shown),
            span: Span::new(line, col, pos, shown.len_utf8()),
        });
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        text: "",
        span: Span::new(line, (pos - line_start) as u32 + 1, pos, 0),
    });

    Ok(tokens)
}

/// Parse a number starting at `pos` in `bytes`. Advances `pos` past the number.
#[inline]
fn parse_number_at(
    bytes: &[u8],
    pos: &mut usize,
    span_line: u32,
    span_col: u32,
) -> Result<u64, MorphError> {
    let start = *pos;
    let len = bytes.len();

    if bytes[*pos] == b'0' && *pos + 1 < len && matches!(bytes[*pos + 1], b'x' | b'X') {
        *pos += 2;
        let num_start = *pos;
        while *pos < len && bytes[*pos].is_ascii_hexdigit() {
            *pos += 1;
        }
        if *pos == num_start {
            return Err(MorphError::Syntax {
                msg: String::from("expected hex digits after '0x'"),
                span: Span::new(span_line, span_col, start, *pos - start),
            });
        }
        let s = str::from_utf8(&bytes[num_start..*pos]).unwrap_or("0");
        return u64::from_str_radix(s, 16).map_err(|_| MorphError::Syntax {
            msg: alloc::format!("hex number '0x{}' is too large", s),
            span: Span::new(span_line, span_col, start, *pos - start),
        });
    }

    while *pos < len && bytes[*pos].is_ascii_digit() {
        *pos += 1;
    }
    let s = str::from_utf8(&bytes[start..*pos]).unwrap_or("0");
    s.parse::<u64>().map_err(|_| MorphError::Syntax {
        msg: alloc::format!("number '{}' is too large", s),
        span: Span::new(span_line, span_col, start, *pos - start),
    })
}
