//! Bounded JSON tokenizer.
//!
//! Splits a message into at most [`MAX_TOKENS`] tokens without allocating.
//! It validates structure (nesting, separators, string escapes) but does
//! not interpret values; strings are reported as byte ranges excluding the
//! quotes and primitives as raw ranges.
//!
//! A NUL byte ends the input, so NUL-terminated buffers can be passed as is.

use core::fmt;

/// Hard token budget for a single message.
pub const MAX_TOKENS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Object,
    Array,
    String,
    Primitive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte range in the input.  Strings exclude their quotes.
    pub start: usize,
    pub end: usize,
    /// Index of the enclosing container token, `None` for the root.
    pub parent: Option<usize>,
}

impl Token {
    pub fn text<'a>(&self, input: &'a [u8]) -> &'a [u8] {
        &input[self.start..self.end]
    }

    /// Strings and primitives.
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, TokenKind::String | TokenKind::Primitive)
    }
}

pub type TokenStream = heapless::Vec<Token, MAX_TOKENS>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenizeError {
    /// More than [`MAX_TOKENS`] tokens.
    TooManyTokens,
    /// Unexpected byte at this offset.
    Invalid(usize),
    /// Input ended inside a value or container (includes empty input).
    Incomplete,
}

impl fmt::Display for TokenizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManyTokens => write!(f, "more than {} tokens", MAX_TOKENS),
            Self::Invalid(at) => write!(f, "unexpected byte at offset {}", at),
            Self::Incomplete => write!(f, "truncated input"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    /// Any value.
    Value,
    /// Right after `[`.
    ValueOrClose,
    /// Object key after `,`.
    Key,
    /// Right after `{`.
    KeyOrClose,
    Colon,
    CommaOrClose,
    /// Top-level value complete; only whitespace may follow.
    Done,
}

struct Tokenizer<'a> {
    input: &'a [u8],
    tokens: TokenStream,
    /// Indices of open container tokens, innermost last.
    open: heapless::Vec<usize, MAX_TOKENS>,
    expect: Expect,
}

/// Tokenize `input`, stopping at the first NUL byte.
pub fn tokenize(input: &[u8]) -> Result<TokenStream, TokenizeError> {
    let end = input.iter().position(|&b| b == 0).unwrap_or(input.len());
    let mut t = Tokenizer {
        input: &input[..end],
        tokens: TokenStream::new(),
        open: heapless::Vec::new(),
        expect: Expect::Value,
    };
    t.run()?;
    Ok(t.tokens)
}

impl Tokenizer<'_> {
    fn run(&mut self) -> Result<(), TokenizeError> {
        let mut pos = 0;
        while pos < self.input.len() {
            let byte = self.input[pos];
            match (self.expect, byte) {
                (_, b' ' | b'\t' | b'\r' | b'\n') => pos += 1,
                (Expect::Value | Expect::ValueOrClose, b'{') => {
                    self.open_container(TokenKind::Object, pos)?;
                    self.expect = Expect::KeyOrClose;
                    pos += 1;
                }
                (Expect::Value | Expect::ValueOrClose, b'[') => {
                    self.open_container(TokenKind::Array, pos)?;
                    self.expect = Expect::ValueOrClose;
                    pos += 1;
                }
                (Expect::KeyOrClose | Expect::CommaOrClose, b'}') => {
                    self.close_container(TokenKind::Object, pos)?;
                    pos += 1;
                }
                (Expect::ValueOrClose | Expect::CommaOrClose, b']') => {
                    self.close_container(TokenKind::Array, pos)?;
                    pos += 1;
                }
                (Expect::Colon, b':') => {
                    self.expect = Expect::Value;
                    pos += 1;
                }
                (Expect::CommaOrClose, b',') => {
                    self.expect = match self.innermost_kind() {
                        Some(TokenKind::Object) => Expect::Key,
                        _ => Expect::Value,
                    };
                    pos += 1;
                }
                (Expect::Key | Expect::KeyOrClose, b'"') => {
                    pos = self.string(pos)?;
                    self.expect = Expect::Colon;
                }
                (Expect::Value | Expect::ValueOrClose, b'"') => {
                    pos = self.string(pos)?;
                    self.value_done();
                }
                (Expect::Value | Expect::ValueOrClose, b) if is_primitive_byte(b) => {
                    pos = self.primitive(pos)?;
                    self.value_done();
                }
                _ => return Err(TokenizeError::Invalid(pos)),
            }
        }

        if self.expect == Expect::Done {
            Ok(())
        } else {
            Err(TokenizeError::Incomplete)
        }
    }

    fn push(&mut self, kind: TokenKind, start: usize, end: usize) -> Result<usize, TokenizeError> {
        let token = Token {
            kind,
            start,
            end,
            parent: self.open.last().copied(),
        };
        self.tokens
            .push(token)
            .map_err(|_| TokenizeError::TooManyTokens)?;
        Ok(self.tokens.len() - 1)
    }

    fn open_container(&mut self, kind: TokenKind, pos: usize) -> Result<(), TokenizeError> {
        let idx = self.push(kind, pos, pos)?;
        self.open.push(idx).map_err(|_| TokenizeError::TooManyTokens)
    }

    fn close_container(&mut self, kind: TokenKind, pos: usize) -> Result<(), TokenizeError> {
        match self.open.last().copied() {
            Some(idx) if self.tokens[idx].kind == kind => {
                self.tokens[idx].end = pos + 1;
                self.open.pop();
                self.value_done();
                Ok(())
            }
            _ => Err(TokenizeError::Invalid(pos)),
        }
    }

    fn innermost_kind(&self) -> Option<TokenKind> {
        self.open.last().map(|&idx| self.tokens[idx].kind)
    }

    fn value_done(&mut self) {
        self.expect = if self.open.is_empty() {
            Expect::Done
        } else {
            Expect::CommaOrClose
        };
    }

    /// Scan a string starting at the opening quote; returns the position
    /// after the closing quote.
    fn string(&mut self, quote: usize) -> Result<usize, TokenizeError> {
        let mut pos = quote + 1;
        while pos < self.input.len() {
            match self.input[pos] {
                b'"' => {
                    self.push(TokenKind::String, quote + 1, pos)?;
                    return Ok(pos + 1);
                }
                b'\\' => pos = self.escape(pos)?,
                b if b < 0x20 => return Err(TokenizeError::Invalid(pos)),
                _ => pos += 1,
            }
        }
        Err(TokenizeError::Incomplete)
    }

    /// Validate the escape at `pos` (the backslash); returns the position
    /// after it.
    fn escape(&self, pos: usize) -> Result<usize, TokenizeError> {
        match self.input.get(pos + 1) {
            Some(b'"' | b'\\' | b'/' | b'b' | b'f' | b'n' | b'r' | b't') => Ok(pos + 2),
            Some(b'u') => {
                let hex = self
                    .input
                    .get(pos + 2..pos + 6)
                    .ok_or(TokenizeError::Incomplete)?;
                match hex.iter().position(|b| !b.is_ascii_hexdigit()) {
                    Some(bad) => Err(TokenizeError::Invalid(pos + 2 + bad)),
                    None => Ok(pos + 6),
                }
            }
            Some(_) => Err(TokenizeError::Invalid(pos + 1)),
            None => Err(TokenizeError::Incomplete),
        }
    }

    /// Scan a bare primitive (number, `true`, `false`, `null`); returns the
    /// position after it.
    fn primitive(&mut self, start: usize) -> Result<usize, TokenizeError> {
        let end = self.input[start..]
            .iter()
            .position(|&b| !is_primitive_byte(b))
            .map_or(self.input.len(), |n| start + n);
        self.push(TokenKind::Primitive, start, end)?;
        Ok(end)
    }
}

fn is_primitive_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'+' | b'.')
}
