//! Inbound command decoder.
//!
//! Accepts exactly two flat message shapes:
//!
//! ```text
//! no-arg  (7 tokens):  {"id":"<dev>","service_id":"<n>","command_id":"<n>"}
//! kvs-arg (11 tokens): {..., "kvs key":"<n>","kvs value":"<bytes>"}
//! ```
//!
//! Field names sit at fixed positions and are compared byte for byte.
//! A [`CommandDescriptor`] is only produced once every check has passed.

use core::fmt;

use log::debug;

use super::tokenizer::{self, Token, TokenKind, TokenStream};
use crate::bus::{ServiceArg, ServiceId};
use crate::kvs::{self, KVS_MAX_VALUE_SIZE, KvsEntry, KvsKey};

/// Token count of the no-argument shape (object + 3 pairs).
pub const NO_ARG_TOKENS: usize = 7;
/// Token count of the KVS-argument shape (object + 5 pairs).
pub const KVS_ARG_TOKENS: usize = 11;

const FIELD_NAMES: [&[u8]; 5] = [b"id", b"service_id", b"command_id", b"kvs key", b"kvs value"];

const ID: usize = 0;
const SERVICE: usize = 1;
const COMMAND: usize = 2;
const KVS_KEY: usize = 3;
const KVS_VALUE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    NoArg,
    KvsArg,
}

impl Shape {
    fn from_token_count(n: usize) -> Option<Self> {
        match n {
            NO_ARG_TOKENS => Some(Self::NoArg),
            KVS_ARG_TOKENS => Some(Self::KvsArg),
            _ => None,
        }
    }

    const fn field_count(self) -> usize {
        match self {
            Self::NoArg => 3,
            Self::KvsArg => 5,
        }
    }
}

/// A fully validated command, ready for the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDescriptor {
    pub service: ServiceId,
    pub command: u8,
    /// Present only for KVS-targeted commands.
    pub kvs: Option<KvsEntry>,
}

impl CommandDescriptor {
    /// Bus argument carrying this command's payload.
    pub fn arg(&self) -> ServiceArg {
        self.kvs.clone().map_or(ServiceArg::None, ServiceArg::Kvs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// Not well-formed, or over the token budget.
    Malformed,
    /// Token count is neither the no-arg nor the kvs-arg shape, or a field
    /// value is not a scalar.
    ShapeMismatch,
    /// Field name at this token position is not the expected one.
    UnknownField(usize),
    /// Message is addressed to another device.
    IdentityMismatch,
    /// Service or command id is zero, unparsable or out of range.
    UnknownService,
    /// `kvs key` does not name a key.
    UnknownKey,
    /// `kvs value` exceeds the KVS value limit.
    ValueTooLarge,
}

impl ParseError {
    pub const fn code(self) -> &'static str {
        match self {
            Self::Malformed => "malformed",
            Self::ShapeMismatch => "shape_mismatch",
            Self::UnknownField(_) => "unknown_field",
            Self::IdentityMismatch => "identity_mismatch",
            Self::UnknownService => "unknown_service",
            Self::UnknownKey => "unknown_key",
            Self::ValueTooLarge => "value_too_large",
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed message"),
            Self::ShapeMismatch => write!(f, "unexpected message shape"),
            Self::UnknownField(at) => write!(f, "unexpected field name at token {}", at),
            Self::IdentityMismatch => write!(f, "addressed to another device"),
            Self::UnknownService => write!(f, "unknown service or command"),
            Self::UnknownKey => write!(f, "unknown kvs key"),
            Self::ValueTooLarge => write!(f, "kvs value exceeds {} bytes", KVS_MAX_VALUE_SIZE),
        }
    }
}

/// Shape-validator states over the token stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Root,
    Name(usize),
    Value(usize),
}

/// Decode `input` addressed to `device_id`.
pub fn decode(input: &[u8], device_id: &str) -> Result<CommandDescriptor, ParseError> {
    let tokens = tokenizer::tokenize(input).map_err(|e| {
        debug!("Decoder: tokenize failed: {}", e);
        ParseError::Malformed
    })?;
    let shape = Shape::from_token_count(tokens.len()).ok_or(ParseError::ShapeMismatch)?;
    let fields = validate_shape(input, &tokens, shape)?;

    let id = &fields[ID];
    if id.kind != TokenKind::String || id.text(input) != device_id.as_bytes() {
        return Err(ParseError::IdentityMismatch);
    }
    if shape == Shape::KvsArg && fields[KVS_VALUE].kind != TokenKind::String {
        return Err(ParseError::ShapeMismatch);
    }

    let service = kvs::parse_unsigned(fields[SERVICE].text(input))
        .and_then(ServiceId::from_raw)
        .ok_or(ParseError::UnknownService)?;
    let command = kvs::parse_unsigned(fields[COMMAND].text(input))
        .filter(|&c| c != 0)
        .and_then(|c| u8::try_from(c).ok())
        .ok_or(ParseError::UnknownService)?;

    let kvs = if service == ServiceId::Kvs {
        if shape != Shape::KvsArg {
            return Err(ParseError::ShapeMismatch);
        }
        let key = kvs::parse_unsigned(fields[KVS_KEY].text(input))
            .and_then(|raw| KvsKey::from_index(raw).ok())
            .ok_or(ParseError::UnknownKey)?;
        let value = fields[KVS_VALUE].text(input);
        Some(KvsEntry::new(key, value).map_err(|_| ParseError::ValueTooLarge)?)
    } else {
        None
    };

    Ok(CommandDescriptor {
        service,
        command,
        kvs,
    })
}

/// Walk the stream with a small state machine, checking that every field
/// name is in place and every value is a scalar child of the root.
/// Returns the value tokens by field position.
fn validate_shape(
    input: &[u8],
    tokens: &TokenStream,
    shape: Shape,
) -> Result<[Token; 5], ParseError> {
    let empty = Token {
        kind: TokenKind::String,
        start: 0,
        end: 0,
        parent: None,
    };
    let mut fields = [empty; 5];
    let mut step = Step::Root;

    for (pos, token) in tokens.iter().enumerate() {
        step = match step {
            Step::Root if token.kind == TokenKind::Object => Step::Name(0),
            Step::Root => return Err(ParseError::ShapeMismatch),
            Step::Name(field) => {
                if !token.is_leaf() || token.parent != Some(0) {
                    return Err(ParseError::ShapeMismatch);
                }
                if token.kind != TokenKind::String || token.text(input) != FIELD_NAMES[field] {
                    return Err(ParseError::UnknownField(pos));
                }
                Step::Value(field)
            }
            Step::Value(field) => {
                if !token.is_leaf() || token.parent != Some(0) {
                    return Err(ParseError::ShapeMismatch);
                }
                fields[field] = *token;
                Step::Name(field + 1)
            }
        };
    }

    if step == Step::Name(shape.field_count()) {
        Ok(fields)
    } else {
        Err(ParseError::ShapeMismatch)
    }
}
