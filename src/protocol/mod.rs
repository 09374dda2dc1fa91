//! Control-message protocol.
//!
//! - [`tokenizer`]: bounded, allocation-free JSON token stream
//! - [`decoder`]: shape/identity validation into a [`CommandDescriptor`]
//! - [`confirm`]: outbound status confirmation

pub mod confirm;
pub mod decoder;
pub mod tokenizer;

pub use decoder::{CommandDescriptor, ParseError, decode};
