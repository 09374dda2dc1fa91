//! Application core: message routing and the port boundary.
//!
//! The router turns raw control messages into bus calls.  All interaction
//! with flash, transport and logging happens through **port traits**
//! defined in [`ports`], keeping this layer testable without hardware.

pub mod channels;
pub mod events;
pub mod ports;
pub mod service;
