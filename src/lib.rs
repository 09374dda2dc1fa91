//! FSU-Eye firmware core library.
//!
//! Exposes the pure-logic modules (bus, KVS, protocol, router) for
//! integration testing. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod bus;
pub mod config;
pub mod error;
pub mod kvs;
pub mod protocol;

pub use error::{Error, Result};
