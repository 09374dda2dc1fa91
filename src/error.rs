//! Unified error type for the FSU-Eye firmware core.
//!
//! Every subsystem keeps its own small error enum next to its code; this
//! module funnels them into one `Error` so the control loop and `main`
//! handle failures uniformly.  All variants are `Copy`.

use core::fmt;

use crate::app::ports::{ConfigError, StorageError};
use crate::bus::{BusError, DeinitError, RegistrationError};
use crate::kvs::KvsError;
use crate::protocol::ParseError;

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    Bus(BusError),
    Registration(RegistrationError),
    Deinit(DeinitError),
    Kvs(KvsError),
    Parse(ParseError),
    Storage(StorageError),
    Config(ConfigError),
    /// Inbound command dropped by the rate limiter.
    RateLimited,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(e) => write!(f, "bus: {e}"),
            Self::Registration(e) => write!(f, "registration: {e}"),
            Self::Deinit(e) => write!(f, "deinit: {e}"),
            Self::Kvs(e) => write!(f, "kvs: {e}"),
            Self::Parse(e) => write!(f, "parse: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::RateLimited => write!(f, "rate limited"),
        }
    }
}

impl std::error::Error for Error {}

macro_rules! impl_from {
    ($($src:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$src> for Error {
                fn from(e: $src) -> Self {
                    Self::$variant(e)
                }
            }
        )*
    };
}

impl_from! {
    BusError => Bus,
    RegistrationError => Registration,
    DeinitError => Deinit,
    KvsError => Kvs,
    ParseError => Parse,
    StorageError => Storage,
    ConfigError => Config,
}

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
