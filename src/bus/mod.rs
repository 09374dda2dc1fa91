//! Service dispatch bus.
//!
//! Subsystems register under a [`ServiceId`] drawn from a closed set and
//! receive commands through [`DispatchBus::send`].  A service is
//! addressable exactly while its bit is set in the bus's active mask.
//!
//! ```text
//!   CommandRouter ──send(id, cmd, &mut arg)──▶ DispatchBus ──▶ dyn Service
//! ```

pub mod dispatch;

pub use dispatch::DispatchBus;

use core::fmt;

use crate::kvs::{KvsEntry, KvsError};

/// Number of addressable services (ids `1..=SERVICE_COUNT`).
pub const SERVICE_COUNT: usize = 4;

/// Stable service identifiers, equal to their wire value.  Zero is
/// reserved and never addressable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ServiceId {
    Wifi = 1,
    Kvs = 2,
    Aws = 3,
    Camera = 4,
}

impl ServiceId {
    pub const ALL: [ServiceId; SERVICE_COUNT] = [Self::Wifi, Self::Kvs, Self::Aws, Self::Camera];

    /// Wire value.
    pub const fn raw(self) -> u8 {
        self as u8
    }

    /// Resolve a wire value; `0` and anything past the last id are rejected.
    pub fn from_raw(raw: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|id| u32::from(id.raw()) == raw)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Wifi => "wifi",
            Self::Kvs => "kvs",
            Self::Aws => "aws",
            Self::Camera => "camera",
        }
    }

    pub(crate) const fn slot(self) -> usize {
        self as usize - 1
    }

    pub(crate) const fn mask(self) -> u8 {
        1 << self.slot()
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.raw())
    }
}

/// Argument passed to (and filled in by) a service handler.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ServiceArg {
    #[default]
    None,
    Kvs(KvsEntry),
}

/// A subsystem that can be registered on the bus.
///
/// `init`/`deinit` run with the bus exclusively borrowed; `handle` may be
/// called from several threads at once.
pub trait Service: Send + Sync {
    fn id(&self) -> ServiceId;

    fn init(&mut self) -> Result<(), ServiceError>;

    fn deinit(&mut self) -> Result<(), ServiceError>;

    /// Execute `command`, reading from and writing results into `arg`.
    fn handle(&self, command: u8, arg: &mut ServiceArg) -> Result<(), ServiceError>;
}

// ───────────────────────────────────────────────────────────────
// Errors
// ───────────────────────────────────────────────────────────────

/// What a service handler (or lifecycle hook) reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceError {
    Kvs(KvsError),
    /// The service has no such command.
    UnsupportedCommand(u8),
    /// The argument variant does not fit the command.
    BadArgument,
    /// Service-specific failure.
    Failed(&'static str),
}

impl ServiceError {
    pub const fn code(self) -> &'static str {
        match self {
            Self::Kvs(e) => e.code(),
            Self::UnsupportedCommand(_) => "unsupported_command",
            Self::BadArgument => "bad_argument",
            Self::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kvs(e) => write!(f, "kvs: {e}"),
            Self::UnsupportedCommand(c) => write!(f, "unsupported command {c}"),
            Self::BadArgument => write!(f, "bad argument"),
            Self::Failed(msg) => write!(f, "{msg}"),
        }
    }
}

impl From<KvsError> for ServiceError {
    fn from(e: KvsError) -> Self {
        Self::Kvs(e)
    }
}

/// Errors from [`DispatchBus::send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// Target is not registered; no handler ran.
    NotActive(ServiceId),
    /// The handler ran and returned this error.
    Handler(ServiceError),
}

impl BusError {
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotActive(_) => "not_active",
            Self::Handler(e) => e.code(),
        }
    }
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotActive(id) => write!(f, "service {id} not active"),
            Self::Handler(e) => write!(f, "handler: {e}"),
        }
    }
}

/// Errors from [`DispatchBus::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationError {
    /// [`DispatchBus::init`] has not run.
    NotInitialized(ServiceId),
    /// The service's own `init` failed; it was not registered.
    InitFailed(ServiceId, ServiceError),
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInitialized(id) => write!(f, "bus not initialized, cannot register {id}"),
            Self::InitFailed(id, e) => write!(f, "{id} init failed: {e}"),
        }
    }
}

/// A service's `deinit` failed.  It is deregistered regardless.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeinitError {
    pub id: ServiceId,
    pub cause: ServiceError,
}

impl fmt::Display for DeinitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} deinit failed: {}", self.id, self.cause)
    }
}
