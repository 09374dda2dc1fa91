//! Key-Value Service: typed, durable configuration entries.
//!
//! ```text
//!  KvsService (bus adapter) ──▶ KeyValueStore ──▶ StoragePort (NVS)
//!                                 │
//!                                 └── write-through cache
//! ```
//!
//! The set of keys is closed and known at build time.  Every key carries a
//! fixed [`ValueType`]; values are validated against it *before* anything is
//! written to flash.

pub mod service;
pub mod store;

pub use service::{KvsCommand, KvsService};
pub use store::KeyValueStore;

use core::fmt;

use crate::config;

/// NVS namespace that holds every KVS entry.
pub const KVS_NAMESPACE: &str = "KVS";

/// Largest value (in bytes) a single entry may hold.
pub const KVS_MAX_VALUE_SIZE: usize = 0x100;

/// Fixed-capacity value buffer.
pub type KvsValue = heapless::Vec<u8, KVS_MAX_VALUE_SIZE>;

// ───────────────────────────────────────────────────────────────
// Keys
// ───────────────────────────────────────────────────────────────

/// Configuration keys, indexed by their wire value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum KvsKey {
    WifiSsid = 0,
    WifiPassword = 1,
    ImageReportInterval = 2,
    InfoReportInterval = 3,
}

impl KvsKey {
    pub const COUNT: usize = 4;

    pub const ALL: [KvsKey; Self::COUNT] = [
        Self::WifiSsid,
        Self::WifiPassword,
        Self::ImageReportInterval,
        Self::InfoReportInterval,
    ];

    /// Position in the cache table (same as the wire index).
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Resolve a wire index into a key.
    pub fn from_index(raw: u32) -> Result<Self, KvsError> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.index() as u32 == raw)
            .ok_or(KvsError::UnknownKey)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::WifiSsid => "wifi_ssid",
            Self::WifiPassword => "wifi_password",
            Self::ImageReportInterval => "image_report_interval_seconds",
            Self::InfoReportInterval => "info_report_interval_seconds",
        }
    }

    pub const fn value_type(self) -> ValueType {
        match self {
            Self::WifiSsid | Self::WifiPassword => ValueType::Str,
            Self::ImageReportInterval | Self::InfoReportInterval => ValueType::UnsignedInt,
        }
    }

    /// Compiled-in value used on first boot or after corruption.
    pub const fn default_value(self) -> &'static [u8] {
        match self {
            Self::WifiSsid => config::DEFAULT_WIFI_SSID.as_bytes(),
            Self::WifiPassword => config::DEFAULT_WIFI_PASSWORD.as_bytes(),
            Self::ImageReportInterval => config::DEFAULT_IMAGE_REPORT_INTERVAL_SECS.as_bytes(),
            Self::InfoReportInterval => config::DEFAULT_INFO_REPORT_INTERVAL_SECS.as_bytes(),
        }
    }

    /// NVS key name, the decimal wire index.
    pub const fn nvs_key(self) -> &'static str {
        match self {
            Self::WifiSsid => "0",
            Self::WifiPassword => "1",
            Self::ImageReportInterval => "2",
            Self::InfoReportInterval => "3",
        }
    }
}

impl fmt::Display for KvsKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// Every default must fit a cache slot.
const _: () = {
    let mut i = 0;
    while i < KvsKey::COUNT {
        assert!(KvsKey::ALL[i].default_value().len() <= KVS_MAX_VALUE_SIZE);
        i += 1;
    }
};

// ───────────────────────────────────────────────────────────────
// Value types
// ───────────────────────────────────────────────────────────────

/// Declared type of a key's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// Arbitrary bytes.
    Str,
    /// Decimal digits only, fits in a `u32`.
    UnsignedInt,
}

impl ValueType {
    /// Whether `value` satisfies this type's grammar.
    pub fn accepts(self, value: &[u8]) -> bool {
        match self {
            Self::Str => true,
            Self::UnsignedInt => parse_unsigned(value).is_some(),
        }
    }
}

/// Strict unsigned decimal parse.
///
/// Rejects empty input, signs, whitespace, any non-digit byte and values
/// that overflow `u32`. Leading zeros are accepted.
pub fn parse_unsigned(text: &[u8]) -> Option<u32> {
    if text.is_empty() {
        return None;
    }
    text.iter().try_fold(0u32, |acc, &b| {
        if !b.is_ascii_digit() {
            return None;
        }
        acc.checked_mul(10)?.checked_add(u32::from(b - b'0'))
    })
}

// ───────────────────────────────────────────────────────────────
// Entry
// ───────────────────────────────────────────────────────────────

/// One key together with its current value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvsEntry {
    pub key: KvsKey,
    pub value: KvsValue,
}

impl KvsEntry {
    /// Build an entry, rejecting values over [`KVS_MAX_VALUE_SIZE`].
    ///
    /// No type check happens here; that is the store's job on `put`.
    pub fn new(key: KvsKey, value: &[u8]) -> Result<Self, KvsError> {
        let value = KvsValue::from_slice(value).map_err(|_| KvsError::ValueTooLarge)?;
        Ok(Self { key, value })
    }

    /// An entry with no value, used as the argument of a `Get`.
    pub fn empty(key: KvsKey) -> Self {
        Self {
            key,
            value: KvsValue::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.value
    }

    /// UTF-8 view of the value, if valid.
    pub fn as_str(&self) -> Option<&str> {
        core::str::from_utf8(&self.value).ok()
    }

    /// Numeric view, only for values matching the unsigned grammar.
    pub fn as_u32(&self) -> Option<u32> {
        parse_unsigned(&self.value)
    }
}

// ───────────────────────────────────────────────────────────────
// Errors
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KvsError {
    /// Raw index does not name a key.
    UnknownKey,
    /// Value does not satisfy the key's declared type.
    TypeMismatch,
    /// Value longer than [`KVS_MAX_VALUE_SIZE`].
    ValueTooLarge,
    /// The durable write (or erase) failed; the cache was left untouched.
    DurableIo,
    /// The store lock could not be taken within the configured timeout.
    Busy,
    /// Entry absent or unreadable on durable media.
    NotFound,
}

impl KvsError {
    /// Short machine-readable code for confirmations.
    pub const fn code(self) -> &'static str {
        match self {
            Self::UnknownKey => "unknown_key",
            Self::TypeMismatch => "type_mismatch",
            Self::ValueTooLarge => "value_too_large",
            Self::DurableIo => "durable_io",
            Self::Busy => "busy",
            Self::NotFound => "not_found",
        }
    }
}

impl fmt::Display for KvsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownKey => write!(f, "unknown key"),
            Self::TypeMismatch => write!(f, "value does not match key type"),
            Self::ValueTooLarge => write!(f, "value exceeds {} bytes", KVS_MAX_VALUE_SIZE),
            Self::DurableIo => write!(f, "durable storage I/O failed"),
            Self::Busy => write!(f, "store busy"),
            Self::NotFound => write!(f, "entry not found"),
        }
    }
}
