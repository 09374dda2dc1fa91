//! Device configuration parameters
//!
//! Tunables that are not part of the operator-visible KVS: identity, lock
//! timing and the inbound command rate limit.  Persisted as a postcard blob
//! by the NVS adapter's [`ConfigPort`](crate::app::ports::ConfigPort).

use serde::{Deserialize, Serialize};

use crate::adapters::device_id::{self, DeviceIdString};
use crate::app::ports::ConfigError;

// --- KVS compiled-in defaults ---
pub const DEFAULT_WIFI_SSID: &str = "fsu-eye";
pub const DEFAULT_WIFI_PASSWORD: &str = "";
pub const DEFAULT_IMAGE_REPORT_INTERVAL_SECS: &str = "2";
pub const DEFAULT_INFO_REPORT_INTERVAL_SECS: &str = "900";

/// Shortest report period a KVS interval may produce (seconds).
pub const MIN_REPORT_INTERVAL_SECS: u32 = 1;

/// Control loop poll period (milliseconds).
pub const CONTROL_LOOP_INTERVAL_MS: u64 = 50;

/// Core device configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Identity every inbound command must carry in its `id` field.
    pub device_id: DeviceIdString,
    /// Upper bound on waiting for the KVS store lock (milliseconds).
    pub kvs_lock_timeout_ms: u32,
    /// Sustained inbound command rate (tokens per second).
    pub command_rate_per_sec: u64,
    /// Inbound command burst capacity.
    pub command_burst: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            device_id: device_id::device_id(&device_id::read_mac()),
            kvs_lock_timeout_ms: 10,
            command_rate_per_sec: 5,
            command_burst: 5,
        }
    }
}

impl DeviceConfig {
    /// Range-check every field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device_id.is_empty() {
            return Err(ConfigError::ValidationFailed("device_id must not be empty"));
        }
        if !(1..=1000).contains(&self.kvs_lock_timeout_ms) {
            return Err(ConfigError::ValidationFailed(
                "kvs_lock_timeout_ms must be 1–1000",
            ));
        }
        if !(1..=100).contains(&self.command_rate_per_sec) {
            return Err(ConfigError::ValidationFailed(
                "command_rate_per_sec must be 1–100",
            ));
        }
        if !(1..=100).contains(&self.command_burst) {
            return Err(ConfigError::ValidationFailed("command_burst must be 1–100"));
        }
        Ok(())
    }

    /// Lock timeout as a [`Duration`](core::time::Duration).
    pub fn kvs_lock_timeout(&self) -> core::time::Duration {
        core::time::Duration::from_millis(u64::from(self.kvs_lock_timeout_ms))
    }
}

/// Report period for a stored interval, falling back to `default_secs`
/// when the value is missing and never shorter than
/// [`MIN_REPORT_INTERVAL_SECS`].
pub fn report_interval(secs: Option<u32>, default_secs: u32) -> core::time::Duration {
    let secs = secs.filter(|&s| s != 0).unwrap_or(default_secs);
    core::time::Duration::from_secs(u64::from(secs.max(MIN_REPORT_INTERVAL_SECS)))
}
