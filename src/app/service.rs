//! Command router, the single entry point for inbound control messages.
//!
//! ```text
//!   bytes ──▶ rate limit ──▶ decode ──▶ DispatchBus::send ──▶ AppEvent
//! ```
//!
//! The router owns no state beyond its rate limiter; the bus and the
//! services behind it are borrowed, so deregistration cannot race with an
//! in-flight command.

use core::time::Duration;

use burster::Limiter;
use log::{debug, warn};

use super::events::AppEvent;
use super::ports::EventSink;
use crate::adapters::device_id::DeviceIdString;
use crate::bus::{BusError, DispatchBus, ServiceArg, ServiceId};
use crate::config::DeviceConfig;
use crate::error::Error;
use crate::protocol::{self, confirm};

/// Result of a command that reached its service handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatched {
    pub service: ServiceId,
    pub command: u8,
    /// The argument after the handler ran (a `Get` fills it in).
    pub arg: ServiceArg,
    pub outcome: Result<(), BusError>,
}

pub struct CommandRouter<'a> {
    bus: &'a DispatchBus,
    device_id: DeviceIdString,
    limiter: burster::TokenBucket<fn() -> Duration>,
}

impl<'a> CommandRouter<'a> {
    pub fn new(bus: &'a DispatchBus, config: &DeviceConfig) -> Self {
        Self {
            bus,
            device_id: config.device_id.clone(),
            limiter: burster::TokenBucket::new_with_time_provider(
                config.command_rate_per_sec,
                config.command_burst,
                platform_now as fn() -> Duration,
            ),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Decode, rate-limit and dispatch one raw message.
    ///
    /// Only messages that decode for this device draw from the token bucket.
    /// `Err` means the message never reached a handler.  A handler failure
    /// is reported in [`Dispatched::outcome`].
    pub fn handle_message(
        &mut self,
        message: &[u8],
        sink: &mut impl EventSink,
    ) -> Result<Dispatched, Error> {
        let cmd = protocol::decode(message, &self.device_id).map_err(|e| {
            debug!("Router: rejected message: {}", e);
            sink.emit(&AppEvent::CommandRejected(e));
            Error::Parse(e)
        })?;

        if self.limiter.try_consume(1).is_err() {
            warn!("Router: rate limit exceeded, dropping {} command {}", cmd.service, cmd.command);
            sink.emit(&AppEvent::RateLimited);
            return Err(Error::RateLimited);
        }

        let mut arg = cmd.arg();
        let outcome = self.bus.send(cmd.service, cmd.command, &mut arg);
        sink.emit(&AppEvent::CommandHandled {
            service: cmd.service,
            command: cmd.command,
            outcome,
        });

        Ok(Dispatched {
            service: cmd.service,
            command: cmd.command,
            arg,
            outcome,
        })
    }

    /// Encode the confirmation for a dispatched command into `out`.
    pub fn confirmation(&self, dispatched: &Dispatched, out: &mut [u8]) -> Option<usize> {
        confirm::encode_confirmation(
            &self.device_id,
            dispatched.service,
            dispatched.command,
            &dispatched.outcome,
            out,
        )
    }
}

// ── Platform time for rate limiter ───────────────────────────

#[cfg(target_os = "espidf")]
fn platform_now() -> Duration {
    // SAFETY: esp_timer_get_time has no preconditions.
    let us = unsafe { esp_idf_svc::sys::esp_timer_get_time() };
    Duration::from_micros(us as u64)
}

#[cfg(not(target_os = "espidf"))]
fn platform_now() -> Duration {
    use std::time::Instant;
    static START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();
    START.get_or_init(Instant::now).elapsed()
}
