//! Outbound application events.
//!
//! The [`CommandRouter`](super::service::CommandRouter) emits these through
//! the [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them (serial log, MQTT confirmation, etc.).

use crate::bus::{BusError, ServiceId};
use crate::protocol::ParseError;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// A decoded command reached the bus; `outcome` is the handler result.
    CommandHandled {
        service: ServiceId,
        command: u8,
        outcome: Result<(), BusError>,
    },

    /// A message was dropped by the decoder.
    CommandRejected(ParseError),

    /// A message was dropped before decoding by the rate limiter.
    RateLimited,
}
