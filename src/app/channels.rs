//! Inter-task message channels.
//!
//! Uses `embassy-sync` bounded MPMC channels to bridge the MQTT callback
//! task with the synchronous control loop, without heap allocation.
//!
//! ```text
//! ┌──────────────┐  InboundMessage ┌──────────────┐
//! │ MQTT task    │───────────────▶│ Control Loop │
//! │ (callback)   │◀───────────────│ (sync)       │
//! └──────────────┘  Confirmation   └──────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::Vec;

use crate::protocol::confirm::MAX_CONFIRMATION_SIZE;

/// Largest inbound control message accepted from the transport.
pub const MAX_MESSAGE_SIZE: usize = 512;

/// Raw control message as received from the transport.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub payload: Vec<u8, MAX_MESSAGE_SIZE>,
}

/// Encoded confirmation waiting to be published.
#[derive(Debug, Clone)]
pub struct Confirmation {
    pub data: Vec<u8, MAX_CONFIRMATION_SIZE>,
}

const INBOUND_DEPTH: usize = 8;
const CONFIRM_DEPTH: usize = 8;

/// Inbound channel: transport → control loop.
pub static INBOUND_CHANNEL: Channel<CriticalSectionRawMutex, InboundMessage, INBOUND_DEPTH> =
    Channel::new();

/// Outbound channel: control loop → transport.
pub static CONFIRM_CHANNEL: Channel<CriticalSectionRawMutex, Confirmation, CONFIRM_DEPTH> =
    Channel::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    /// Payload exceeds [`MAX_MESSAGE_SIZE`].
    TooLarge,
    /// The control loop is not keeping up.
    Full,
}

/// Queue a raw message for the control loop.  Never blocks, so it is safe
/// to call from a transport callback.
pub fn submit(payload: &[u8]) -> Result<(), SubmitError> {
    let payload = Vec::from_slice(payload).map_err(|_| SubmitError::TooLarge)?;
    INBOUND_CHANNEL
        .try_send(InboundMessage { payload })
        .map_err(|_| SubmitError::Full)
}
