//! Outbound command confirmation.
//!
//! After a command has been dispatched the node publishes one small JSON
//! object echoing the addressing fields plus a status code:
//!
//! ```text
//! {"id":"fsu-eye-efcafe","service_id":2,"command_id":1,"status":"ok"}
//! ```

use serde::Serialize;

use crate::bus::{BusError, ServiceId};

/// Upper bound on an encoded confirmation.
pub const MAX_CONFIRMATION_SIZE: usize = 128;

#[derive(Debug, Serialize)]
struct Confirmation<'a> {
    id: &'a str,
    service_id: u8,
    command_id: u8,
    status: &'a str,
}

/// Status string for a dispatch outcome.
pub fn status_code(outcome: &Result<(), BusError>) -> &'static str {
    match outcome {
        Ok(()) => "ok",
        Err(e) => e.code(),
    }
}

/// Encode a confirmation into `out`, returning the byte count, or `None`
/// if it does not fit.
pub fn encode_confirmation(
    device_id: &str,
    service: ServiceId,
    command: u8,
    outcome: &Result<(), BusError>,
    out: &mut [u8],
) -> Option<usize> {
    let msg = Confirmation {
        id: device_id,
        service_id: service.raw(),
        command_id: command,
        status: status_code(outcome),
    };
    let bytes = serde_json::to_vec(&msg).ok()?;
    let dst = out.get_mut(..bytes.len())?;
    dst.copy_from_slice(&bytes);
    Some(bytes.len())
}
