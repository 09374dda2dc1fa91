//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing application events to the ESP-IDF
//! logger (UART / USB-CDC in production).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::protocol::confirm::status_code;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink {
    handled: u32,
    rejected: u32,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands that reached a handler since boot.
    pub fn handled(&self) -> u32 {
        self.handled
    }

    /// Messages dropped by the decoder or rate limiter since boot.
    pub fn rejected(&self) -> u32 {
        self.rejected
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::CommandHandled {
                service,
                command,
                outcome,
            } => {
                self.handled = self.handled.wrapping_add(1);
                info!("CMD | {} cmd={} status={}", service, command, status_code(outcome));
            }
            AppEvent::CommandRejected(e) => {
                self.rejected = self.rejected.wrapping_add(1);
                warn!("CMD | rejected: {}", e);
            }
            AppEvent::RateLimited => {
                self.rejected = self.rejected.wrapping_add(1);
                warn!("CMD | rate limited");
            }
        }
    }
}
