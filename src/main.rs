//! FSU-Eye Firmware: Main Entry Point
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │   NvsAdapter (Storage+Config)   LogEventSink   MQTT callback   │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │   CommandRouter ──▶ DispatchBus ──▶ KvsService ──▶ KVS store   │
//! │                          └───────▶ wifi / aws / camera         │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The transport task feeds raw control messages into
//! [`INBOUND_CHANNEL`]; this loop drains it, routes each message and
//! queues the confirmation on [`CONFIRM_CHANNEL`].
#![deny(unused_must_use)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use log::{info, warn};

use fsueye::adapters::log_sink::LogEventSink;
use fsueye::adapters::nvs::NvsAdapter;
use fsueye::app::channels::{CONFIRM_CHANNEL, Confirmation, INBOUND_CHANNEL};
use fsueye::app::ports::ConfigPort;
use fsueye::app::service::CommandRouter;
use fsueye::bus::{BusError, DispatchBus, ServiceArg, ServiceId};
use fsueye::config::{
    CONTROL_LOOP_INTERVAL_MS, DeviceConfig, MIN_REPORT_INTERVAL_SECS, report_interval,
};
use fsueye::kvs::{KeyValueStore, KvsKey, KvsService};
use fsueye::protocol::confirm::MAX_CONFIRMATION_SIZE;

/// Camera command that captures and uploads one image.
const CAMERA_CAPTURE: u8 = 1;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  FSU-Eye v{}                       ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Durable storage and device config ──────────────────
    let nvs = match NvsAdapter::new() {
        Ok(n) => n,
        Err(e) => {
            warn!("NVS init failed ({}), running with defaults and no persistence", e);
            NvsAdapter::default()
        }
    };
    let config = nvs.load().unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        DeviceConfig::default()
    });
    info!("Device id: {}", config.device_id);

    // ── 3. KVS (seeds defaults on first boot) ─────────────────
    let store = Arc::new(KeyValueStore::open(nvs, config.kvs_lock_timeout()));

    // ── 4. Service bus ────────────────────────────────────────
    let mut bus = DispatchBus::new();
    bus.init();
    bus.register(Box::new(KvsService::new(Arc::clone(&store))))
        .map_err(fsueye::Error::from)?;

    // ── 5. Control loop ───────────────────────────────────────
    let mut router = CommandRouter::new(&bus, &config);
    let mut sink = LogEventSink::new();
    let mut last_capture = Instant::now();

    info!("Entering control loop");
    loop {
        while let Ok(msg) = INBOUND_CHANNEL.try_receive() {
            let Ok(dispatched) = router.handle_message(&msg.payload, &mut sink) else {
                continue;
            };
            let mut buf = [0u8; MAX_CONFIRMATION_SIZE];
            if let Some(n) = router.confirmation(&dispatched, &mut buf) {
                let data = heapless::Vec::from_slice(&buf[..n]).unwrap_or_default();
                if CONFIRM_CHANNEL.try_send(Confirmation { data }).is_err() {
                    warn!("Confirmation queue full, dropping");
                }
            }
        }

        let interval = image_report_interval(&store);
        if last_capture.elapsed() >= interval {
            last_capture = Instant::now();
            match bus.send(ServiceId::Camera, CAMERA_CAPTURE, &mut ServiceArg::None) {
                Ok(()) | Err(BusError::NotActive(_)) => {}
                Err(e) => warn!("Image capture failed: {}", e),
            }
        }

        std::thread::sleep(Duration::from_millis(CONTROL_LOOP_INTERVAL_MS));
    }
}

/// Current image report period; falls back to the compiled-in default.
fn image_report_interval(store: &KeyValueStore<NvsAdapter>) -> Duration {
    let key = KvsKey::ImageReportInterval;
    let default = fsueye::kvs::parse_unsigned(key.default_value()).unwrap_or(MIN_REPORT_INTERVAL_SECS);
    report_interval(store.get(key).as_u32(), default)
}
