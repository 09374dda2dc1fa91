//! Mock adapters for integration tests.
//!
//! `MockNvs` shares its backing map through an `Arc`, so a test can keep a
//! handle and inspect (or corrupt) durable state while the store owns the
//! adapter.  Write failures can be switched on at any point.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use fsueye::adapters::device_id::DeviceIdString;
use fsueye::app::events::AppEvent;
use fsueye::app::ports::{EventSink, StorageError, StoragePort};
use fsueye::bus::{Service, ServiceArg, ServiceError, ServiceId};
use fsueye::config::DeviceConfig;

// ── MockNvs ───────────────────────────────────────────────────

#[derive(Default)]
struct NvsState {
    store: Mutex<HashMap<String, Vec<u8>>>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

#[derive(Clone, Default)]
pub struct MockNvs {
    state: Arc<NvsState>,
}

#[allow(dead_code)]
impl MockNvs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write (and erase) fail with `IoError`.
    pub fn fail_writes(&self, fail: bool) {
        self.state.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Successful writes so far.
    pub fn write_count(&self) -> usize {
        self.state.writes.load(Ordering::SeqCst)
    }

    /// Raw durable bytes for `namespace::key`.
    pub fn raw(&self, namespace: &str, key: &str) -> Option<Vec<u8>> {
        self.lock().get(&format!("{}::{}", namespace, key)).cloned()
    }

    /// Plant bytes directly, bypassing the failure switch.
    pub fn plant(&self, namespace: &str, key: &str, data: &[u8]) {
        self.lock().insert(format!("{}::{}", namespace, key), data.to_vec());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.state.store.lock().unwrap()
    }

    fn failing(&self) -> bool {
        self.state.fail_writes.load(Ordering::SeqCst)
    }
}

impl StoragePort for MockNvs {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        match self.raw(namespace, key) {
            Some(v) if v.len() > buf.len() => Err(StorageError::BufferTooSmall),
            Some(v) => {
                buf[..v.len()].copy_from_slice(&v);
                Ok(v.len())
            }
            None => Err(StorageError::NotFound),
        }
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        if self.failing() {
            return Err(StorageError::IoError);
        }
        self.plant(namespace, key, data);
        self.state.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn verify(&self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.raw(namespace, key).map(|_| ()).ok_or(StorageError::NotFound)
    }

    fn erase_namespace(&mut self, namespace: &str) -> Result<(), StorageError> {
        if self.failing() {
            return Err(StorageError::IoError);
        }
        let prefix = format!("{}::", namespace);
        self.lock().retain(|k, _| !k.starts_with(&prefix));
        Ok(())
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── ProbeService ──────────────────────────────────────────────

/// Stand-in for the external wifi / aws / camera services.
pub struct ProbeService {
    id: ServiceId,
    handled: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl ProbeService {
    pub fn new(id: ServiceId) -> (Box<Self>, Arc<AtomicUsize>) {
        let handled = Arc::new(AtomicUsize::new(0));
        let probe = Box::new(Self {
            id,
            handled: Arc::clone(&handled),
        });
        (probe, handled)
    }
}

impl Service for ProbeService {
    fn id(&self) -> ServiceId {
        self.id
    }
    fn init(&mut self) -> Result<(), ServiceError> {
        Ok(())
    }
    fn deinit(&mut self) -> Result<(), ServiceError> {
        Ok(())
    }
    fn handle(&self, _command: u8, arg: &mut ServiceArg) -> Result<(), ServiceError> {
        self.handled.fetch_add(1, Ordering::SeqCst);
        match arg {
            ServiceArg::None => Ok(()),
            ServiceArg::Kvs(_) => Err(ServiceError::BadArgument),
        }
    }
}

// ── Config helpers ────────────────────────────────────────────

/// Config addressed to `id` with a generous rate limit.
#[allow(dead_code)]
pub fn test_config(id: &str) -> DeviceConfig {
    let mut device_id = DeviceIdString::new();
    device_id.push_str(id).unwrap();
    DeviceConfig {
        device_id,
        kvs_lock_timeout_ms: 20,
        command_rate_per_sec: 100,
        command_burst: 100,
    }
}
