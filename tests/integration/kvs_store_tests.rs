//! KVS store against a mock NVS backend: seeding, write-through ordering,
//! failure handling and concurrent access.

use std::sync::Arc;
use std::time::Duration;

use fsueye::kvs::store::EntryOrigin;
use fsueye::kvs::{KVS_MAX_VALUE_SIZE, KVS_NAMESPACE, KeyValueStore, KvsError, KvsKey};

use crate::mock_hw::MockNvs;

const TIMEOUT: Duration = Duration::from_millis(20);

fn open() -> (KeyValueStore<MockNvs>, MockNvs) {
    let nvs = MockNvs::new();
    (KeyValueStore::open(nvs.clone(), TIMEOUT), nvs)
}

#[test]
fn first_boot_writes_every_default() {
    let (store, nvs) = open();
    assert_eq!(nvs.write_count(), KvsKey::COUNT);
    assert_eq!(nvs.raw(KVS_NAMESPACE, "2").as_deref(), Some(&b"2"[..]));
    assert_eq!(nvs.raw(KVS_NAMESPACE, "3").as_deref(), Some(&b"900"[..]));
    assert_eq!(store.get(KvsKey::ImageReportInterval).as_bytes(), b"2");
    assert_eq!(store.get(KvsKey::InfoReportInterval).as_bytes(), b"900");
}

#[test]
fn second_boot_loads_without_writing() {
    let nvs = MockNvs::new();
    drop(KeyValueStore::open(nvs.clone(), TIMEOUT));
    let before = nvs.write_count();

    let store = KeyValueStore::open(nvs.clone(), TIMEOUT);
    assert_eq!(nvs.write_count(), before);
    for key in KvsKey::ALL {
        assert_eq!(store.origin(key), EntryOrigin::Loaded);
    }
}

#[test]
fn put_persists_then_caches() {
    let (store, nvs) = open();
    store.put(KvsKey::ImageReportInterval, b"30").unwrap();
    assert_eq!(nvs.raw(KVS_NAMESPACE, "2").as_deref(), Some(&b"30"[..]));
    assert_eq!(store.get(KvsKey::ImageReportInterval).as_bytes(), b"30");
}

#[test]
fn rejected_puts_touch_nothing() {
    let (store, nvs) = open();
    let writes = nvs.write_count();

    for bad in [&b"12a"[..], b" 12", b"-5", b""] {
        assert_eq!(
            store.put(KvsKey::ImageReportInterval, bad),
            Err(KvsError::TypeMismatch)
        );
    }
    let big = vec![b'z'; KVS_MAX_VALUE_SIZE + 1];
    assert_eq!(store.put(KvsKey::WifiSsid, &big), Err(KvsError::ValueTooLarge));

    assert_eq!(nvs.write_count(), writes);
    assert_eq!(store.get(KvsKey::ImageReportInterval).as_bytes(), b"2");
}

#[test]
fn durable_failure_keeps_old_value_everywhere() {
    let (store, nvs) = open();
    nvs.fail_writes(true);
    assert_eq!(
        store.put(KvsKey::InfoReportInterval, b"60"),
        Err(KvsError::DurableIo)
    );
    assert_eq!(store.get(KvsKey::InfoReportInterval).as_bytes(), b"900");
    assert_eq!(nvs.raw(KVS_NAMESPACE, "3").as_deref(), Some(&b"900"[..]));

    nvs.fail_writes(false);
    store.put(KvsKey::InfoReportInterval, b"60").unwrap();
    assert_eq!(store.get(KvsKey::InfoReportInterval).as_bytes(), b"60");
}

#[test]
fn seeding_failure_runs_from_ram() {
    let nvs = MockNvs::new();
    nvs.fail_writes(true);
    let store = KeyValueStore::open(nvs.clone(), TIMEOUT);

    assert_eq!(store.get(KvsKey::InfoReportInterval).as_bytes(), b"900");
    assert_eq!(store.origin(KvsKey::InfoReportInterval), EntryOrigin::RamOnly);
    assert_eq!(store.verify(KvsKey::InfoReportInterval), Ok(false));

    // Once flash recovers a put makes the entry durable.
    nvs.fail_writes(false);
    store.put(KvsKey::InfoReportInterval, b"120").unwrap();
    assert_eq!(store.verify(KvsKey::InfoReportInterval), Ok(true));
    assert_eq!(store.origin(KvsKey::InfoReportInterval), EntryOrigin::Loaded);
}

#[test]
fn invalid_stored_values_are_replaced() {
    let nvs = MockNvs::new();
    nvs.plant(KVS_NAMESPACE, "2", b"12a");
    nvs.plant(KVS_NAMESPACE, "3", &[b'9'; KVS_MAX_VALUE_SIZE + 4]);
    nvs.plant(KVS_NAMESPACE, "0", b"kept-ssid");

    let store = KeyValueStore::open(nvs.clone(), TIMEOUT);
    assert_eq!(store.get(KvsKey::ImageReportInterval).as_bytes(), b"2");
    assert_eq!(store.get(KvsKey::InfoReportInterval).as_bytes(), b"900");
    assert_eq!(store.get(KvsKey::WifiSsid).as_bytes(), b"kept-ssid");
    assert_eq!(nvs.raw(KVS_NAMESPACE, "2").as_deref(), Some(&b"2"[..]));
}

#[test]
fn erase_resets_namespace() {
    let (store, nvs) = open();
    store.put(KvsKey::WifiSsid, b"lab").unwrap();
    nvs.plant(KVS_NAMESPACE, "stale", b"junk");

    store.erase().unwrap();

    assert_eq!(nvs.raw(KVS_NAMESPACE, "stale"), None);
    assert_eq!(store.get(KvsKey::WifiSsid).as_bytes(), b"fsu-eye");
    assert_eq!(nvs.raw(KVS_NAMESPACE, "0").as_deref(), Some(&b"fsu-eye"[..]));
}

#[test]
fn concurrent_writers_leave_one_winner() {
    let (store, nvs) = open();
    let store = Arc::new(store);
    let values: [&[u8]; 4] = [b"10", b"20", b"30", b"40"];

    std::thread::scope(|s| {
        for v in values {
            let store = Arc::clone(&store);
            s.spawn(move || {
                for _ in 0..25 {
                    // Busy is acceptable under contention; nothing else is.
                    match store.put(KvsKey::ImageReportInterval, v) {
                        Ok(()) | Err(KvsError::Busy) => {}
                        Err(e) => panic!("unexpected error {e}"),
                    }
                }
            });
        }
    });

    let cached = store.get(KvsKey::ImageReportInterval);
    assert!(values.contains(&cached.as_bytes()));
    assert_eq!(
        nvs.raw(KVS_NAMESPACE, "2").as_deref(),
        Some(cached.as_bytes()),
        "cache and durable value must agree"
    );
}
