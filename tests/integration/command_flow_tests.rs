//! End-to-end: raw control message → router → bus → KVS → durable store.

use std::sync::Arc;

use fsueye::Error;
use fsueye::app::events::AppEvent;
use fsueye::app::service::CommandRouter;
use fsueye::config::DeviceConfig;
use fsueye::bus::{BusError, DispatchBus, ServiceArg, ServiceError, ServiceId};
use fsueye::kvs::{KVS_MAX_VALUE_SIZE, KVS_NAMESPACE, KeyValueStore, KvsError, KvsKey, KvsService};
use fsueye::protocol::ParseError;
use fsueye::protocol::confirm::MAX_CONFIRMATION_SIZE;

use crate::mock_hw::{MockNvs, ProbeService, RecordingSink, test_config};

fn kvs_put(id: &str, key: &str, value: &str) -> String {
    format!(
        r#"{{"id":"{id}","service_id":"2","command_id":"1","kvs key":"{key}","kvs value":"{value}"}}"#
    )
}

struct Rig {
    bus: DispatchBus,
    store: Arc<KeyValueStore<MockNvs>>,
    nvs: MockNvs,
}

fn rig() -> Rig {
    let nvs = MockNvs::new();
    let config = test_config("dev1");
    let store = Arc::new(KeyValueStore::open(nvs.clone(), config.kvs_lock_timeout()));
    let mut bus = DispatchBus::new();
    bus.init();
    bus.register(Box::new(KvsService::new(Arc::clone(&store)))).unwrap();
    Rig { bus, store, nvs }
}

#[test]
fn put_for_this_device_persists() {
    let rig = rig();
    let mut router = CommandRouter::new(&rig.bus, &test_config("dev1"));
    let mut sink = RecordingSink::new();

    let d = router
        .handle_message(kvs_put("dev1", "2", "30").as_bytes(), &mut sink)
        .unwrap();
    assert_eq!(d.outcome, Ok(()));

    assert_eq!(rig.store.get(KvsKey::ImageReportInterval).as_bytes(), b"30");
    assert_eq!(rig.nvs.raw(KVS_NAMESPACE, "2").as_deref(), Some(&b"30"[..]));
    assert_eq!(
        sink.events,
        [AppEvent::CommandHandled {
            service: ServiceId::Kvs,
            command: 1,
            outcome: Ok(()),
        }]
    );
}

#[test]
fn put_for_other_device_changes_nothing() {
    let rig = rig();
    let mut router = CommandRouter::new(&rig.bus, &test_config("dev1"));
    let mut sink = RecordingSink::new();
    let writes = rig.nvs.write_count();

    let err = router
        .handle_message(kvs_put("dev2", "2", "30").as_bytes(), &mut sink)
        .unwrap_err();
    assert_eq!(err, Error::Parse(ParseError::IdentityMismatch));

    assert_eq!(rig.store.get(KvsKey::ImageReportInterval).as_bytes(), b"2");
    assert_eq!(rig.nvs.write_count(), writes);
    assert_eq!(
        sink.events,
        [AppEvent::CommandRejected(ParseError::IdentityMismatch)]
    );
}

#[test]
fn foreign_messages_leave_rate_budget_intact() {
    let rig = rig();
    let config = DeviceConfig {
        command_rate_per_sec: 1,
        command_burst: 1,
        ..test_config("dev1")
    };
    let mut router = CommandRouter::new(&rig.bus, &config);
    let mut sink = RecordingSink::new();

    for _ in 0..5 {
        assert_eq!(
            router.handle_message(kvs_put("dev2", "2", "99").as_bytes(), &mut sink),
            Err(Error::Parse(ParseError::IdentityMismatch))
        );
    }
    let d = router
        .handle_message(kvs_put("dev1", "2", "30").as_bytes(), &mut sink)
        .unwrap();
    assert_eq!(d.outcome, Ok(()));
    assert_eq!(rig.store.get(KvsKey::ImageReportInterval).as_bytes(), b"30");
}

#[test]
fn bad_integer_reaches_handler_and_is_refused() {
    let rig = rig();
    let mut router = CommandRouter::new(&rig.bus, &test_config("dev1"));
    let mut sink = RecordingSink::new();

    for bad in ["12a", " 12", "-5", ""] {
        let d = router
            .handle_message(kvs_put("dev1", "3", bad).as_bytes(), &mut sink)
            .unwrap();
        assert_eq!(
            d.outcome,
            Err(BusError::Handler(ServiceError::Kvs(KvsError::TypeMismatch))),
            "{bad:?}"
        );
    }
    assert_eq!(rig.store.get(KvsKey::InfoReportInterval).as_bytes(), b"900");
}

#[test]
fn oversized_value_rejected_by_decoder() {
    let rig = rig();
    let mut router = CommandRouter::new(&rig.bus, &test_config("dev1"));
    let mut sink = RecordingSink::new();

    let value = "s".repeat(KVS_MAX_VALUE_SIZE + 1);
    let err = router
        .handle_message(kvs_put("dev1", "0", &value).as_bytes(), &mut sink)
        .unwrap_err();
    assert_eq!(err, Error::Parse(ParseError::ValueTooLarge));
    assert_eq!(rig.store.get(KvsKey::WifiSsid).as_bytes(), b"fsu-eye");
}

#[test]
fn truncated_kvs_message_is_shape_mismatch() {
    let rig = rig();
    let mut router = CommandRouter::new(&rig.bus, &test_config("dev1"));
    let mut sink = RecordingSink::new();

    let msg = br#"{"id":"dev1","service_id":"2","command_id":"1","kvs key":"2"}"#;
    assert_eq!(
        router.handle_message(msg, &mut sink),
        Err(Error::Parse(ParseError::ShapeMismatch))
    );
}

#[test]
fn durable_failure_is_confirmed_as_error() {
    let rig = rig();
    let mut router = CommandRouter::new(&rig.bus, &test_config("dev1"));
    let mut sink = RecordingSink::new();
    rig.nvs.fail_writes(true);

    let d = router
        .handle_message(kvs_put("dev1", "1", "secret").as_bytes(), &mut sink)
        .unwrap();
    assert_eq!(
        d.outcome,
        Err(BusError::Handler(ServiceError::Kvs(KvsError::DurableIo)))
    );

    let mut buf = [0u8; MAX_CONFIRMATION_SIZE];
    let n = router.confirmation(&d, &mut buf).unwrap();
    assert_eq!(
        &buf[..n],
        br#"{"id":"dev1","service_id":2,"command_id":1,"status":"durable_io"}"#
    );
    assert_eq!(rig.store.get(KvsKey::WifiPassword).as_bytes(), b"");
}

#[test]
fn external_service_gets_no_payload() {
    let mut rig = rig();
    let (probe, handled) = ProbeService::new(ServiceId::Aws);
    rig.bus.register(probe).unwrap();

    let mut router = CommandRouter::new(&rig.bus, &test_config("dev1"));
    let mut sink = RecordingSink::new();
    let msg = br#"{"id":"dev1","service_id":"3","command_id":"2","kvs key":"0","kvs value":"x"}"#;

    let d = router.handle_message(msg, &mut sink).unwrap();
    assert_eq!(d.outcome, Ok(()));
    assert_eq!(d.arg, ServiceArg::None);
    assert_eq!(handled.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[test]
fn unregistered_service_is_not_active() {
    let rig = rig();
    let mut router = CommandRouter::new(&rig.bus, &test_config("dev1"));
    let mut sink = RecordingSink::new();
    let msg = br#"{"id":"dev1","service_id":"4","command_id":"1"}"#;

    let d = router.handle_message(msg, &mut sink).unwrap();
    assert_eq!(d.outcome, Err(BusError::NotActive(ServiceId::Camera)));
}

#[test]
fn erase_command_restores_defaults() {
    let rig = rig();
    let mut router = CommandRouter::new(&rig.bus, &test_config("dev1"));
    let mut sink = RecordingSink::new();

    router
        .handle_message(kvs_put("dev1", "2", "45").as_bytes(), &mut sink)
        .unwrap();
    let erase = br#"{"id":"dev1","service_id":"2","command_id":"3","kvs key":"0","kvs value":""}"#;
    let d = router.handle_message(erase, &mut sink).unwrap();
    assert_eq!(d.outcome, Ok(()));
    assert_eq!(rig.store.get(KvsKey::ImageReportInterval).as_bytes(), b"2");
}
