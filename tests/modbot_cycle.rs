use plctag_client::string::{DATA_CAPACITY, LENGTH_PREFIX_SIZE, STRING_ELEMENT_SIZE};
use plctag_client::{
    ConnectionConfig, ModbotRule, Operation, PollState, Poller, ShutdownToken, SimulatedEngine,
    Snapshot, StatusCode, TagError, TagRegistry, TagValue, UpdateRule,
};

fn config() -> ConnectionConfig {
    ConnectionConfig::new("10.206.1.39")
}

fn controller_string(engine: &SimulatedEngine, name: &str) -> String {
    let bytes = engine.controller_memory(name).unwrap();
    let len = u16::from_le_bytes([bytes[0], bytes[1]]) as usize;
    String::from_utf8(bytes[LENGTH_PREFIX_SIZE..LENGTH_PREFIX_SIZE + len].to_vec()).unwrap()
}

fn controller_u16(engine: &SimulatedEngine, name: &str) -> u16 {
    let bytes = engine.controller_memory(name).unwrap();
    u16::from_le_bytes([bytes[0], bytes[1]])
}

fn string_record(text: &str) -> Vec<u8> {
    let mut record = vec![0u8; STRING_ELEMENT_SIZE];
    record[..2].copy_from_slice(&(text.len() as u16).to_le_bytes());
    record[LENGTH_PREFIX_SIZE..LENGTH_PREFIX_SIZE + text.len()].copy_from_slice(text.as_bytes());
    record
}

#[test]
fn three_cycles_update_station_tags() {
    let mut engine = SimulatedEngine::new();
    let registry = TagRegistry::open_all(&mut engine, &config(), &ModbotRule::tag_specs()).unwrap();

    let report = Poller::new(registry, ModbotRule::new(), ShutdownToken::new())
        .with_max_cycles(3)
        .run()
        .unwrap();

    assert_eq!(report.cycles, 3);
    assert_eq!(report.destroyed, 6);
    assert_eq!(engine.live_handles(), 0);

    assert_eq!(controller_u16(&engine, "Mode"), 0);
    assert_eq!(controller_u16(&engine, "State"), 3);
    assert_eq!(
        controller_string(&engine, "FaultMessage"),
        "this is a fault message (2)"
    );
    assert_eq!(controller_string(&engine, "StateName"), "State2");

    // Read-only tags are never written.
    let writes = engine.writes();
    assert_eq!(writes.len(), 12);
    assert!(!writes.iter().any(|name| name == "SequenceName" || name == "SequenceRun"));
    assert_eq!(
        &writes[..4],
        ["FaultMessage", "Mode", "State", "StateName"]
    );
}

#[test]
fn string_tag_layout_on_the_wire() {
    let mut engine = SimulatedEngine::new();
    let registry = TagRegistry::open_all(&mut engine, &config(), &ModbotRule::tag_specs()).unwrap();

    Poller::new(registry, ModbotRule::new(), ShutdownToken::new())
        .with_max_cycles(1)
        .run()
        .unwrap();

    let bytes = engine.controller_memory("StateName").unwrap();
    assert_eq!(bytes.len(), STRING_ELEMENT_SIZE);
    assert_eq!(hex::encode(&bytes[..8]), "0600537461746530");
    assert!(bytes[8..LENGTH_PREFIX_SIZE + DATA_CAPACITY].iter().all(|&b| b == 0));
}

#[test]
fn snapshot_sees_controller_values() {
    let mut engine = SimulatedEngine::new();
    engine.preload("SequenceName", &string_record("Pick and place"));
    engine.preload("SequenceRun", &[1]);
    engine.preload("Mode", &2u16.to_le_bytes());

    let mut seen = Vec::new();
    let rule = |cycle: u64, snapshot: &Snapshot| {
        seen.push(snapshot.clone());
        ModbotRule::new().next(cycle, snapshot)
    };

    let registry = TagRegistry::open_all(&mut engine, &config(), &ModbotRule::tag_specs()).unwrap();
    Poller::new(registry, rule, ShutdownToken::new())
        .with_max_cycles(1)
        .run()
        .unwrap();

    let snapshot = &seen[0];
    assert_eq!(
        snapshot.get("SequenceName"),
        Some(&TagValue::from("Pick and place"))
    );
    assert_eq!(snapshot.get("SequenceRun"), Some(&TagValue::U8(1)));
    assert_eq!(snapshot.get("Mode"), Some(&TagValue::U16(2)));
    assert_eq!(snapshot.get("FaultMessage"), Some(&TagValue::from("")));
}

#[test]
fn read_failure_tears_down_without_writing() {
    let mut engine = SimulatedEngine::new();
    engine.fail_read("SequenceRun", StatusCode::ERR_TIMEOUT);
    let registry = TagRegistry::open_all(&mut engine, &config(), &ModbotRule::tag_specs()).unwrap();

    let err = Poller::new(registry, ModbotRule::new(), ShutdownToken::new())
        .run()
        .unwrap_err();

    assert!(matches!(
        err,
        TagError::Timeout {
            operation: Operation::Read,
            ..
        }
    ));
    assert_eq!(err.tag(), Some("SequenceRun"));
    assert_eq!(
        engine.reads(),
        ["FaultMessage", "Mode", "SequenceName", "SequenceRun"]
    );
    assert!(engine.writes().is_empty());
    assert_eq!(engine.destroyed().len(), 6);
}

#[test]
fn create_failure_releases_created_tags() {
    let mut engine = SimulatedEngine::new();
    engine.fail_create("SequenceName", StatusCode::ERR_BAD_GATEWAY);

    let err = TagRegistry::open_all(&mut engine, &config(), &ModbotRule::tag_specs()).unwrap_err();

    assert_eq!(err.code(), Some(StatusCode::ERR_BAD_GATEWAY));
    assert_eq!(engine.created(), ["FaultMessage", "Mode"]);
    assert_eq!(engine.destroyed(), ["FaultMessage", "Mode"]);
    assert_eq!(engine.live_handles(), 0);
}

#[test]
fn poller_reports_stopping_after_failure() {
    let mut engine = SimulatedEngine::new();
    engine.fail_write("StateName", StatusCode::ERR_WRITE);
    let registry = TagRegistry::open_all(&mut engine, &config(), &ModbotRule::tag_specs()).unwrap();
    let mut poller = Poller::new(registry, ModbotRule::new(), ShutdownToken::new());

    let err = poller.run_cycle().unwrap_err();
    assert_eq!(err.code(), Some(StatusCode::ERR_WRITE));
    assert_eq!(poller.state(), PollState::Stopping);
    assert_eq!(poller.cycles(), 0);

    drop(poller);
    assert_eq!(engine.live_handles(), 0);
}
