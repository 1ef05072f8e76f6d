//! Tests for config functionality.

use crate::config::{Config, SlotConfig};
use crate::error::BenchError;
use crate::locks::ResourceName;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_default_config() {
    let config = Config::default();

    assert_eq!(config.lock_dir, None);
    assert_eq!(config.signal_acquisition, "signal_acquisition");
    assert_eq!(config.poll_interval_ms, 50);
    assert_eq!(config.lock_stale_minutes, 120);
    assert_eq!(config.ramp_start_delay_ms, 1000);
    assert_eq!(config.ramp_poll_ms, 1000);
    assert_eq!(config.ramp_settle_ms, 3000);
    assert!(config.slots.is_empty());
}

#[test]
fn test_parse_minimal_yaml() {
    let config = Config::from_yaml("").unwrap();

    assert_eq!(config.signal_acquisition, "signal_acquisition");
    assert_eq!(config.poll_interval_ms, 50);
}

#[test]
fn test_parse_full_yaml() {
    let yaml = r#"
lock_dir: /var/lock/benchlock
signal_acquisition: scope
poll_interval_ms: 20
lock_stale_minutes: 30
ramp_start_delay_ms: 0
ramp_poll_ms: 10
ramp_settle_ms: 0
slots:
  - slot: 1
    device_name: "DUT-A"
    supply_serial: "13398"
    supply_channel: 0
    digitizer_channel: 1
  - slot: 3
    device_name: "DUT-B"
    supply_channel: 2
"#;
    let config = Config::from_yaml(yaml).unwrap();

    assert_eq!(config.lock_dir, Some(PathBuf::from("/var/lock/benchlock")));
    assert_eq!(config.signal_acquisition, "scope");
    assert_eq!(config.poll_interval_ms, 20);
    assert_eq!(config.lock_stale_minutes, 30);
    assert_eq!(config.ramp_poll_ms, 10);
    assert_eq!(config.slots.len(), 2);
    assert_eq!(
        config.slots[0],
        SlotConfig {
            slot: 1,
            device_name: "DUT-A".to_string(),
            supply_serial: Some("13398".to_string()),
            supply_channel: 0,
            digitizer_channel: Some(1),
        }
    );
    assert_eq!(config.slots[1].supply_serial, None);
    assert_eq!(config.slots[1].digitizer_channel, None);
}

#[test]
fn test_unknown_fields_are_ignored() {
    let yaml = r#"
poll_interval_ms: 10
future_option: true
"#;
    let config = Config::from_yaml(yaml).unwrap();
    assert_eq!(config.poll_interval_ms, 10);
}

#[test]
fn test_invalid_yaml_is_config_error() {
    let result = Config::from_yaml("slots: [this is not: a slot");
    assert!(matches!(result, Err(BenchError::ConfigError(_))));
}

#[test]
fn test_zero_poll_interval_rejected() {
    let err = Config::from_yaml("poll_interval_ms: 0").unwrap_err();
    assert!(err.to_string().contains("poll_interval_ms"));
}

#[test]
fn test_zero_stale_minutes_rejected() {
    let err = Config::from_yaml("lock_stale_minutes: 0").unwrap_err();
    assert!(err.to_string().contains("lock_stale_minutes"));
}

#[test]
fn test_duplicate_slots_rejected() {
    let yaml = r#"
slots:
  - slot: 2
  - slot: 2
"#;
    let err = Config::from_yaml(yaml).unwrap_err();
    assert!(err.to_string().contains("slot 2 is defined more than once"));
}

#[test]
fn test_invalid_signal_acquisition_name_rejected() {
    let err = Config::from_yaml("signal_acquisition: \"../etc\"").unwrap_err();
    assert!(matches!(err, BenchError::ConfigError(_)));
    assert!(err.to_string().contains("not a valid resource name"));
}

#[test]
fn test_signal_acquisition_colliding_with_slot_rejected() {
    let yaml = r#"
signal_acquisition: slot_4
slots:
  - slot: 4
"#;
    let err = Config::from_yaml(yaml).unwrap_err();
    assert!(err.to_string().contains("collides"));
}

#[test]
fn test_resource_names_lists_slots_then_signal_lock() {
    let yaml = r#"
slots:
  - slot: 3
  - slot: 1
"#;
    let config = Config::from_yaml(yaml).unwrap();
    let names: Vec<String> = config
        .resource_names()
        .unwrap()
        .into_iter()
        .map(String::from)
        .collect();

    assert_eq!(names, vec!["slot_3", "slot_1", "signal_acquisition"]);
}

#[test]
fn test_slot_and_device_lookup() {
    let yaml = r#"
slots:
  - slot: 7
    device_name: "LGAD-7"
"#;
    let config = Config::from_yaml(yaml).unwrap();

    assert_eq!(config.slot(7).unwrap().device_name, "LGAD-7");
    assert!(config.slot(8).is_none());
    assert_eq!(config.device_for(&ResourceName::slot(7)), Some("LGAD-7"));
    assert_eq!(
        config.device_for(&ResourceName::new("signal_acquisition").unwrap()),
        None
    );
}

#[test]
fn test_yaml_roundtrip_preserves_slots() {
    let mut config = Config::default();
    config.slots.push(SlotConfig {
        slot: 5,
        device_name: "PIN".to_string(),
        supply_serial: None,
        supply_channel: 1,
        digitizer_channel: Some(2),
    });

    let parsed = Config::from_yaml(&config.to_yaml().unwrap()).unwrap();
    assert_eq!(parsed.slots, config.slots);
}

#[test]
fn test_load_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("benchlock.yaml");
    std::fs::write(&path, "poll_interval_ms: 5\n").unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.poll_interval_ms, 5);
}

#[test]
fn test_load_missing_file_is_config_error() {
    let temp_dir = TempDir::new().unwrap();
    let err = Config::load(temp_dir.path().join("missing.yaml")).unwrap_err();
    assert!(matches!(err, BenchError::ConfigError(_)));
    assert!(err.to_string().contains("failed to read config file"));
}
