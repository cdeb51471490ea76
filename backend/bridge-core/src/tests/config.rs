// Unit tests for bridge configuration

use crate::CONFIG_FILE_NAME;
use crate::config::BridgeConfig;
use crate::error::config::ConfigError;

use std::time::Duration;

use tempfile::TempDir;

/// **VALUE**: Verifies a missing config file loads defaults matching the built-in
/// protocol constants.
///
/// **WHY THIS MATTERS**: Helper and application must agree on the queue geometry without
/// any file present. Diverging defaults would make every send fail.
#[test]
fn given_missing_file_when_loaded_then_defaults() {
    // GIVEN: An empty config directory
    let dir = TempDir::new().unwrap();

    // WHEN: Loading
    let config = BridgeConfig::load(dir.path()).unwrap();

    // THEN: Defaults
    assert_eq!(config, BridgeConfig::default());
    assert_eq!(config.queue.max_message_size, crate::MESSAGE_SIZE);
    assert_eq!(config.queue.capacity, crate::QUEUE_CAPACITY);
    assert_eq!(
        config.receiver.poll_interval(),
        Some(Duration::from_millis(250))
    );
}

/// **VALUE**: Verifies a partial document keeps unspecified fields at their defaults and
/// that `null` selects blocking receive.
#[test]
fn given_partial_file_when_loaded_then_missing_fields_defaulted() {
    // GIVEN: Only two fields set
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        r#"{"queue":{"capacity":4},"receiver":{"poll_interval_ms":null}}"#,
    )
    .unwrap();

    // WHEN: Loading
    let config = BridgeConfig::load(dir.path()).unwrap();

    // THEN: Set fields applied, rest defaulted
    assert_eq!(config.queue.capacity, 4);
    assert_eq!(config.queue.max_message_size, crate::MESSAGE_SIZE);
    assert_eq!(config.receiver.poll_interval(), None);
    assert_eq!(config.host.idle_timeout_secs, 10);
}

/// **VALUE**: Verifies save followed by load returns the same config and leaves no
/// temp file behind.
#[test]
fn given_custom_config_when_saved_then_load_returns_it() {
    // GIVEN: A customised config
    let dir = TempDir::new().unwrap();
    let mut config = BridgeConfig::default();
    config.queue.name_prefix = "custom_gui".to_string();
    config.host.idle_timeout_secs = 30;

    // WHEN: Saving into a nested, not-yet-existing directory and loading back
    let nested = dir.path().join("nested");
    config.save(&nested).unwrap();
    let loaded = BridgeConfig::load(&nested).unwrap();

    // THEN: Identical, temp file gone
    assert_eq!(loaded, config);
    assert!(!nested.join(format!("{CONFIG_FILE_NAME}.tmp")).exists());
}

/// **VALUE**: Verifies corrupt JSON is a parse error, and `load_or_default` recovers.
#[test]
fn given_corrupt_file_when_loaded_then_parse_error() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(CONFIG_FILE_NAME), "{ nope").unwrap();

    assert!(matches!(
        BridgeConfig::load(dir.path()),
        Err(ConfigError::Parse { .. })
    ));
    assert_eq!(
        BridgeConfig::load_or_default(dir.path()),
        BridgeConfig::default()
    );
}

/// **VALUE**: Verifies validation rejects values that would break the queue.
///
/// **BUG THIS CATCHES**: Would catch a zero-sized queue, a prefix with `/` (invalid in
/// POSIX queue names) or a priority the kernel refuses reaching the receiver.
#[test]
fn given_invalid_values_when_validated_then_validation_error() {
    let cases: Vec<Box<dyn Fn(&mut BridgeConfig)>> = vec![
        Box::new(|c| c.version = 0),
        Box::new(|c| c.queue.capacity = 0),
        Box::new(|c| c.queue.max_message_size = 0),
        Box::new(|c| c.queue.max_message_size = 1_000_000),
        Box::new(|c| c.queue.name_prefix = "bad/prefix".to_string()),
        Box::new(|c| c.queue.name_prefix = String::new()),
        Box::new(|c| c.queue.priority = crate::PRIORITY_LIMIT),
        Box::new(|c| c.receiver.poll_interval_ms = Some(0)),
        Box::new(|c| c.receiver.task_capacity = 0),
        Box::new(|c| c.host.idle_timeout_secs = 0),
    ];

    for (index, mutate) in cases.iter().enumerate() {
        let mut config = BridgeConfig::default();
        mutate(&mut config);
        assert!(
            matches!(config.validate(), Err(ConfigError::Invalid { .. })),
            "case {index} should fail validation"
        );
    }

    assert!(BridgeConfig::default().validate().is_ok());
}

/// **VALUE**: Verifies an invalid config is never written.
#[test]
fn given_invalid_config_when_saved_then_nothing_written() {
    let dir = TempDir::new().unwrap();
    let mut config = BridgeConfig::default();
    config.queue.capacity = 0;

    assert!(config.save(dir.path()).is_err());
    assert!(!dir.path().join(CONFIG_FILE_NAME).exists());
}
