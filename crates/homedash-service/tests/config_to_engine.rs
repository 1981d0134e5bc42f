//! End-to-end: a TOML file drives an engine over the mock store.

use std::sync::Arc;

use homedash_core::{Engine, MockStore};
use homedash_service::{Config, LogRenderer};
use homedash_types::{Card, SlotStatus};

const CONFIG: &str = r#"
[refresh]
interval_secs = 60
slot_timeout_secs = 5
retries = 0

[theme]
alias = "hallLightSensor"

[display]
utc_offset_minutes = 0

[[slots]]
id = "kitchen"
title = "Kitchen"
alias = "kitchenTempSensor"
kind = "climate"

[[slots]]
id = "fern"
title = "Fern"
alias = "fernSensor"
kind = "level"
icon = "images/fern.png"
"#;

#[tokio::test]
async fn test_config_file_drives_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dashboard.toml");
    std::fs::write(&path, CONFIG).unwrap();

    let config = Config::load_validated(&path).unwrap();
    let engine_config = config.engine_config().unwrap();

    let store = Arc::new(MockStore::new());
    store
        .set_climate("kitchenTempSensor", "2024-03-01T10:00:00Z", 62.0, 23.5)
        .await;

    let renderer = Arc::new(LogRenderer::new());
    let mut engine = Engine::new(store, engine_config, renderer.clone());
    let snapshot = engine.refresh_mut().run_cycle().await;

    assert!(snapshot.partial);
    match snapshot.get("kitchen").unwrap().status.card() {
        Some(Card::Climate { humidity_alert, .. }) => assert!(*humidity_alert),
        other => panic!("unexpected card: {:?}", other),
    }
    assert_eq!(snapshot.get("fern").unwrap().status, SlotStatus::Absent);

    let cards = renderer.cards();
    assert_eq!(cards.len(), 2);
    assert_eq!(cards[0].timestamp_label, "Last updated: 10:00:00 01/03/2024");
    assert_eq!(cards[1].icon.as_deref(), Some("images/fern.png"));
}

#[test]
fn test_check_output_round_trips() {
    let config = Config::default();
    let rendered = config.to_toml().unwrap();
    let parsed: Config = toml::from_str(&rendered).unwrap();
    assert_eq!(parsed, config);
}
