//! End-to-end runtime behaviour: the board converges on the hub and stops cleanly.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use fx_rate_board::infrastructure::config::{GeneratorSettings, PulseSettings, ShutdownSettings};
use fx_rate_board::{BoardConfig, BoardRuntime, ConfigError, Instrument, default_universe};

fn seeded(seed: u64) -> BoardConfig {
    BoardConfig {
        generator: GeneratorSettings {
            seed: Some(seed),
            ..GeneratorSettings::default()
        },
        pulse: PulseSettings {
            steps: 5,
            duration: Duration::from_millis(50),
        },
        shutdown: ShutdownSettings {
            grace: Duration::from_millis(500),
        },
        ..BoardConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn final_rows_match_hub_snapshot() {
    let runtime = BoardRuntime::start(&seeded(3));
    tokio::time::sleep(Duration::from_secs(5)).await;

    let hub = Arc::clone(runtime.hub());
    let list = runtime.shutdown().await.unwrap();

    let snapshot = hub.snapshot();
    assert!(list.len() <= default_universe().len());
    assert_eq!(list.len(), snapshot.len());
    for row in list.rows() {
        let rate = snapshot.get(row.instrument_key()).unwrap();
        assert_eq!(row.mid(), rate.mid, "{}", row.instrument_key());
        assert_eq!(row.bid(), rate.bid);
        assert_eq!(row.ask(), rate.ask);
    }
}

#[tokio::test(start_paused = true)]
async fn shutdown_finishes_within_grace_and_stops_publishing() {
    let config = seeded(5);
    let runtime = BoardRuntime::start(&config);
    tokio::time::sleep(Duration::from_millis(800)).await;

    let hub = Arc::clone(runtime.hub());
    let started = tokio::time::Instant::now();
    runtime.shutdown().await.unwrap();
    assert!(started.elapsed() <= config.shutdown.grace);

    let published = hub.publish_count();
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(hub.publish_count(), published);
    assert_eq!(hub.subscriber_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn small_universe_grows_one_row_per_pair() {
    let universe = vec![
        Instrument::new("EURUSD", 1.0850),
        Instrument::new("USDJPY", 149.50),
    ];
    let mut config = seeded(9);
    config.generator.update_fraction = 1.0;
    let runtime = BoardRuntime::start_with(&config, universe, |_| {});
    tokio::time::sleep(Duration::from_secs(2)).await;

    let list = runtime.shutdown().await.unwrap();
    let mut keys: Vec<_> = list.rows().iter().map(|r| r.instrument_key().to_string()).collect();
    keys.sort();
    assert_eq!(keys, vec!["EURUSD", "USDJPY"]);
    assert!(list.update_count() >= 14);
}

#[test]
fn invalid_environment_is_rejected_before_start() {
    let env: HashMap<&str, &str> = HashMap::from([("FX_BOARD_UPDATE_FRACTION", "2.0")]);
    let result = BoardConfig::from_lookup(|key| env.get(key).map(|v| (*v).to_string()));

    match result {
        Err(ConfigError::InvalidValue { key, .. }) => assert_eq!(key, "FX_BOARD_UPDATE_FRACTION"),
        other => panic!("expected invalid value, got {other:?}"),
    }
}
