//! FX Rate Board Binary
//!
//! Runs the simulated feed, the market hub and the UI context, rendering the
//! board as plain text into the log.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin fx-rate-board
//! RUST_LOG=fx_rate_board=debug cargo run --bin fx-rate-board
//! ```
//!
//! # Environment Variables
//!
//! - `FX_BOARD_TICK_INTERVAL_MS`: generator interval (default: 250)
//! - `FX_BOARD_UPDATE_FRACTION`: share of pairs re-quoted per tick (default: 0.2)
//! - `FX_BOARD_SEED`: deterministic RNG seed (default: unset)
//! - `FX_BOARD_SOURCE`: rate source tag (default: `MARKET_SIMULATOR`)
//! - `FX_BOARD_PULSE_STEPS`: highlight decay steps (default: 50)
//! - `FX_BOARD_PULSE_DURATION_MS`: highlight decay duration (default: 500)
//! - `FX_BOARD_STATUS_INTERVAL_MS`: status refresh period, at most 1000 (default: 1000)
//! - `FX_BOARD_MONITOR_INTERVAL_SECS`: snapshot log period (default: 10)
//! - `FX_BOARD_SHUTDOWN_GRACE_MS`: producer stop grace period (default: 5000)
//! - `OTEL_ENABLED`: export traces over OTLP (default: false)
//! - `RUST_LOG`: log filter (default: `fx_rate_board=info`)

use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use fx_rate_board::infrastructure::metrics::get_metrics_handle;
use fx_rate_board::infrastructure::telemetry;
use fx_rate_board::infrastructure::ui::render;
use fx_rate_board::{BoardConfig, BoardRuntime, UiDispatcher, default_universe, init_metrics};
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let _telemetry_guard = telemetry::init();

    tracing::info!("Starting FX Rate Board");

    if let Err(e) = init_metrics() {
        tracing::warn!(error = %e, "Metrics recorder unavailable");
    }

    let config = BoardConfig::from_env().context("invalid FX_BOARD_* configuration")?;
    log_config(&config);

    let runtime = BoardRuntime::start_with(&config, default_universe(), render::attach_change_log);

    let render_cancel = CancellationToken::new();
    let renderer = tokio::spawn(render_loop(
        runtime.dispatcher().clone(),
        config.ui.status_interval,
        render_cancel.clone(),
    ));

    await_shutdown().await;

    render_cancel.cancel();
    if let Err(e) = renderer.await {
        tracing::warn!(component = "renderer", error = %e, "Renderer did not stop cleanly");
    }

    match runtime.shutdown().await {
        Ok(list) => {
            for line in render::render_board(&list, Utc::now()) {
                tracing::info!("{line}");
            }
        }
        Err(e) => tracing::warn!(error = %e, "UI context did not stop cleanly"),
    }

    if let Some(handle) = get_metrics_handle() {
        tracing::info!(metrics = %handle.render(), "Final metrics");
    }

    tracing::info!("FX Rate Board stopped");
    Ok(())
}

/// Render the board on every status interval until cancelled.
async fn render_loop(dispatcher: UiDispatcher, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let Ok(lines) = dispatcher
                    .query(|list| render::render_board(list, Utc::now()))
                    .await
                else {
                    break;
                };

                let mut lines = lines.into_iter();
                if let Some(status) = lines.next() {
                    tracing::info!("{status}");
                }
                for row in lines {
                    tracing::debug!("{row}");
                }
            }
        }
    }
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        for dir in cwd.ancestors().skip(1) {
            let env_path = dir.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
        }
    }
}

/// Log the parsed configuration.
fn log_config(config: &BoardConfig) {
    tracing::info!(
        tick_interval_ms = config.generator.tick_interval.as_millis(),
        update_fraction = config.generator.update_fraction,
        seed = ?config.generator.seed,
        source = %config.generator.source,
        pulse_steps = config.pulse.steps,
        pulse_duration_ms = config.pulse.duration.as_millis(),
        "Configuration loaded"
    );
    tracing::debug!(
        status_interval_ms = config.ui.status_interval.as_millis(),
        monitor_interval_secs = config.monitor.interval.as_secs(),
        shutdown_grace_ms = config.shutdown.grace.as_millis(),
        "Timing settings"
    );
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
