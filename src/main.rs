//! route-pulse entry point.
//!
//! `route-pulse [serve]` starts the HTTP server together with the periodic
//! scheduler and badge refresher. `route-pulse run-once` evaluates every
//! tracked route a single time and exits with the run's status code.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use route_pulse::api;
use route_pulse::app_state::AppState;
use route_pulse::config::{LogFormat, ServiceConfig};
use route_pulse::persistence::{self, MemoryEventStore, PostgresEventStore, StoreBackend};
use route_pulse::prices::{MemoryPriceSource, PostgresPriceSource, PriceBackend};

/// Process run mode, taken from the first CLI argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Serve,
    RunOnce,
}

impl Mode {
    fn from_args() -> anyhow::Result<Self> {
        match std::env::args().nth(1).as_deref() {
            None | Some("serve") => Ok(Self::Serve),
            Some("run-once") => Ok(Self::RunOnce),
            Some(other) => anyhow::bail!("unknown mode '{other}', expected 'serve' or 'run-once'"),
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}

async fn build_backends(config: &ServiceConfig) -> anyhow::Result<(StoreBackend, PriceBackend)> {
    if !config.persistence_enabled {
        tracing::warn!("persistence disabled, events are kept in memory only");
        return Ok((
            MemoryEventStore::new().into(),
            MemoryPriceSource::new().into(),
        ));
    }

    let pool = persistence::postgres::connect(config)
        .await
        .context("connecting to database")?;
    persistence::postgres::run_migrations(&pool)
        .await
        .context("running migrations")?;

    Ok((
        PostgresEventStore::new(pool.clone()).into(),
        PostgresPriceSource::new(pool).into(),
    ))
}

async fn run(mode: Mode, config: ServiceConfig) -> anyhow::Result<ExitCode> {
    let (store, prices) = build_backends(&config).await?;
    let state = AppState::assemble(&config, store, prices);

    if mode == Mode::RunOnce {
        let report = state
            .scheduler
            .run_once()
            .await
            .context("scheduler run aborted")?;
        tracing::info!(
            evaluated = report.evaluated,
            emitted = report.emitted,
            failed = report.failures.len(),
            "run-once finished"
        );
        return Ok(ExitCode::from(u8::try_from(report.exit_code()).unwrap_or(1)));
    }

    let _refresher = Arc::clone(&state.badge_service).spawn_refresher(config.badge_refresh_interval());
    let _scheduler = Arc::clone(&state.scheduler).spawn();

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, api::build_app(state))
        .await
        .context("server error")?;

    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match ServiceConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(config.log_format);

    let mode = match Mode::from_args() {
        Ok(mode) => mode,
        Err(e) => {
            tracing::error!(error = %e, "invalid arguments");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(?mode, routes = config.tracked_routes.len(), "starting route-pulse");

    match run(mode, config).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = format!("{e:#}"), "fatal");
            ExitCode::FAILURE
        }
    }
}
