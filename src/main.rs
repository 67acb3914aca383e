use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::fs::File;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

mod config;
mod dashboard;
mod db;
mod live_scores;
mod notifier;

use config::Config;
use dashboard::AppState;
use db::Database;
use live_scores::{CachedSchedule, CollegeBasketballData, NcaaScoreboard};
use notifier::dispatch::PushTransport;
use notifier::{CycleOutcome, Dispatcher, ExpoPush, LogOnlyPush, PollEngine};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    // Polls must never overlap: the dedup read/write is not atomic.
    let lock_file = File::create(&config.lock_path)
        .with_context(|| format!("Failed to create lock file at {}", config.lock_path))?;
    let mut lock = fd_lock::RwLock::new(lock_file);
    let _write_guard = match lock.try_write() {
        Ok(guard) => guard,
        Err(_) => {
            warn!("Another poller holds {}; exiting", config.lock_path);
            return Ok(());
        }
    };

    if config.dry_run {
        info!("🟡 DRY RUN mode – pushes are logged, not sent");
    }

    let db = Database::open(&config.database_path)?;
    info!("Database opened: {}", config.database_path);

    let scoreboard = Arc::new(NcaaScoreboard::new(&config.scoreboard_url)?);
    let schedule = CachedSchedule::new(
        Arc::new(CollegeBasketballData::new(
            &config.schedule_api_url,
            config.schedule_api_key.clone(),
        )?),
        db.clone(),
        &config.schedule_team,
        &config.schedule_conference,
        config.season_end()?,
    );
    let transport: Arc<dyn PushTransport> = if config.dry_run {
        Arc::new(LogOnlyPush)
    } else {
        Arc::new(ExpoPush::new(&config.push_api_url)?)
    };
    let dispatcher = Dispatcher::new(
        transport,
        Arc::new(db.clone()),
        &config.notification_title,
    );
    let engine = PollEngine::new(
        &config.tracked_team,
        scoreboard,
        schedule,
        db.clone(),
        dispatcher,
    );
    info!("Tracking '{}'", config.tracked_team);

    if config.once {
        log_outcome(engine.poll(Utc::now()).await);
        return Ok(());
    }

    let app = dashboard::router(AppState {
        db: db.clone(),
        tracked_team: config.tracked_team.clone(),
    });
    let addr: SocketAddr = config.dashboard_addr.parse()?;
    info!("Status API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // One task, one tick at a time: cycles run strictly in sequence.
    let poll_interval = Duration::from_secs(config.poll_interval_secs);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            log_outcome(engine.poll(Utc::now()).await);
        }
    });

    axum::serve(listener, app).await?;

    Ok(())
}

fn log_outcome(outcome: Result<CycleOutcome>) {
    match outcome {
        Ok(CycleOutcome::Sent { result, signature, report }) => {
            let failed: Vec<i64> = report
                .outcomes
                .iter()
                .filter(|o| o.is_failure())
                .map(|o| o.user_id)
                .collect();
            info!(
                "Notified '{}' at {} ({} push(es), failed users: {:?})",
                result.status,
                signature,
                report.pushes_sent(),
                failed
            );
        }
        Ok(other) => info!("Poll finished: {:?}", other),
        Err(e) => error!("Poll cycle failed: {:#}", e),
    }
}
