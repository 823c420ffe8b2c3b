use std::{env, fs, time::Duration};

use anyhow::{Context, Result};
use time::macros::format_description;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use trade_arena::{prelude::*, runtime};

/// Simulated seconds per wall-clock second.
const SPEED: f64 = 20.0;
const WALL_TIME: Duration = Duration::from_secs(6);

#[tokio::main]
async fn main() -> Result<()> {
    let _guard = init_tracing()?;

    let cfg = ArenaConfig::from(ArenaPreset::Classic).with_seed(seed_from_env());
    println!("Config fingerprint: {}", cfg.hash()?);

    let arena = Arena::new(cfg).context("Failed to build arena")?;
    let handle = runtime::spawn(arena, RuntimeOptions::default().with_speed(SPEED))?;
    let mut snapshots = handle.snapshots();

    // Print the leaderboard once per new candle
    let mut last_candle = None;
    let deadline = tokio::time::Instant::now() + WALL_TIME;
    while let Ok(Ok(())) = tokio::time::timeout_at(deadline, snapshots.changed()).await {
        let snapshot = snapshots.borrow_and_update().clone();
        let candle = snapshot.latest_candle.map(|c| c.timestamp());
        if candle != last_candle {
            last_candle = candle;
            print_leaderboard(&snapshot);
        }
    }

    let arena = handle.shutdown().await?;
    let snapshot = arena.snapshot();
    println!("\n--- Final Standings after {} decision ticks ---", arena.decision_ticks());
    print_leaderboard(&snapshot);
    print_recent_transactions(&snapshot, 5);

    Ok(())
}

fn seed_from_env() -> u64 {
    env::var("ARENA_SEED")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(42)
}

// ================================================================================================
// Rendering
// ================================================================================================

fn print_leaderboard(snapshot: &Snapshot) {
    let price = snapshot
        .latest_candle
        .map(|c| format!("{:.2}", c.close().0))
        .unwrap_or_else(|| "-".into());
    println!("\n[{}] BTC {price}", snapshot.timestamp.format("%H:%M:%S"));

    for (rank, agent) in snapshot.sorted_agents().into_iter().enumerate() {
        let arrow = match snapshot.ranking.change(agent.id()) {
            Some(RankChange::Up) => "^",
            Some(RankChange::Down) => "v",
            _ => " ",
        };
        println!(
            "{:>2}. {arrow} {:<22} {:>12.2} {:>+7.2}%  {:<5} {:>8.0}",
            rank + 1,
            agent.name(),
            agent.portfolio_value().0,
            agent.return_pct(snapshot.starting_capital),
            agent.last_action().as_str(),
            agent.last_amount().0,
        );
    }
}

fn print_recent_transactions(snapshot: &Snapshot, limit: usize) {
    println!("\n--- Recent Transactions ---");
    for (agent, tx) in snapshot.recent_transactions(limit) {
        println!(
            "{} {:<22} {:<5} {:>8.0} @ {:.2}",
            tx.timestamp.format("%H:%M:%S"),
            agent.name(),
            tx.action.as_str(),
            tx.amount.0,
            tx.price.0,
        );
    }
}

// ================================================================================================
// Tracing Configuration
// ================================================================================================

fn init_tracing() -> Result<Option<WorkerGuard>> {
    let app_name = "trade-arena";

    // Detect if running in container
    let in_container =
        env::var("CONTAINER").is_ok() || std::path::Path::new("/.dockerenv").exists();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if in_container {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_span_events(tracing_subscriber::fmt::format::FmtSpan::NONE)
            .with_current_span(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
            .init();

        info!("Logging to stdout (container mode)");
        Ok(None)
    } else {
        let log_dir = match dirs::state_dir().or_else(dirs::home_dir) {
            Some(mut p) => {
                p.push(app_name);
                p.push("logs");
                p
            }
            None => env::temp_dir().join(app_name),
        };
        fs::create_dir_all(&log_dir)?;

        let timestamp = time::OffsetDateTime::now_utc()
            .format(&format_description!(
                "[year][month][day]-[hour][minute][second]"
            ))
            .context("Failed to format timestamp")?;
        let file_name = format!("{app_name}-{timestamp}.log");
        let file_path = log_dir.join(&file_name);

        let file_appender = tracing_appender::rolling::never(&log_dir, &file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(non_blocking)
            .with_span_events(tracing_subscriber::fmt::format::FmtSpan::NONE)
            .with_current_span(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
            .init();

        info!(log_file = %file_path.display(), "Logging to file (local mode)");
        Ok(Some(guard))
    }
}
