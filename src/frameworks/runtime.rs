// Framework bootstrap and the in-process demo runtime: one shared store,
// several participant engines, a full match driven to completion.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{error, info};

use crate::domain::ports::SessionStore;
use crate::domain::session::PendingSpawn;
use crate::domain::tuning::Tuning;
use crate::frameworks::config;
use crate::interface_adapters::store::MemoryStore;
use crate::interface_adapters::utils::SystemClock;
use crate::domain::systems::{ArenaConfig, CircleArena};
use crate::use_cases::{Engine, SessionWriter, participant_task};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub async fn run_demo_with_config() -> std::io::Result<()> {
    init_runtime();

    let tuning = Tuning::default();
    let store = Arc::new(MemoryStore::new(
        config::SNAPSHOT_CHANNEL_CAPACITY,
        tuning.max_participants,
    ));

    run_demo(
        store,
        tuning,
        config::participant_count(),
        config::tick_interval(),
        config::demo_time_limit(),
        config::demo_seed(),
    )
    .await
}

/// Runs one full match over the given store with `participants` in-process
/// engines, each on its own task, until the match ends or the time limit
/// expires.
pub async fn run_demo(
    store: Arc<MemoryStore>,
    tuning: Tuning,
    participants: usize,
    tick_interval: Duration,
    time_limit: Duration,
    seed: u64,
) -> std::io::Result<()> {
    let clock = Arc::new(SystemClock);
    let session_id = "demo";
    let shutdown = Arc::new(Notify::new());

    let writers: Vec<SessionWriter> = (1..=participants)
        .map(|i| {
            SessionWriter::new(
                store.clone() as Arc<dyn SessionStore>,
                clock.clone(),
                session_id,
                format!("p{i}"),
            )
        })
        .collect();

    let host = &writers[0];
    host.create_session("Player 1")
        .await
        .map_err(|error| std::io::Error::other(format!("session create failed: {error}")))?;
    for (i, writer) in writers.iter().enumerate().skip(1) {
        writer
            .join(&format!("Player {}", i + 1))
            .await
            .map_err(|error| std::io::Error::other(format!("join failed: {error}")))?;
    }
    for writer in &writers {
        writer.mark_ready(true);
    }

    let mut handles = Vec::with_capacity(participants);
    for (i, writer) in writers.iter().enumerate() {
        let snapshots = store
            .subscribe(session_id)
            .await
            .map_err(|error| std::io::Error::other(format!("subscribe failed: {error}")))?;
        let engine = Engine::new(
            tuning,
            writer.clone(),
            Box::new(|| Box::new(CircleArena::new(ArenaConfig::default()))),
            seed.wrapping_add(i as u64),
            true,
        );
        handles.push(tokio::spawn(participant_task(
            engine,
            snapshots,
            tick_interval,
            shutdown.clone(),
        )));
    }

    host.start_match(PendingSpawn { size: 1, x: 0.0 })
        .await
        .map_err(|error| std::io::Error::other(format!("start failed: {error}")))?;
    info!(participants, "match started");

    let deadline = tokio::time::Instant::now() + time_limit;
    let mut engines = Vec::with_capacity(participants);
    let mut timed_out = false;
    for handle in handles {
        if timed_out {
            match handle.await {
                Ok(engine) => engines.push(engine),
                Err(error) => error!(%error, "participant task failed"),
            }
            continue;
        }
        match tokio::time::timeout_at(deadline, handle).await {
            Ok(Ok(engine)) => engines.push(engine),
            Ok(Err(error)) => error!(%error, "participant task failed"),
            Err(_) => {
                timed_out = true;
                info!("time limit reached, shutting down");
                shutdown.notify_waiters();
            }
        }
    }

    if let Some(doc) = engines.iter().find_map(|engine| engine.latest()) {
        info!(
            session_score = doc.session_score,
            status = ?doc.status,
            "demo finished"
        );
        for (id, entry) in &doc.participants {
            info!(participant_id = %id, name = %entry.name, score = entry.score, "final score");
        }
    }

    store
        .delete(session_id)
        .await
        .map_err(|error| std::io::Error::other(format!("delete failed: {error}")))?;
    Ok(())
}
