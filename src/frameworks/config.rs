use std::{env, time::Duration};

// Runtime constants (not gameplay tuning).

pub fn tick_interval() -> Duration {
    let millis = env::var("MERGE_ARENA_TICK_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(1000 / 60);
    Duration::from_millis(millis)
}

pub fn participant_count() -> usize {
    env::var("MERGE_ARENA_PARTICIPANTS")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(3)
        .clamp(1, 10)
}

pub fn demo_seed() -> u64 {
    env::var("MERGE_ARENA_SEED")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(42)
}

pub fn demo_time_limit() -> Duration {
    let secs = env::var("MERGE_ARENA_TIME_LIMIT_S")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(60);
    Duration::from_secs(secs)
}

pub const SNAPSHOT_CHANNEL_CAPACITY: usize = 128;
