// Gameplay tuning for the coordination protocol (not runtime config).
// Frame counts assume the 60 Hz tick driven by the participant loop.

#[derive(Debug, Clone, Copy)]
pub struct Tuning {
    /// Length of a turn window before a launch is forced.
    pub turn_duration_frames: u32,
    /// Grace after a turn starts before input is accepted.
    pub launch_enable_delay_frames: u32,
    /// Consecutive motionless frames before the entitled participant
    /// requests turn advancement.
    pub settle_frames: u32,
    /// Continuous over-the-line dwell required to end the match.
    pub dwell_threshold_frames: u32,
    /// Window after a launch during which the dwell timer may not start.
    pub launch_grace_frames: u32,
    /// Radius of the terminal burst impulse.
    pub burst_radius: f32,
    /// Impulse magnitude at the burst center, decaying to zero at the radius.
    pub burst_strength: f32,
    /// Velocity multiplier applied to the combined velocity of a merge.
    pub bounce_factor: f32,
    /// Largest size rank; merging two of these bursts instead of spawning.
    pub max_size: u8,
    pub max_participants: usize,
    /// How often the authority broadcasts projectile positions.
    pub broadcast_every_frames: u32,
    /// How long a deleted projectile id is remembered to block resurrection
    /// from lagging snapshots.
    pub recently_deleted_frames: u64,
    /// Score awarded per size rank on merge or burst.
    pub score_per_rank: u64,
    /// Speed below which a body counts as motionless.
    pub motion_eps: f32,
    /// Replicated position delta below which a projectile counts as settled.
    pub settle_position_eps: f32,
    /// Height of the overflow line; a slow projectile whose leading edge
    /// crosses it feeds the dwell timer.
    pub over_line_y: f32,
    /// Height projectiles are launched from.
    pub spawn_y: f32,
    /// Horizontal range for randomized spawn positions.
    pub spawn_half_width: f32,
    /// Default launch speed for forced (non-aimed) drops.
    pub default_launch_speed: f32,
    /// Later snapshots after which a speculative projectile is discarded
    /// even if no authoritative projectile data ever shows up.
    pub speculative_max_snapshots: u64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            turn_duration_frames: 600,
            launch_enable_delay_frames: 30,
            settle_frames: 30,
            dwell_threshold_frames: 120,
            launch_grace_frames: 60,
            burst_radius: 140.0,
            burst_strength: 260.0,
            bounce_factor: 0.4,
            max_size: 11,
            max_participants: 10,
            broadcast_every_frames: 3,
            recently_deleted_frames: 300,
            score_per_rank: 10,
            motion_eps: 2.0,
            settle_position_eps: 0.75,
            over_line_y: 420.0,
            spawn_y: 520.0,
            spawn_half_width: 240.0,
            default_launch_speed: 320.0,
            speculative_max_snapshots: 20,
        }
    }
}

impl Tuning {
    /// Score value of producing (or bursting at) the given size rank.
    pub fn rank_value(&self, size: u8) -> u64 {
        u64::from(size) * self.score_per_rank
    }

    /// Largest size rank the next-spawn selection may pick.
    pub fn max_spawn_candidate(&self, max_size_seen: u8) -> u8 {
        max_size_seen.saturating_sub(1).max(1).min(5)
    }
}
