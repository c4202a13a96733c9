// Turn controller: per-participant turn state machine with frame-based
// timers. `tick` is called once per render frame by the engine.

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;

use crate::domain::session::{ParticipantId, PendingSpawn};
use crate::domain::tuning::Tuning;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    /// Not this participant's turn.
    Idle,
    /// Entitled; counting down toward a forced launch.
    Armed {
        frames_left: u32,
        enable_delay_left: u32,
    },
    /// Launched; waiting for the arena to stabilize.
    Settling { settled_frames: u32 },
}

/// Outcome of one controller frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnTick {
    Idle,
    /// The countdown expired; the engine must launch with the default
    /// velocity exactly as if the participant had acted.
    ForceLaunch,
    /// The arena stabilized long enough; the engine should issue the
    /// advance-turn write.
    Advance,
}

pub struct TurnController {
    tuning: Tuning,
    self_id: ParticipantId,
    phase: Phase,
    rng: SmallRng,
}

impl TurnController {
    pub fn new(tuning: Tuning, self_id: impl Into<ParticipantId>, seed: u64) -> Self {
        Self {
            tuning,
            self_id: self_id.into(),
            phase: Phase::Idle,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Handles a derived turn-change event. Any running countdown and any
    /// pending delayed enable are cancelled regardless of cause.
    pub fn on_turn_changed(&mut self, participant_id: &str) {
        if participant_id == self.self_id {
            self.phase = Phase::Armed {
                frames_left: self.tuning.turn_duration_frames,
                enable_delay_left: self.tuning.launch_enable_delay_frames,
            };
        } else {
            self.phase = Phase::Idle;
        }
    }

    /// True once the post-turn-start grace has elapsed and input may launch.
    pub fn may_launch(&self) -> bool {
        matches!(
            self.phase,
            Phase::Armed {
                enable_delay_left: 0,
                ..
            }
        )
    }

    pub fn is_settling(&self) -> bool {
        matches!(self.phase, Phase::Settling { .. })
    }

    /// Records that a launch happened (self-initiated or forced).
    pub fn note_launched(&mut self) {
        self.phase = Phase::Settling { settled_frames: 0 };
    }

    /// Advances timers by one frame. `arena_moving` is the engine-supplied
    /// motion signal used while settling.
    pub fn tick(&mut self, arena_moving: bool) -> TurnTick {
        match &mut self.phase {
            Phase::Idle => TurnTick::Idle,
            Phase::Armed {
                frames_left,
                enable_delay_left,
            } => {
                if *enable_delay_left > 0 {
                    *enable_delay_left -= 1;
                }
                if *frames_left > 0 {
                    *frames_left -= 1;
                    TurnTick::Idle
                } else {
                    TurnTick::ForceLaunch
                }
            }
            Phase::Settling { settled_frames } => {
                if arena_moving {
                    *settled_frames = 0;
                    return TurnTick::Idle;
                }
                *settled_frames += 1;
                if *settled_frames >= self.tuning.settle_frames {
                    self.phase = Phase::Idle;
                    TurnTick::Advance
                } else {
                    TurnTick::Idle
                }
            }
        }
    }

    /// Picks the next spawn descriptor. Size is drawn from
    /// `1..=min(max_size_seen - 1, 5)` with weight `max_candidate - size + 1`
    /// so spawns skew toward the low end of the relevant range.
    pub fn next_spawn(&mut self, max_size_seen: u8) -> PendingSpawn {
        let max_candidate = self.tuning.max_spawn_candidate(max_size_seen);
        let total: u32 = (1..=u32::from(max_candidate))
            .map(|size| u32::from(max_candidate) - size + 1)
            .sum();
        let mut roll = self.rng.random_range(0..total);
        let mut size = max_candidate;
        for candidate in 1..=max_candidate {
            let weight = u32::from(max_candidate) - u32::from(candidate) + 1;
            if roll < weight {
                size = candidate;
                break;
            }
            roll -= weight;
        }
        let x = self
            .rng
            .random_range(-self.tuning.spawn_half_width..=self.tuning.spawn_half_width);
        PendingSpawn { size, x }
    }
}
