// Match-end monitor: dwell-time based termination detection, run only by the
// authority.

use crate::domain::tuning::Tuning;

pub struct MatchEndMonitor {
    tuning: Tuning,
    frame: u64,
    dwell_frames: u32,
    last_launch_frame: Option<u64>,
    fired: bool,
}

impl MatchEndMonitor {
    pub fn new(tuning: Tuning) -> Self {
        Self {
            tuning,
            frame: 0,
            dwell_frames: 0,
            last_launch_frame: None,
            fired: false,
        }
    }

    pub fn note_launch(&mut self) {
        self.last_launch_frame = Some(self.frame);
    }

    /// Advances one frame. `any_over_line` is true when some projectile's
    /// leading edge crosses the threshold while nearly motionless.
    ///
    /// A fresh launch does not reset a running dwell timer; only the absence
    /// of qualifying projectiles does. The timer may not start within the
    /// grace window after the most recent launch. Returns true exactly once,
    /// when the dwell threshold is reached.
    pub fn tick(&mut self, any_over_line: bool) -> bool {
        self.frame += 1;
        if self.fired {
            return false;
        }

        if !any_over_line {
            self.dwell_frames = 0;
            return false;
        }

        if self.dwell_frames == 0 {
            let in_grace = self
                .last_launch_frame
                .is_some_and(|launch| self.frame - launch <= u64::from(self.tuning.launch_grace_frames));
            if in_grace {
                return false;
            }
        }

        self.dwell_frames += 1;
        if self.dwell_frames >= self.tuning.dwell_threshold_frames {
            self.fired = true;
            return true;
        }
        false
    }
}
