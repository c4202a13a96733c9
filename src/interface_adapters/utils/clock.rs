use std::time::{SystemTime, UNIX_EPOCH};

use crate::domain::ports::Clock;

/// Wall-clock adapter for the `Clock` port.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}
