//! Leading-edge throttle for cursor-driven forward sync.
//!
//! The first cursor move after a quiet period fires at once. Moves inside
//! the interval are coalesced into one trailing fire carrying the latest
//! line, so the preview always ends on where the cursor stopped.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    Fire(u32),
    /// Arm a one-shot timer; call [`ForwardSyncThrottle::on_timer`] when it fires.
    Schedule { delay_ms: u64 },
    /// A trailing fire is already armed and now carries this line.
    Coalesced,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardSyncThrottle {
    interval_ms: u64,
    last_fire_ms: Option<u64>,
    pending: Option<u32>,
    timer_armed: bool,
}

impl ForwardSyncThrottle {
    pub const fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_fire_ms: None,
            pending: None,
            timer_armed: false,
        }
    }

    pub const fn set_interval(&mut self, interval_ms: u64) {
        self.interval_ms = interval_ms;
    }

    /// Drop any pending line. A timer that is still armed fires into nothing.
    pub const fn reset(&mut self) {
        self.last_fire_ms = None;
        self.pending = None;
        self.timer_armed = false;
    }

    fn elapsed(&self, now_ms: u64) -> Option<u64> {
        self.last_fire_ms.map(|last| now_ms.saturating_sub(last))
    }

    pub fn on_line(&mut self, line: u32, now_ms: u64) -> ThrottleDecision {
        if self.timer_armed {
            self.pending = Some(line);
            return ThrottleDecision::Coalesced;
        }
        match self.elapsed(now_ms) {
            Some(elapsed) if elapsed < self.interval_ms => {
                self.pending = Some(line);
                self.timer_armed = true;
                ThrottleDecision::Schedule {
                    delay_ms: self.interval_ms - elapsed,
                }
            }
            _ => {
                self.last_fire_ms = Some(now_ms);
                ThrottleDecision::Fire(line)
            }
        }
    }

    /// Trailing edge: the line to sync, if one is still pending.
    pub fn on_timer(&mut self, now_ms: u64) -> Option<u32> {
        if !self.timer_armed {
            return None;
        }
        self.timer_armed = false;
        let pending = self.pending.take();
        if pending.is_some() {
            self.last_fire_ms = Some(now_ms);
        }
        pending
    }
}
