use std::time::Duration;

use tokio::time::Instant;

pub const DEFAULT_PHASE_SECONDS: u32 = 60;

const TICK: Duration = Duration::from_secs(1);

/// Advisory per-phase countdown.
///
/// The countdown is display state only: reaching zero never moves the draft
/// forward, the operator decides what happens next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timer {
    Stopped { remaining: u32 },
    /// `started_at` is the instant of the last applied tick, not of `start()`.
    Running { remaining: u32, started_at: Instant },
}

impl Default for Timer {
    fn default() -> Self {
        Timer::Stopped {
            remaining: DEFAULT_PHASE_SECONDS,
        }
    }
}

impl Timer {
    pub fn stopped(remaining: u32) -> Self {
        Timer::Stopped { remaining }
    }

    pub fn running(remaining: u32, now: Instant) -> Self {
        Timer::Running {
            remaining,
            started_at: now,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Timer::Running { .. })
    }

    pub fn start(&mut self, now: Instant) {
        if let Timer::Stopped { remaining } = *self {
            *self = Timer::running(remaining, now);
        }
    }

    pub fn stop(&mut self, now: Instant) {
        if self.is_running() {
            *self = Timer::stopped(self.remaining(now));
        }
    }

    /// One second off a running countdown, floored at zero.
    pub fn tick(&mut self) {
        if let Timer::Running {
            remaining,
            started_at,
        } = self
        {
            *remaining = remaining.saturating_sub(1);
            *started_at += TICK;
        }
    }

    /// Applies every whole second elapsed since the last tick.
    pub fn catch_up(&mut self, now: Instant) {
        if let Timer::Running {
            remaining,
            started_at,
        } = self
        {
            let elapsed = now.saturating_duration_since(*started_at).as_secs();
            let ticks = elapsed.min(u64::from(*remaining)) as u32;
            *remaining -= ticks;
            *started_at += TICK * ticks;
        }
    }

    pub fn remaining(&self, now: Instant) -> u32 {
        let mut current = *self;
        current.catch_up(now);
        match current {
            Timer::Stopped { remaining } | Timer::Running { remaining, .. } => remaining,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn start_carries_remaining_over() {
        let now = Instant::now();
        let mut timer = Timer::stopped(42);
        timer.start(now);
        assert!(timer.is_running());
        assert_eq!(timer.remaining(now), 42);
    }

    #[test]
    fn running_timer_counts_down_and_floors_at_zero() {
        let now = Instant::now();
        let timer = Timer::running(5, now);
        assert_eq!(timer.remaining(now + secs(2)), 3);
        assert_eq!(timer.remaining(now + Duration::from_millis(2900)), 3);
        assert_eq!(timer.remaining(now + secs(90)), 0);
    }

    #[test]
    fn stop_freezes_the_computed_value() {
        let now = Instant::now();
        let mut timer = Timer::running(60, now);
        timer.stop(now + secs(15));
        assert_eq!(timer, Timer::stopped(45));
        assert_eq!(timer.remaining(now + secs(500)), 45);
    }

    #[test]
    fn restarting_after_stop_resumes_from_frozen_value() {
        let now = Instant::now();
        let mut timer = Timer::running(60, now);
        timer.stop(now + secs(10));
        timer.start(now + secs(100));
        assert_eq!(timer.remaining(now + secs(105)), 45);
    }

    #[test]
    fn tick_only_affects_running_timers() {
        let now = Instant::now();
        let mut stopped = Timer::stopped(10);
        stopped.tick();
        assert_eq!(stopped, Timer::stopped(10));

        let mut running = Timer::running(1, now);
        running.tick();
        running.tick();
        assert_eq!(running.remaining(now), 0);
    }

    #[test]
    fn catch_up_matches_repeated_ticks() {
        let now = Instant::now();
        let mut ticked = Timer::running(30, now);
        for _ in 0..7 {
            ticked.tick();
        }
        let mut caught_up = Timer::running(30, now);
        caught_up.catch_up(now + secs(7));
        assert_eq!(ticked, caught_up);
    }
}
