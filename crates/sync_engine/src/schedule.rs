//! Flush timing decisions.
//!
//! `FlushSchedule` holds only timing metadata, never snapshot data. The
//! engine asks it when the next normal flush may be dispatched and arms a
//! timer for that instant.

use std::time::Duration;
use tokio::time::Instant;

/// What the scheduler wants to happen next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushDecision {
    /// Dispatch the pending buffer now
    DispatchNow,
    /// Wait until the given instant and decide again
    WaitUntil(Instant),
}

/// Timing state of the flush scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushSchedule {
    /// When the last normal flush settled
    pub last_flush_attempt: Instant,
    /// Current cadence between routine flushes
    pub cadence_interval: Duration,
    /// When the idle timer will fire, if armed
    pub idle_deadline: Option<Instant>,
    /// Normal flushes wait until this instant after a critical flush
    pub cooldown_until: Option<Instant>,
    /// Set when an idle firing or forced flush is waiting on a blocker
    pub flush_due: bool,
    /// Cadence forced through the probe, ignoring the activity classifier
    pub cadence_override: Option<Duration>,
}

impl FlushSchedule {
    /// Schedule for a session starting at `now`.
    ///
    /// Session start counts as the last attempt, so the first flush waits
    /// a full cadence (or the idle delay) and coalesces early mutations.
    pub fn new(now: Instant, cadence_interval: Duration) -> Self {
        Self {
            last_flush_attempt: now,
            cadence_interval,
            idle_deadline: None,
            cooldown_until: None,
            flush_due: false,
            cadence_override: None,
        }
    }

    /// Pick the cadence for the current activity level.
    pub fn classify(&mut self, automation_active: bool, base: Duration, automation: Duration) {
        self.cadence_interval = match self.cadence_override {
            Some(interval) => interval,
            None if automation_active => automation,
            None => base,
        };
    }

    /// Earliest instant a normal flush may be dispatched.
    pub fn ready_at(&self, now: Instant) -> Instant {
        let due = if self.flush_due {
            now
        } else {
            self.last_flush_attempt + self.cadence_interval
        };
        match self.cooldown_until {
            Some(cooldown) => due.max(cooldown),
            None => due,
        }
    }

    pub fn decide(&self, now: Instant) -> FlushDecision {
        let ready_at = self.ready_at(now);
        if ready_at <= now {
            FlushDecision::DispatchNow
        } else {
            FlushDecision::WaitUntil(ready_at)
        }
    }

    /// Check whether the post-critical cooldown is still running.
    pub fn in_cooldown(&self, now: Instant) -> bool {
        self.cooldown_until.is_some_and(|until| until > now)
    }

    /// Time left in the cooldown window.
    pub fn cooldown_remaining(&self, now: Instant) -> Option<Duration> {
        self.cooldown_until
            .filter(|until| *until > now)
            .map(|until| until - now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: Duration = Duration::from_millis(3000);
    const WIDE: Duration = Duration::from_millis(10000);

    #[test]
    fn test_waits_for_cadence() {
        let start = Instant::now();
        let schedule = FlushSchedule::new(start, BASE);

        assert_eq!(
            schedule.decide(start + Duration::from_millis(100)),
            FlushDecision::WaitUntil(start + BASE)
        );
        assert_eq!(schedule.decide(start + BASE), FlushDecision::DispatchNow);
    }

    #[test]
    fn test_flush_due_skips_cadence() {
        let start = Instant::now();
        let mut schedule = FlushSchedule::new(start, WIDE);
        schedule.flush_due = true;

        let now = start + Duration::from_millis(3000);
        assert_eq!(schedule.decide(now), FlushDecision::DispatchNow);
    }

    #[test]
    fn test_cooldown_defers_even_when_due() {
        let start = Instant::now();
        let mut schedule = FlushSchedule::new(start, Duration::from_millis(10));
        let cooldown_end = start + Duration::from_millis(2100);
        schedule.cooldown_until = Some(cooldown_end);
        schedule.flush_due = true;

        let now = start + Duration::from_millis(105);
        assert!(schedule.in_cooldown(now));
        assert_eq!(schedule.decide(now), FlushDecision::WaitUntil(cooldown_end));
        assert_eq!(
            schedule.cooldown_remaining(now),
            Some(Duration::from_millis(1995))
        );

        assert!(!schedule.in_cooldown(cooldown_end));
        assert_eq!(schedule.decide(cooldown_end), FlushDecision::DispatchNow);
        assert_eq!(schedule.cooldown_remaining(cooldown_end), None);
    }

    #[test]
    fn test_classify_activity() {
        let mut schedule = FlushSchedule::new(Instant::now(), BASE);

        schedule.classify(true, BASE, WIDE);
        assert_eq!(schedule.cadence_interval, WIDE);

        schedule.classify(false, BASE, WIDE);
        assert_eq!(schedule.cadence_interval, BASE);

        schedule.cadence_override = Some(Duration::from_millis(50));
        schedule.classify(true, BASE, WIDE);
        assert_eq!(schedule.cadence_interval, Duration::from_millis(50));
    }
}
