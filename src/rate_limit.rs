//! Minimum-interval gate.
//!
//! A `RateLimiter` answers "has enough time elapsed since the last fire" and
//! nothing else. Checking eligibility and committing a fire are separate
//! calls: the caller commits only once the gated action actually succeeded,
//! so a failed action leaves the gate open for the next opportunity.

use chrono::{DateTime, Duration as ChronoDuration, Local};
use std::time::Duration;

/// Per-consumer interval gate. Each gated handler owns its own instance;
/// nothing is shared.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    interval: Duration,
    last_fire: Option<DateTime<Local>>,
}

impl RateLimiter {
    /// A fresh limiter is always eligible on its first check.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_fire: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// True when at least `interval` has elapsed since the last committed
    /// fire (or when nothing has fired yet).
    pub fn should_fire(&self, now: DateTime<Local>) -> bool {
        let Some(last) = self.last_fire else {
            return true;
        };
        let interval = ChronoDuration::from_std(self.interval).unwrap_or(ChronoDuration::MAX);
        now.signed_duration_since(last) >= interval
    }

    /// Commit a fire. Call only after the gated action succeeded.
    pub fn mark_fired(&mut self, now: DateTime<Local>) {
        self.last_fire = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> DateTime<Local> {
        Local::now()
    }

    #[test]
    fn first_check_is_eligible_for_any_interval() {
        let t = base();
        assert!(RateLimiter::new(Duration::ZERO).should_fire(t));
        assert!(RateLimiter::new(Duration::from_secs(10)).should_fire(t));
        assert!(RateLimiter::new(Duration::from_secs(3600)).should_fire(t));
    }

    #[test]
    fn immediately_after_fire_the_gate_is_closed() {
        let t = base();
        let mut limiter = RateLimiter::new(Duration::from_secs(10));
        limiter.mark_fired(t);
        assert!(!limiter.should_fire(t));
        assert!(!limiter.should_fire(t + ChronoDuration::seconds(9)));
    }

    #[test]
    fn gate_reopens_exactly_at_the_interval() {
        let t = base();
        let mut limiter = RateLimiter::new(Duration::from_secs(10));
        limiter.mark_fired(t);
        assert!(limiter.should_fire(t + ChronoDuration::seconds(10)));
        assert!(limiter.should_fire(t + ChronoDuration::seconds(11)));
    }

    #[test]
    fn zero_interval_never_gates() {
        let t = base();
        let mut limiter = RateLimiter::new(Duration::ZERO);
        limiter.mark_fired(t);
        assert!(limiter.should_fire(t));
    }

    #[test]
    fn uncommitted_checks_do_not_advance_the_gate() {
        let t = base();
        let mut limiter = RateLimiter::new(Duration::from_secs(10));
        limiter.mark_fired(t);
        // Eligibility checks alone never move last_fire.
        let later = t + ChronoDuration::seconds(10);
        assert!(limiter.should_fire(later));
        assert!(limiter.should_fire(later));
        limiter.mark_fired(later);
        assert!(!limiter.should_fire(later + ChronoDuration::seconds(9)));
    }

    #[test]
    fn sub_second_intervals_gate_correctly() {
        let t = base();
        let mut limiter = RateLimiter::new(Duration::from_millis(500));
        limiter.mark_fired(t);
        assert!(!limiter.should_fire(t + ChronoDuration::milliseconds(499)));
        assert!(limiter.should_fire(t + ChronoDuration::milliseconds(500)));
    }
}
