//! Per-connection sliding-window rate limiting

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::core::config::{RATE_MAX_ACTIONS, RATE_WINDOW};

/// Sliding window of recent action timestamps for one connection.
///
/// An action is admitted when fewer than `max` actions landed inside the
/// trailing window; rejected actions do not count against the window.
#[derive(Debug)]
pub struct RateLimiter {
    window: Duration,
    max: usize,
    stamps: VecDeque<Instant>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RATE_WINDOW, RATE_MAX_ACTIONS)
    }
}

impl RateLimiter {
    pub fn new(window: Duration, max: usize) -> Self {
        Self {
            window,
            max,
            stamps: VecDeque::with_capacity(max),
        }
    }

    /// Try to admit an action at `now`
    pub fn check(&mut self, now: Instant) -> bool {
        while let Some(&oldest) = self.stamps.front() {
            if now.duration_since(oldest) >= self.window {
                self.stamps.pop_front();
            } else {
                break;
            }
        }
        if self.stamps.len() >= self.max {
            return false;
        }
        self.stamps.push_back(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admits_up_to_max() {
        let mut limiter = RateLimiter::new(Duration::from_secs(2), 3);
        let now = Instant::now();
        assert!(limiter.check(now));
        assert!(limiter.check(now));
        assert!(limiter.check(now));
        assert!(!limiter.check(now));
    }

    #[test]
    fn test_window_slides() {
        let mut limiter = RateLimiter::new(Duration::from_millis(100), 2);
        let start = Instant::now();
        assert!(limiter.check(start));
        assert!(limiter.check(start));
        assert!(!limiter.check(start));

        // Past the window the oldest stamps fall out
        let later = start + Duration::from_millis(150);
        assert!(limiter.check(later));
    }

    #[test]
    fn test_rejections_do_not_extend_window() {
        let mut limiter = RateLimiter::new(Duration::from_millis(100), 1);
        let start = Instant::now();
        assert!(limiter.check(start));
        assert!(!limiter.check(start + Duration::from_millis(50)));
        // The rejected attempt must not have refilled the window
        assert!(limiter.check(start + Duration::from_millis(110)));
    }
}
