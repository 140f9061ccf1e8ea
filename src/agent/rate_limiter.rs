use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Sliding-window limiter keyed by client. State lives in memory only and
/// is not shared between processes.
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    hits: Mutex<HashMap<String, VecDeque<Instant>>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: usize },
    Limited { retry_after: Duration },
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1) as usize,
            window,
            hits: Mutex::new(HashMap::new()),
        }
    }

    pub fn check(&self, key: &str) -> RateDecision {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> RateDecision {
        let mut hits = match self.hits.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        // Forget idle clients so the map does not grow without bound.
        hits.retain(|_, window| {
            window
                .back()
                .map(|last| now.duration_since(*last) < self.window)
                .unwrap_or(false)
        });

        let window = hits.entry(key.to_string()).or_default();
        while let Some(oldest) = window.front() {
            if now.duration_since(*oldest) >= self.window {
                window.pop_front();
            } else {
                break;
            }
        }
        if window.len() >= self.max_requests {
            let retry_after = window
                .front()
                .map(|oldest| self.window.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(self.window);
            return RateDecision::Limited { retry_after };
        }
        window.push_back(now);
        RateDecision::Allowed {
            remaining: self.max_requests - window.len(),
        }
    }
}
