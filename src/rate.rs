//! Sliding-window rate counter
//!
//! Each `add` appends a timestamped bucket; buckets older than the retention
//! horizon are pruned on the next `add`. `rate(window)` sums buckets at or
//! after `now - window` and divides by the window length in seconds, so the
//! same counter answers both the 10 s and the 60 s throughput questions.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Buckets older than this are dropped regardless of the query window.
const RETENTION: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Copy)]
struct Bucket {
    at: Instant,
    n: u64,
}

/// Completion counter with sliding-window rate queries.
#[derive(Debug)]
pub struct RateCounter {
    buckets: VecDeque<Bucket>,
}

impl RateCounter {
    pub fn new() -> Self {
        Self {
            buckets: VecDeque::new(),
        }
    }

    /// Record `n` completions now.
    pub fn add(&mut self, n: u64) {
        self.add_at(n, Instant::now());
    }

    /// Events per second over the trailing `window`. Zero with no buckets.
    pub fn rate(&self, window: Duration) -> f64 {
        self.rate_at(window, Instant::now())
    }

    fn add_at(&mut self, n: u64, now: Instant) {
        self.buckets.push_back(Bucket { at: now, n });

        // Time-ordered, so pruning only ever pops from the front.
        while let Some(front) = self.buckets.front() {
            if now.duration_since(front.at) > RETENTION {
                self.buckets.pop_front();
            } else {
                break;
            }
        }
    }

    fn rate_at(&self, window: Duration, now: Instant) -> f64 {
        if self.buckets.is_empty() || window.is_zero() {
            return 0.0;
        }

        let cutoff = now.checked_sub(window);
        let sum: u64 = self
            .buckets
            .iter()
            .rev()
            .take_while(|b| match cutoff {
                // A bucket exactly at the cutoff counts.
                Some(cutoff) => b.at >= cutoff,
                None => true,
            })
            .map(|b| b.n)
            .sum();

        sum as f64 / window.as_secs_f64()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.buckets.len()
    }
}

impl Default for RateCounter {
    fn default() -> Self {
        Self::new()
    }
}
