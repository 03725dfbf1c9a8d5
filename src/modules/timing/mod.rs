//! Jittered timing utilities.
//!
//! Probes and strategies deliberately avoid fixed delays, since blockers can
//! special-case a single well-known timeout. Every delay is drawn from here.

use std::time::Duration;

use rand::Rng;

/// A base delay widened by uniform jitter, optionally staggered per step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JitteredDelay {
    base: Duration,
    stagger: Duration,
    jitter: Duration,
}

impl JitteredDelay {
    pub fn new(base: Duration) -> Self {
        Self {
            base,
            stagger: Duration::ZERO,
            jitter: Duration::ZERO,
        }
    }

    pub fn with_stagger(mut self, stagger: Duration) -> Self {
        self.stagger = stagger;
        self
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay for the `step`-th action: `base + step * stagger + U(0, jitter)`.
    pub fn for_step(&self, step: usize) -> Duration {
        let staggered = self.base + self.stagger.saturating_mul(step as u32);
        staggered + random_between(Duration::ZERO, self.jitter)
    }
}

/// Uniform random duration in `[min, max]`; returns `min` for empty ranges.
pub fn random_between(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    let mut rng = rand::thread_rng();
    let low = u64::try_from(min.as_millis()).unwrap_or(u64::MAX);
    let high = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
    let millis = rng.gen_range(low..=high);
    Duration::from_millis(millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_are_staggered_within_jitter() {
        let delay = JitteredDelay::new(Duration::from_millis(100))
            .with_stagger(Duration::from_millis(50))
            .with_jitter(Duration::from_millis(20));

        for step in 0..4 {
            let sampled = delay.for_step(step);
            let floor = Duration::from_millis(100 + 50 * step as u64);
            assert!(sampled >= floor);
            assert!(sampled <= floor + Duration::from_millis(20));
        }
    }

    #[test]
    fn empty_range_returns_min() {
        let fixed = Duration::from_millis(30);
        assert_eq!(random_between(fixed, fixed), fixed);
        assert_eq!(random_between(fixed, Duration::ZERO), fixed);
    }
}
