//! Exponential backoff for idle-wait loops.

use std::hint::spin_loop;
use std::thread;
use std::time::Duration;

/// Escalating wait strategy: spin, then yield, then park briefly.
#[derive(Debug, Default)]
pub struct Backoff {
    step: u32,
}

impl Backoff {
    const SPIN_LIMIT: u32 = 6;
    const YIELD_LIMIT: u32 = 12;

    pub fn new() -> Self {
        Self { step: 0 }
    }

    /// Reset after productive work so the next idle phase starts hot.
    pub fn reset(&mut self) {
        self.step = 0;
    }

    /// Perform one wait step.
    pub fn wait(&mut self) {
        let step = self.step;
        self.step = self.step.saturating_add(1);

        if step <= Self::SPIN_LIMIT {
            for _ in 0..(1u32 << step.min(Self::SPIN_LIMIT)) {
                spin_loop();
            }
        } else if step <= Self::YIELD_LIMIT {
            thread::yield_now();
        } else {
            thread::park_timeout(Duration::from_micros(50));
        }
    }

    /// True once the backoff has escalated past spinning and yielding.
    pub fn is_parked_phase(&self) -> bool {
        self.step > Self::YIELD_LIMIT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escalation_and_reset() {
        let mut backoff = Backoff::new();
        assert!(!backoff.is_parked_phase());

        for _ in 0..=Backoff::YIELD_LIMIT {
            backoff.wait();
        }
        backoff.wait();
        assert!(backoff.is_parked_phase());

        backoff.reset();
        assert!(!backoff.is_parked_phase());
    }
}
