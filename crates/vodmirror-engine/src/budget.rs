//! Wall-clock budget for one invocation of the time-bounded host.

use std::time::{Duration, Instant};

/// Remaining execution allowance, consulted by admission before every
/// enqueue. Work already dequeued is never interrupted, so the safety margin
/// must exceed the longest plausible single fetch+upload.
#[derive(Debug, Clone)]
pub struct TimeBudget {
    deadline: Option<Instant>,
    safety_margin: Duration,
}

impl TimeBudget {
    /// `allowance` is the host-supplied remaining time for this invocation;
    /// `None` means unbounded (e.g. a command-line run).
    pub fn new(allowance: Option<Duration>, safety_margin: Duration) -> Self {
        Self {
            deadline: allowance.map(|a| Instant::now() + a),
            safety_margin,
        }
    }

    pub fn unbounded() -> Self {
        Self {
            deadline: None,
            safety_margin: Duration::ZERO,
        }
    }

    /// True once less than the safety margin remains.
    pub fn exhausted(&self) -> bool {
        match self.deadline {
            Some(deadline) => {
                deadline.saturating_duration_since(Instant::now()) < self.safety_margin
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_budget_never_exhausts() {
        assert!(!TimeBudget::unbounded().exhausted());
        assert!(!TimeBudget::new(None, Duration::from_secs(120)).exhausted());
    }

    #[test]
    fn allowance_below_margin_exhausts_immediately() {
        let budget = TimeBudget::new(Some(Duration::from_secs(10)), Duration::from_secs(120));
        assert!(budget.exhausted());
    }

    #[test]
    fn generous_allowance_is_not_exhausted() {
        let budget = TimeBudget::new(Some(Duration::from_secs(600)), Duration::from_secs(120));
        assert!(!budget.exhausted());
    }
}
