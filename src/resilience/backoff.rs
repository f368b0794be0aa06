//! Error backoff schedule.
//!
//! The schedule is a fixed ascending table computed once per process from a
//! floor and a ceiling (seconds): start at the ceiling, halve while above the
//! floor, append the floor, reverse. Halving happens in hundredths of a
//! second, so `(5, 1800)` yields 5s, 7.03s, 14.06s, ... 900s, 1800s.
//!
//! Each pair walks the shared table with its own [`RetryState`].

use std::time::Duration;

/// Hundredths of a second per second.
const STEPS_PER_SEC: u64 = 100;

/// Milliseconds per hundredth of a second.
const MS_PER_STEP: u64 = 10;

/// Shared, read-only table of backoff delays in ascending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrySchedule {
    delays_ms: Vec<u64>,
}

impl RetrySchedule {
    /// Build the table from a floor and a ceiling in seconds.
    pub fn new(floor_secs: u64, ceiling_secs: u64) -> Self {
        let floor = floor_secs.saturating_mul(STEPS_PER_SEC);
        let mut next = ceiling_secs.saturating_mul(STEPS_PER_SEC);

        let mut steps = Vec::new();
        while next > floor {
            steps.push(next);
            next /= 2;
        }
        steps.push(floor);
        steps.reverse();

        Self {
            delays_ms: steps.into_iter().map(|s| s.saturating_mul(MS_PER_STEP)).collect(),
        }
    }

    /// All delays in milliseconds, shortest first.
    pub fn delays_ms(&self) -> &[u64] {
        &self.delays_ms
    }

    /// Delay at `index`, clamped to the last entry.
    pub fn delay(&self, index: usize) -> Duration {
        let idx = index.min(self.delays_ms.len() - 1);
        Duration::from_millis(self.delays_ms[idx])
    }

    pub fn len(&self) -> usize {
        self.delays_ms.len()
    }

    /// Always false; the floor is always present.
    pub fn is_empty(&self) -> bool {
        self.delays_ms.is_empty()
    }

    /// Index of the smallest delay strictly greater than the one at `index`.
    fn next_index(&self, index: usize) -> Option<usize> {
        let current = self.delays_ms.get(index)?;
        self.delays_ms.iter().position(|d| d > current)
    }
}

impl Default for RetrySchedule {
    fn default() -> Self {
        Self::new(5, 1800)
    }
}

/// Per-pair position in the [`RetrySchedule`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryState {
    index: usize,
}

impl RetryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay to wait before the next attempt.
    pub fn current(&self, schedule: &RetrySchedule) -> Duration {
        schedule.delay(self.index)
    }

    /// True once the longest delay is reached.
    pub fn is_at_ceiling(&self, schedule: &RetrySchedule) -> bool {
        schedule.next_index(self.index).is_none()
    }

    /// Step to the next longer delay. Returns false at the ceiling.
    pub fn advance(&mut self, schedule: &RetrySchedule) -> bool {
        match schedule.next_index(self.index) {
            Some(next) => {
                self.index = next;
                true
            }
            None => false,
        }
    }

    /// Back to the shortest delay.
    pub fn reset(&mut self) {
        self.index = 0;
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let schedule = RetrySchedule::new(5, 1800);
        assert_eq!(
            schedule.delays_ms(),
            &[5000, 7030, 14060, 28120, 56250, 112500, 225000, 450000, 900000, 1800000]
        );
    }

    #[test]
    fn test_short_table() {
        let schedule = RetrySchedule::new(1, 5);
        assert_eq!(schedule.delays_ms(), &[1000, 1250, 2500, 5000]);
    }

    #[test]
    fn test_floor_not_below_ceiling() {
        assert_eq!(RetrySchedule::new(10, 10).delays_ms(), &[10000]);
        assert_eq!(RetrySchedule::new(20, 10).delays_ms(), &[20000]);
    }

    #[test]
    fn test_state_walks_and_saturates() {
        let schedule = RetrySchedule::new(1, 5);
        let mut state = RetryState::new();
        assert_eq!(state.current(&schedule), Duration::from_millis(1000));

        assert!(state.advance(&schedule));
        assert_eq!(state.current(&schedule), Duration::from_millis(1250));
        assert!(state.advance(&schedule));
        assert!(state.advance(&schedule));
        assert!(state.is_at_ceiling(&schedule));
        assert_eq!(state.current(&schedule), Duration::from_millis(5000));

        assert!(!state.advance(&schedule));
        assert_eq!(state.current(&schedule), Duration::from_millis(5000));

        state.reset();
        assert_eq!(state.index(), 0);
        assert!(!state.is_at_ceiling(&schedule));
    }

    #[test]
    fn test_single_entry_is_ceiling() {
        let schedule = RetrySchedule::new(10, 10);
        let mut state = RetryState::new();
        assert!(state.is_at_ceiling(&schedule));
        assert!(!state.advance(&schedule));
    }
}
