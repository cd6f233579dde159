use std::time::Duration;

/// Hard cap on status fetches for one record.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 20;

/// Attempt count from which the medium interval applies.
const MEDIUM_FROM_ATTEMPT: u32 = 5;
/// Attempt count from which the slow interval applies.
const SLOW_FROM_ATTEMPT: u32 = 10;

/// Stepped polling cadence plus the attempt cap.
///
/// Early attempts poll quickly because the user has just submitted the image;
/// long-running jobs are polled less often to keep load on the backend down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    pub max_attempts: u32,
    pub fast_interval: Duration,
    pub medium_interval: Duration,
    pub slow_interval: Duration,
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            fast_interval: Duration::from_millis(3000),
            medium_interval: Duration::from_millis(5000),
            slow_interval: Duration::from_millis(10000),
        }
    }
}

impl PollSchedule {
    /// Delay to wait after `attempt` fetches have completed.
    pub fn interval_for_attempt(&self, attempt: u32) -> Duration {
        if attempt < MEDIUM_FROM_ATTEMPT {
            self.fast_interval
        } else if attempt < SLOW_FROM_ATTEMPT {
            self.medium_interval
        } else {
            self.slow_interval
        }
    }

    pub fn is_exhausted(&self, attempts: u32) -> bool {
        attempts >= self.max_attempts
    }

    /// Upper bound on the time spent sleeping between fetches.
    pub fn total_wait(&self) -> Duration {
        (1..self.max_attempts)
            .map(|attempt| self.interval_for_attempt(attempt))
            .sum()
    }
}
