use super::*;

/// Per-pool counters. Only the connector writes these, under its lock.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoolStats {
    pub connection_attempts: u64,
    pub connection_successes: u64,
    pub jobs_received: u64,
    pub shares_submitted: u64,
    pub shares_accepted: u64,
    pub shares_rejected: u64,
    /// Round trip of the last `mining.authorize`.
    pub latency: Option<Duration>,
    pub last_connect: Option<DateTime<Utc>>,
}

impl PoolStats {
    /// Accepted over submitted, `None` until something was submitted.
    pub fn acceptance_rate(&self) -> Option<f64> {
        (self.shares_submitted > 0)
            .then(|| self.shares_accepted as f64 / self.shares_submitted as f64)
    }
}
