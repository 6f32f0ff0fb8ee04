// ==============================================================================
// annotation/rate_limit.rs - Outbound request pacing
// ==============================================================================
// Description: Minimum-interval limiter shared by all remote lookups
// Created: 2026-09-24
// Modified: 2026-10-05
// Version: 2.0.0
// ==============================================================================

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::time::Duration;
use tracing::debug;

/// Default spacing between outbound requests
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(100);

/// Enforces a minimum interval between outbound requests
///
/// One instance is built per process and handed to every client that talks to
/// a remote service. A zero interval disables pacing.
#[derive(Debug)]
pub struct RequestRateLimiter {
    interval: Duration,
    limiter: Option<DefaultDirectRateLimiter>,
}

impl RequestRateLimiter {
    pub fn new(interval: Duration) -> Self {
        // Burst of one: each cell replenishes after `interval`
        let limiter = Quota::with_period(interval).map(RateLimiter::direct);

        Self { interval, limiter }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until the next request may be sent
    pub async fn acquire(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
            debug!("Rate limiter permit granted");
        }
    }
}

impl Default for RequestRateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_enforces_minimum_interval() {
        let limiter = RequestRateLimiter::new(Duration::from_millis(50));
        let start = Instant::now();

        for _ in 0..3 {
            limiter.acquire().await;
        }

        // First permit is immediate, the next two wait one interval each
        assert!(start.elapsed() >= Duration::from_millis(90));
    }

    #[tokio::test]
    async fn test_zero_interval_disables_pacing() {
        let limiter = RequestRateLimiter::new(Duration::ZERO);
        let start = Instant::now();

        for _ in 0..100 {
            limiter.acquire().await;
        }

        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
