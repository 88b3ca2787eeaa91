//! Sliding-window rate limiter shared by all workers.
//!
//! The policy is `{calls, per, burst}`: at most `calls` grants in any window
//! of length `per`, and at most `burst` grants back-to-back before grants are
//! spaced out. All bookkeeping lives behind one `tokio::sync::Mutex`, and the
//! lock is held across the wait, so two concurrent acquisitions can never
//! together overshoot the window budget.
//!
//! Window state is process-lifetime only. Restarting the process resets the
//! externally observed rate, so the limiter cannot enforce cross-run global
//! limits.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};

use crate::error::RateLimitExceeded;

/// Permit policy for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimiterPolicy {
    /// Maximum grants per rolling window.
    pub calls: u32,
    /// Window length.
    pub per: Duration,
    /// Maximum grants issued instantaneously. Defaults to `calls`.
    pub burst: u32,
    /// Upper bound on how long one acquisition may wait. `None` means
    /// acquisition always eventually succeeds.
    pub max_wait: Option<Duration>,
}

impl LimiterPolicy {
    pub fn new(calls: u32, per: Duration) -> Self {
        Self {
            calls,
            per,
            burst: calls,
            max_wait: None,
        }
    }

    pub fn with_burst(mut self, burst: u32) -> Self {
        self.burst = burst;
        self
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }
}

/// Grants permits under a [`LimiterPolicy`]. Cheap to share behind an `Arc`;
/// `acquire` is the only suspension point it introduces.
pub struct RateLimiter {
    policy: LimiterPolicy,
    // Timestamps of the most recent grants, oldest first. Never longer than
    // `policy.calls`.
    grants: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(mut policy: LimiterPolicy) -> Self {
        policy.calls = policy.calls.max(1);
        policy.burst = policy.burst.clamp(1, policy.calls);
        Self {
            policy,
            grants: Mutex::new(VecDeque::new()),
        }
    }

    pub fn policy(&self) -> &LimiterPolicy {
        &self.policy
    }

    /// Wait until a permit is free under the policy, then take it.
    ///
    /// Returns `Err(RateLimitExceeded)` only when `max_wait` is configured
    /// and the next free slot lies beyond it. The grant and its window
    /// accounting happen atomically under the internal lock; a caller
    /// cancelled mid-wait (the future dropped) consumes no permit.
    pub async fn acquire(&self) -> Result<(), RateLimitExceeded> {
        let deadline = self.policy.max_wait.map(|wait| Instant::now() + wait);
        let mut grants = self.grants.lock().await;
        loop {
            let now = Instant::now();
            let ready = self.next_free_slot(&grants, now);
            if ready <= now {
                grants.push_back(now);
                if grants.len() > self.policy.calls as usize {
                    grants.pop_front();
                }
                return Ok(());
            }
            if let Some(deadline) = deadline
                && ready > deadline
            {
                return Err(RateLimitExceeded {
                    // max_wait is Some whenever deadline is.
                    max_wait: self.policy.max_wait.unwrap_or_default(),
                });
            }
            sleep_until(ready).await;
        }
    }

    /// Earliest instant at which the next grant satisfies both the window
    /// budget and the burst spacing.
    fn next_free_slot(&self, grants: &VecDeque<Instant>, now: Instant) -> Instant {
        let calls = self.policy.calls as usize;
        let burst = self.policy.burst as usize;
        let mut ready = now;

        // Window budget: the grant `calls` positions back must be at least
        // one full window old.
        if grants.len() >= calls {
            ready = ready.max(grants[grants.len() - calls] + self.policy.per);
        }

        // Burst spacing: after `burst` instantaneous grants, grants are
        // spread `per * burst / calls` apart.
        if grants.len() >= burst {
            let spacing = self.policy.per * self.policy.burst / self.policy.calls;
            ready = ready.max(grants[grants.len() - burst] + spacing);
        }

        ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn burst_defaults_to_calls() {
        let policy = LimiterPolicy::new(5, Duration::from_secs(1));
        assert_eq!(policy.burst, 5);
        assert!(policy.max_wait.is_none());
    }

    #[test]
    fn burst_is_clamped_into_range() {
        let limiter = RateLimiter::new(LimiterPolicy::new(3, Duration::from_secs(1)).with_burst(9));
        assert_eq!(limiter.policy().burst, 3);

        let limiter = RateLimiter::new(LimiterPolicy::new(3, Duration::from_secs(1)).with_burst(0));
        assert_eq!(limiter.policy().burst, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn full_burst_grants_instantly_then_waits_a_window() {
        let limiter = RateLimiter::new(LimiterPolicy::new(3, Duration::from_secs(1)));
        let start = Instant::now();

        for _ in 0..3 {
            limiter.acquire().await.unwrap();
        }
        assert_eq!(start.elapsed(), Duration::ZERO);

        limiter.acquire().await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_one_spaces_grants_evenly() {
        // 2 calls/sec with burst 1: grants land at 0, 0.5, 1.0, 1.5 seconds.
        let limiter =
            RateLimiter::new(LimiterPolicy::new(2, Duration::from_secs(1)).with_burst(1));
        let start = Instant::now();

        for _ in 0..4 {
            limiter.acquire().await.unwrap();
        }

        let elapsed = start.elapsed();
        assert!(
            elapsed >= Duration::from_millis(1500),
            "4 grants at 2/sec with burst 1 must take at least 1.5s, took {elapsed:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn serial_policy_waits_out_each_window() {
        // calls=1, burst=1 is the degenerate serial case: every grant after
        // the first waits out a full window.
        let limiter =
            RateLimiter::new(LimiterPolicy::new(1, Duration::from_secs(1)).with_burst(1));
        let start = Instant::now();

        for _ in 0..3 {
            limiter.acquire().await.unwrap();
        }

        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn sliding_window_never_overshoots_across_workers() {
        let limiter =
            Arc::new(RateLimiter::new(LimiterPolicy::new(3, Duration::from_secs(1)).with_burst(2)));
        let grant_times = Arc::new(std::sync::Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let limiter = Arc::clone(&limiter);
            let grant_times = Arc::clone(&grant_times);
            handles.push(tokio::spawn(async move {
                for _ in 0..5 {
                    limiter.acquire().await.unwrap();
                    grant_times.lock().unwrap().push(Instant::now());
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let mut times = grant_times.lock().unwrap().clone();
        times.sort();
        assert_eq!(times.len(), 20);
        // No window of length `per` may contain more than `calls` grants:
        // grant i and grant i-calls are at least one window apart.
        for i in 3..times.len() {
            assert!(
                times[i].duration_since(times[i - 3]) >= Duration::from_secs(1),
                "grants {} and {} fell inside one window",
                i - 3,
                i
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn max_wait_bound_reports_exceeded() {
        let limiter = RateLimiter::new(
            LimiterPolicy::new(1, Duration::from_secs(10)).with_max_wait(Duration::from_secs(1)),
        );
        limiter.acquire().await.unwrap();

        let err = limiter.acquire().await.unwrap_err();
        assert_eq!(err.max_wait, Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn max_wait_allows_short_waits() {
        let limiter = RateLimiter::new(
            LimiterPolicy::new(1, Duration::from_secs(1)).with_max_wait(Duration::from_secs(5)),
        );
        limiter.acquire().await.unwrap();
        // The next slot is one window away, well inside max_wait.
        limiter.acquire().await.unwrap();
    }
}
