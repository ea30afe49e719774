//! Token-bucket rate limiter for the provider's requests-per-minute quota.

use std::sync::Mutex;
use std::time::Duration;

use tokio::time::{self, Instant};

/// Token bucket tracking available call credits.
///
/// One token is consumed per executed operation; tokens regenerate at a
/// fixed rate up to `max_tokens`. Acquisition never errors, it only delays.
#[derive(Debug)]
pub struct TokenBucketLimiter {
    /// Bucket capacity (no burst beyond this).
    max_tokens: u32,
    /// Time to regenerate one token.
    refill_interval: Duration,
    state: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucketLimiter {
    /// Create a limiter with an explicit capacity and refill interval.
    pub fn new(max_tokens: u32, refill_interval: Duration) -> Self {
        Self {
            max_tokens,
            refill_interval,
            state: Mutex::new(BucketState {
                tokens: max_tokens as f64,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Create a limiter from a requests-per-minute quota: one token every
    /// `60000 / rpm` milliseconds, capacity `rpm`.
    pub fn per_minute(requests_per_minute: u32) -> Self {
        let rpm = requests_per_minute.max(1);
        Self::new(rpm, Duration::from_millis(60_000 / u64::from(rpm)))
    }

    /// Block cooperatively until a token is available, then consume one.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().unwrap();
                self.refill(&mut state);
                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return;
                }
                // Time until the next whole token lands.
                self.refill_interval
                    .saturating_sub(state.last_refill.elapsed())
            };
            time::sleep(wait.max(Duration::from_millis(1))).await;
        }
    }

    /// Approximate number of tokens currently available.
    pub fn available(&self) -> f64 {
        let mut state = self.state.lock().unwrap();
        self.refill(&mut state);
        state.tokens
    }

    /// Convert elapsed time into whole tokens.
    ///
    /// `last_refill` advances only by the consumed whole intervals so the
    /// fractional remainder keeps accruing toward the next token; this is
    /// what prevents drift and double counting across calls.
    fn refill(&self, state: &mut BucketState) {
        let interval_ms = self.refill_interval.as_millis().max(1);
        let whole = (state.last_refill.elapsed().as_millis() / interval_ms)
            .min(u128::from(u32::MAX)) as u32;
        if whole == 0 {
            return;
        }
        state.tokens = (state.tokens + f64::from(whole)).min(f64::from(self.max_tokens));
        state.last_refill += self.refill_interval.saturating_mul(whole);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_acquire_consumes_burst_then_paces() {
        let limiter = TokenBucketLimiter::new(2, Duration::from_millis(100));

        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        // Bucket empty: the third acquire must wait one full interval.
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(100));
        assert!(start.elapsed() < Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_nth_acquire_paced_by_refill_interval() {
        let limiter = TokenBucketLimiter::new(1, Duration::from_millis(50));
        let start = Instant::now();

        limiter.acquire().await;
        for n in 1..=4u64 {
            limiter.acquire().await;
            assert!(start.elapsed() >= Duration::from_millis(50 * n));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_burst_beyond_capacity() {
        let limiter = TokenBucketLimiter::new(3, Duration::from_millis(10));
        // Long idle must not accumulate more than max_tokens.
        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(limiter.available(), 3.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fractional_remainder_preserved() {
        let limiter = TokenBucketLimiter::new(10, Duration::from_millis(100));
        for _ in 0..10 {
            limiter.acquire().await;
        }

        // 150ms = one whole token plus a 50ms remainder.
        time::sleep(Duration::from_millis(150)).await;
        assert_eq!(limiter.available(), 1.0);

        // The remainder must count toward the next token: 50ms more
        // completes the second interval.
        time::sleep(Duration::from_millis(50)).await;
        assert_eq!(limiter.available(), 2.0);
    }
}
