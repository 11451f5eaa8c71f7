use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};

/// Pacing policy awaited before every external model call
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Wait until the next call may be made
    async fn acquire(&self);
}

/// No pacing at all
pub struct Unlimited;

#[async_trait]
impl RateLimiter for Unlimited {
    async fn acquire(&self) {}
}

/// Fixed pause between successive calls; the first call goes straight through.
pub struct ConstantDelay {
    delay: Duration,
    started: Mutex<bool>,
}

impl ConstantDelay {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            started: Mutex::new(false),
        }
    }
}

#[async_trait]
impl RateLimiter for ConstantDelay {
    async fn acquire(&self) {
        let mut started = self.started.lock().await;
        if *started {
            sleep(self.delay).await;
        }
        *started = true;
    }
}

/// A token bucket rate limiter.
///
/// Starts full at `capacity` tokens and refills at `refill_rate` tokens per
/// second. Each call consumes one token, waiting for a refill when empty.
pub struct TokenBucket {
    capacity: f64,
    refill_rate: f64,
    state: Mutex<BucketState>,
}

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    pub fn new(capacity: f64, refill_rate: f64) -> Self {
        Self {
            capacity,
            refill_rate,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }
}

#[async_trait]
impl RateLimiter for TokenBucket {
    async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let now = Instant::now();
                let elapsed = now.duration_since(state.last_refill).as_secs_f64();
                state.tokens = (state.tokens + elapsed * self.refill_rate).min(self.capacity);
                state.last_refill = now;

                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return;
                }
                Duration::try_from_secs_f64((1.0 - state.tokens) / self.refill_rate)
                    .unwrap_or(Duration::MAX)
            };
            sleep(wait).await;
        }
    }
}
