//! Token bucket guarding outbound LLM extraction calls.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::error::AppError;

#[derive(Clone)]
pub struct RateLimiter {
    rps: u32,
    state: Arc<Mutex<Bucket>>,
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last: Instant,
}

impl RateLimiter {
    pub fn new(rps: u32) -> Option<Self> {
        (rps > 0).then(|| Self {
            rps,
            state: Arc::new(Mutex::new(Bucket {
                tokens: f64::from(rps),
                last: Instant::now(),
            })),
        })
    }

    /// `RATE_LIMIT_RPS` unset, unparsable or zero disables limiting.
    pub fn from_env() -> Option<Self> {
        let rps = std::env::var("RATE_LIMIT_RPS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())?;
        Self::new(rps)
    }

    pub async fn check(&self) -> Result<(), AppError> {
        let mut bucket = self.state.lock().await;
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last);
        bucket.last = now;

        let capacity = f64::from(self.rps);
        let refill = (elapsed.as_secs_f64() * capacity).min(capacity);
        bucket.tokens = (bucket.tokens + refill).min(capacity);

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            return Ok(());
        }

        let wait = Duration::from_secs_f64((1.0 - bucket.tokens) / capacity);
        Err(AppError::RateLimited(format!(
            "extraction rate limit exceeded (RATE_LIMIT_RPS={}): try again in ~{}ms",
            self.rps,
            wait.as_millis()
        )))
    }
}
