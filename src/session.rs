// src/session.rs

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::{Client, Response};
use tokio::sync::Mutex;
use tokio::time::sleep;

/// HTTP client shared by the remote trade source, throttled by a token bucket.
/// Each run owns its session; there is no process-wide instance.
#[derive(Clone)]
pub struct HttpSession {
    client: Client,
    rate_limiter: Arc<Mutex<RateLimiter>>,
}

impl HttpSession {
    pub fn new(requests_per_second: u32, max_burst: u32) -> Self {
        HttpSession {
            client: Client::new(),
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new(requests_per_second, max_burst))),
        }
    }

    /// Waits until the rate limiter grants a request slot.
    pub async fn throttle(&self) {
        self.rate_limiter.lock().await.acquire().await;
    }

    pub async fn get(&self, url: &str) -> Result<Response, reqwest::Error> {
        self.throttle().await;
        self.client.get(url).send().await
    }
}

struct RateLimiter {
    tokens: u32,
    max_burst: u32,
    last_refill_time: Instant,
    refill_interval: Duration,
}

impl RateLimiter {
    fn new(requests_per_second: u32, max_burst: u32) -> Self {
        let max_burst = max_burst.max(1);
        RateLimiter {
            tokens: max_burst,
            max_burst,
            last_refill_time: Instant::now(),
            refill_interval: Duration::from_secs(1) / requests_per_second.max(1),
        }
    }

    async fn acquire(&mut self) {
        while self.tokens == 0 {
            let now = Instant::now();
            let elapsed = now - self.last_refill_time;

            if elapsed >= self.refill_interval {
                let refill_count = (elapsed.as_secs_f64() / self.refill_interval.as_secs_f64()) as u32;
                self.tokens = self.tokens.saturating_add(refill_count).min(self.max_burst);
                self.last_refill_time += self.refill_interval * refill_count;
            } else {
                sleep(self.refill_interval - elapsed).await;
            }
        }

        self.tokens -= 1;
    }
}
