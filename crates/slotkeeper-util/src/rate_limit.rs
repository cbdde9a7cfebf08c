//! Per-client request rate limiting

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::ClientId;

/// Requests each client may send per second before being throttled
pub const DEFAULT_REQUESTS_PER_SECOND: u32 = 30;

/// Token-bucket rate limiter keyed by IPC client
#[derive(Debug)]
pub struct RateLimiter {
    /// Maximum tokens (requests) per bucket
    max_tokens: u32,
    /// How often tokens are replenished
    refill_interval: Duration,
    clients: HashMap<ClientId, ClientBucket>,
}

#[derive(Debug)]
struct ClientBucket {
    tokens: u32,
    last_refill: Instant,
}

impl RateLimiter {
    /// Allow `max_requests` per `interval` for every client
    pub fn new(max_requests: u32, interval: Duration) -> Self {
        Self {
            max_tokens: max_requests,
            refill_interval: interval,
            clients: HashMap::new(),
        }
    }

    /// Returns `true` if the request is allowed, `false` if rate limited
    pub fn check(&mut self, client_id: &ClientId) -> bool {
        let now = Instant::now();
        let max_tokens = self.max_tokens;

        let bucket = self
            .clients
            .entry(client_id.clone())
            .or_insert(ClientBucket {
                tokens: max_tokens,
                last_refill: now,
            });

        let elapsed = now.duration_since(bucket.last_refill);
        if elapsed >= self.refill_interval {
            bucket.tokens = max_tokens;
            bucket.last_refill = now;
        }

        if bucket.tokens > 0 {
            bucket.tokens -= 1;
            true
        } else {
            false
        }
    }

    /// Forget a client's bucket (on disconnect)
    pub fn remove_client(&mut self, client_id: &ClientId) {
        self.clients.remove(client_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_within_limit() {
        let mut limiter = RateLimiter::new(5, Duration::from_secs(1));
        let client = ClientId::new();

        for _ in 0..5 {
            assert!(limiter.check(&client));
        }

        assert!(!limiter.check(&client));
    }

    #[test]
    fn clients_have_separate_buckets() {
        let mut limiter = RateLimiter::new(2, Duration::from_secs(1));
        let client1 = ClientId::new();
        let client2 = ClientId::new();

        assert!(limiter.check(&client1));
        assert!(limiter.check(&client1));
        assert!(!limiter.check(&client1));

        assert!(limiter.check(&client2));
        assert!(limiter.check(&client2));
    }

    #[test]
    fn refills_after_interval() {
        let mut limiter = RateLimiter::new(1, Duration::from_millis(20));
        let client = ClientId::new();

        assert!(limiter.check(&client));
        assert!(!limiter.check(&client));

        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.check(&client));
    }

    #[test]
    fn remove_client_drops_bucket() {
        let mut limiter = RateLimiter::new(1, Duration::from_secs(60));
        let client = ClientId::new();

        assert!(limiter.check(&client));
        assert!(!limiter.check(&client));

        // A reconnecting client starts with a full bucket
        limiter.remove_client(&client);
        assert!(limiter.check(&client));
    }
}
