// Fixed-window, per-client rate limiting with in-memory storage.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use pushgate_core::error::ApiError;
use pushgate_core::options::RateLimitOptions;

/// The client exhausted its window.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("rate limit exceeded; retry after {retry_after}s")]
pub struct RateLimited {
    /// Seconds until the window resets (rounded up).
    pub retry_after: u64,
}

impl From<RateLimited> for ApiError {
    fn from(_: RateLimited) -> Self {
        ApiError::too_many_requests()
    }
}

#[derive(Debug, Clone)]
struct RateLimitEntry {
    count: u64,
    window_start: Instant,
}

/// In-memory rate limiter using a fixed-window algorithm.
///
/// Thread-safe via `Mutex<HashMap>`; counters are per process.
#[derive(Debug)]
pub struct RateLimiter {
    enabled: bool,
    window: Duration,
    max: u64,
    store: Mutex<HashMap<String, RateLimitEntry>>,
}

impl RateLimiter {
    pub fn new(options: &RateLimitOptions) -> Self {
        Self {
            enabled: options.enabled,
            window: Duration::from_millis(options.window_ms),
            max: options.max,
            store: Mutex::new(HashMap::new()),
        }
    }

    /// Count one request from `client`.
    pub fn check(&self, client: &str) -> Result<(), RateLimited> {
        if !self.enabled {
            return Ok(());
        }

        let mut store = self.store.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();

        match store.get_mut(client) {
            Some(entry) => {
                let elapsed = now.duration_since(entry.window_start);

                if elapsed >= self.window {
                    entry.count = 1;
                    entry.window_start = now;
                    Ok(())
                } else if entry.count >= self.max {
                    let remaining = self.window - elapsed;
                    Err(RateLimited {
                        retry_after: remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0),
                    })
                } else {
                    entry.count += 1;
                    Ok(())
                }
            }
            None => {
                store.insert(
                    client.to_string(),
                    RateLimitEntry {
                        count: 1,
                        window_start: now,
                    },
                );
                Ok(())
            }
        }
    }

    /// Drop entries whose window has passed.
    pub fn cleanup(&self) {
        let mut store = self.store.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        store.retain(|_, entry| now.duration_since(entry.window_start) < self.window);
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max: u64, window_ms: u64) -> RateLimiter {
        RateLimiter::new(&RateLimitOptions {
            enabled: true,
            window_ms,
            max,
        })
    }

    #[test]
    fn test_allows_within_limit() {
        let limiter = limiter(5, 60_000);
        for _ in 0..5 {
            assert!(limiter.check("127.0.0.1").is_ok());
        }
    }

    #[test]
    fn test_blocks_over_limit() {
        let limiter = limiter(3, 60_000);
        for _ in 0..3 {
            assert!(limiter.check("127.0.0.1").is_ok());
        }
        let err = limiter.check("127.0.0.1").unwrap_err();
        assert!(err.retry_after > 0 && err.retry_after <= 60);
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = limiter(1, 60_000);
        assert!(limiter.check("127.0.0.1").is_ok());
        assert!(limiter.check("127.0.0.2").is_ok());
        assert!(limiter.check("127.0.0.1").is_err());
    }

    #[test]
    fn test_disabled() {
        let limiter = RateLimiter::new(&RateLimitOptions {
            enabled: false,
            window_ms: 1_000,
            max: 1,
        });
        for _ in 0..100 {
            assert!(limiter.check("127.0.0.1").is_ok());
        }
    }

    #[test]
    fn test_window_resets() {
        let limiter = limiter(1, 20);
        assert!(limiter.check("c").is_ok());
        assert!(limiter.check("c").is_err());
        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.check("c").is_ok());
    }

    #[test]
    fn test_cleanup_drops_expired() {
        let limiter = limiter(10, 10);
        limiter.check("c").ok();
        std::thread::sleep(Duration::from_millis(20));
        limiter.cleanup();
        assert!(limiter.store.lock().unwrap().is_empty());
    }
}
