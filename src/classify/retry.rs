use std::time::Duration;

use tracing::warn;

use crate::error::{Error, Result, ServiceFailure};

/// Upper bound on retries for a single service call.
pub const MAX_RETRIES: u32 = 2;

/// Bounded retry with exponential backoff, applied to timeouts only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: MAX_RETRIES,
            backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(retries: u32, backoff: Duration) -> Self {
        Self {
            retries: retries.min(MAX_RETRIES),
            backoff,
        }
    }

    /// Delay before retry number `attempt` (1-based): backoff, 2x, 4x ...
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff * 2u32.saturating_pow(attempt.saturating_sub(1))
    }

    /// Run `call` until it succeeds, fails with a non-timeout error, or the
    /// retry budget runs out. The closure must resend the identical request.
    pub fn run<T>(&self, mut call: impl FnMut() -> Result<T>) -> Result<T> {
        let attempts = self.retries + 1;
        let mut attempt = 1;
        loop {
            match call() {
                Err(e) if e.is_timeout() => {
                    if attempt >= attempts {
                        return Err(Error::ClassifierServiceFailure(ServiceFailure::Timeout {
                            attempts,
                        }));
                    }
                    let delay = self.delay(attempt);
                    warn!(
                        "Classifier call timed out (attempt {attempt}/{attempts}); retrying in {}ms",
                        delay.as_millis()
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}
