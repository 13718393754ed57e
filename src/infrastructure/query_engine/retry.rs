//! Fixed-delay retries around another engine

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::RetrySettings;
use crate::domain::query_engine::QueryEngine;
use crate::domain::{DomainError, QueryBundle, QueryContext, Response};
use crate::infrastructure::observability::record_retry_attempt;

const ENGINE_NAME: &str = "retry";

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Calls the inner engine up to `max_retries + 1` times, sleeping a fixed delay
/// between attempts. Non-retryable errors and cancellation end the loop at once.
#[derive(Debug, Clone)]
pub struct RetryQueryEngine {
    inner: Arc<dyn QueryEngine>,
    max_retries: u32,
    delay: Duration,
    wrap_errors: bool,
}

impl RetryQueryEngine {
    pub fn new(inner: Arc<dyn QueryEngine>) -> Self {
        Self {
            inner,
            max_retries: DEFAULT_MAX_RETRIES,
            delay: DEFAULT_RETRY_DELAY,
            wrap_errors: false,
        }
    }

    pub fn from_settings(inner: Arc<dyn QueryEngine>, settings: &RetrySettings) -> Self {
        Self::new(inner)
            .with_max_retries(settings.max_retries)
            .with_delay(settings.delay())
            .with_wrapped_errors(settings.wrap_errors)
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Report the final failure as `MaxRetriesExceeded` instead of the bare error
    pub fn with_wrapped_errors(mut self, wrap_errors: bool) -> Self {
        self.wrap_errors = wrap_errors;
        self
    }

    fn give_up(&self, attempts: u32, err: DomainError) -> DomainError {
        if self.wrap_errors && !err.is_cancelled() {
            DomainError::max_retries_exceeded(attempts, err)
        } else {
            err
        }
    }
}

#[async_trait]
impl QueryEngine for RetryQueryEngine {
    async fn query(&self, ctx: &QueryContext, query: &QueryBundle) -> Result<Response, DomainError> {
        let mut attempt: u32 = 0;

        loop {
            ctx.check()?;
            attempt += 1;

            let err = match ctx.run(self.inner.query(ctx, query)).await {
                Ok(response) => {
                    if attempt > 1 {
                        debug!(attempt, "Query succeeded after retry");
                    }
                    return Ok(response);
                }
                Err(err) => err,
            };

            if err.is_cancelled() {
                return Err(err);
            }
            if !err.is_retryable() || attempt > self.max_retries {
                warn!(attempts = attempt, error = %err, "Giving up on query");
                return Err(self.give_up(attempt, err));
            }

            warn!(
                attempt,
                max_retries = self.max_retries,
                delay_ms = self.delay.as_millis() as u64,
                error = %err,
                "Query failed, retrying"
            );
            record_retry_attempt(ENGINE_NAME);
            ctx.sleep(self.delay).await?;
        }
    }
}
