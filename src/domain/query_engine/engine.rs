use async_trait::async_trait;
use std::fmt::Debug;

use crate::domain::node::QueryBundle;
use crate::domain::synthesizer::{Response, StreamingResponse};
use crate::domain::{DomainError, QueryContext};

/// Answers a query end to end
#[async_trait]
pub trait QueryEngine: Send + Sync + Debug {
    async fn query(&self, ctx: &QueryContext, query: &QueryBundle)
        -> Result<Response, DomainError>;

    /// Streaming variant; the default materializes the answer first
    async fn stream_query(
        &self,
        ctx: &QueryContext,
        query: &QueryBundle,
    ) -> Result<StreamingResponse, DomainError> {
        let response = self.query(ctx, query).await?;
        Ok(StreamingResponse::from_response(response))
    }

    /// Convenience for plain-text queries
    async fn query_text(&self, ctx: &QueryContext, text: &str) -> Result<Response, DomainError> {
        self.query(ctx, &QueryBundle::new(text)).await
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use crate::domain::node::ScoredNode;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    type Reply = Result<Response, DomainError>;

    /// Scripted engine: queued replies first, then the fallback
    #[derive(Debug, Default)]
    pub struct MockQueryEngine {
        replies: Mutex<VecDeque<Reply>>,
        fallback: Option<Reply>,
        queries: Mutex<Vec<String>>,
        delay: Option<Duration>,
    }

    impl MockQueryEngine {
        pub fn new() -> Self {
            Self::default()
        }

        /// Always answers `text` with the given sources
        pub fn answering(text: &str, sources: Vec<ScoredNode>) -> Self {
            Self {
                fallback: Some(Ok(Response::new(text, sources))),
                ..Self::default()
            }
        }

        /// Always fails with `error`
        pub fn failing(error: DomainError) -> Self {
            Self {
                fallback: Some(Err(error)),
                ..Self::default()
            }
        }

        pub fn with_reply(self, reply: Reply) -> Self {
            self.replies.lock().unwrap().push_back(reply);
            self
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn call_count(&self) -> usize {
            self.queries.lock().unwrap().len()
        }

        pub fn queries(&self) -> Vec<String> {
            self.queries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl QueryEngine for MockQueryEngine {
        async fn query(
            &self,
            ctx: &QueryContext,
            query: &QueryBundle,
        ) -> Result<Response, DomainError> {
            ctx.check()?;
            self.queries
                .lock()
                .unwrap()
                .push(query.query_str().to_string());

            if let Some(delay) = self.delay {
                ctx.sleep(delay).await?;
            }

            if let Some(reply) = self.replies.lock().unwrap().pop_front() {
                return reply;
            }
            self.fallback
                .clone()
                .unwrap_or_else(|| Err(DomainError::internal("no mock reply configured")))
        }
    }
}
