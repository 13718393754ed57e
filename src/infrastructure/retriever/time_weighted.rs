//! Recency-boosted retrieval

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::node::sort_scored_nodes;
use crate::domain::retriever::Retriever;
use crate::domain::{DomainError, QueryBundle, QueryContext, ScoredNode};

pub const LAST_ACCESSED_METADATA_KEY: &str = "last_accessed_at";
pub const DEFAULT_DECAY_RATE: f32 = 0.01;

/// Source of the current time
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Adds `(1 - decay_rate) ^ hours_since_access` to each inner score.
/// Nodes without a parsable `last_accessed_at` get no boost.
#[derive(Clone)]
pub struct TimeWeightedRetriever {
    inner: Arc<dyn Retriever>,
    decay_rate: f32,
    top_k: Option<usize>,
    clock: Clock,
}

impl std::fmt::Debug for TimeWeightedRetriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeWeightedRetriever")
            .field("inner", &self.inner)
            .field("decay_rate", &self.decay_rate)
            .field("top_k", &self.top_k)
            .finish()
    }
}

impl TimeWeightedRetriever {
    pub fn new(inner: Arc<dyn Retriever>, decay_rate: f32) -> Result<Self, DomainError> {
        if !(0.0..1.0).contains(&decay_rate) {
            return Err(DomainError::invalid_config("decay_rate must be in [0, 1)"));
        }

        Ok(Self {
            inner,
            decay_rate,
            top_k: None,
            clock: Arc::new(Utc::now),
        })
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn recency(&self, node: &ScoredNode, now: DateTime<Utc>) -> f32 {
        let Some(accessed) = node
            .node
            .metadata_str(LAST_ACCESSED_METADATA_KEY)
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        else {
            return 0.0;
        };

        let hours = (now - accessed.with_timezone(&Utc)).num_seconds().max(0) as f32 / 3600.0;
        (1.0 - self.decay_rate).powf(hours)
    }
}

#[async_trait]
impl Retriever for TimeWeightedRetriever {
    async fn retrieve(
        &self,
        ctx: &QueryContext,
        query: &QueryBundle,
    ) -> Result<Vec<ScoredNode>, DomainError> {
        let now = (self.clock)();

        let mut nodes: Vec<ScoredNode> = self
            .inner
            .retrieve(ctx, query)
            .await?
            .into_iter()
            .map(|mut n| {
                n.score += self.recency(&n, now);
                n
            })
            .collect();

        sort_scored_nodes(&mut nodes);
        if let Some(top_k) = self.top_k {
            nodes.truncate(top_k);
        }
        Ok(nodes)
    }

    fn retriever_name(&self) -> &'static str {
        "time_weighted"
    }
}
