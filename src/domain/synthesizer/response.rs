use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::llm::TextStream;
use crate::domain::node::{Metadata, ScoredNode};
use crate::domain::{DomainError, QueryContext};

/// Text of a response that has no answer
pub const EMPTY_RESPONSE: &str = "Empty Response";

/// Final answer with the nodes it was derived from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub response: String,
    pub source_nodes: Vec<ScoredNode>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Response {
    /// Blank text becomes `EMPTY_RESPONSE`
    pub fn new(text: impl Into<String>, source_nodes: Vec<ScoredNode>) -> Self {
        Self {
            response: normalize(text.into()),
            source_nodes,
            metadata: Metadata::new(),
        }
    }

    pub fn empty() -> Self {
        Self::new(EMPTY_RESPONSE, Vec::new())
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn text(&self) -> &str {
        &self.response
    }

    pub fn is_empty(&self) -> bool {
        self.response == EMPTY_RESPONSE
    }

    /// Sources as `> Source (Node id: ...): ...` lines, content truncated to `max_len` chars
    pub fn formatted_sources(&self, max_len: usize) -> String {
        self.source_nodes
            .iter()
            .map(|n| {
                let content: String = n.content().chars().take(max_len).collect();
                format!("> Source (Node id: {}): {}", n.id(), content)
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.response)
    }
}

fn normalize(text: String) -> String {
    if text.trim().is_empty() {
        EMPTY_RESPONSE.to_string()
    } else {
        text
    }
}

/// A response whose text arrives incrementally.
///
/// Single consumer: deltas are pulled with `next_delta`; once the stream ends the
/// full text is cached and `get_response` returns it on every later call.
pub struct StreamingResponse {
    stream: Option<TextStream>,
    buffer: String,
    text: Option<String>,
    failure: Option<DomainError>,
    source_nodes: Vec<ScoredNode>,
    metadata: Metadata,
}

impl StreamingResponse {
    pub fn new(stream: TextStream, source_nodes: Vec<ScoredNode>) -> Self {
        Self {
            stream: Some(stream),
            buffer: String::new(),
            text: None,
            failure: None,
            source_nodes,
            metadata: Metadata::new(),
        }
    }

    /// Wraps a materialized response as a single-delta stream
    pub fn from_response(response: Response) -> Self {
        let Response {
            response: text,
            source_nodes,
            metadata,
        } = response;

        let stream: TextStream = Box::pin(futures::stream::iter(vec![Ok(text)]));
        Self {
            metadata,
            ..Self::new(stream, source_nodes)
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn source_nodes(&self) -> &[ScoredNode] {
        &self.source_nodes
    }

    /// True once the stream ended successfully
    pub fn is_done(&self) -> bool {
        self.text.is_some()
    }

    /// Next text delta; `None` when the stream has ended
    pub async fn next_delta(&mut self, ctx: &QueryContext) -> Result<Option<String>, DomainError> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        if self.text.is_some() {
            return Ok(None);
        }

        let Some(stream) = self.stream.as_mut() else {
            return Err(DomainError::internal("streaming response has no stream"));
        };

        match ctx.run(async { Ok(stream.next().await) }).await {
            Ok(Some(Ok(delta))) => {
                self.buffer.push_str(&delta);
                Ok(Some(delta))
            }
            Ok(Some(Err(err))) | Err(err) => {
                self.stream = None;
                self.failure = Some(err.clone());
                Err(err)
            }
            Ok(None) => {
                self.stream = None;
                self.text = Some(normalize(std::mem::take(&mut self.buffer)));
                Ok(None)
            }
        }
    }

    /// Drains the stream and returns the complete response
    pub async fn get_response(&mut self, ctx: &QueryContext) -> Result<Response, DomainError> {
        while self.next_delta(ctx).await?.is_some() {}

        let text = self
            .text
            .clone()
            .ok_or_else(|| DomainError::internal("stream ended without text"))?;

        Ok(Response {
            response: text,
            source_nodes: self.source_nodes.clone(),
            metadata: self.metadata.clone(),
        })
    }
}

impl std::fmt::Debug for StreamingResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingResponse")
            .field("done", &self.is_done())
            .field("buffered", &self.buffer.len())
            .field("source_nodes", &self.source_nodes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::node::Node;

    fn text_stream(parts: Vec<Result<&'static str, DomainError>>) -> TextStream {
        Box::pin(futures::stream::iter(
            parts.into_iter().map(|p| p.map(str::to_string)).collect::<Vec<_>>(),
        ))
    }

    #[test]
    fn test_blank_text_is_empty_response() {
        assert_eq!(Response::new("  ", vec![]).text(), EMPTY_RESPONSE);
        assert!(Response::empty().is_empty());
        assert!(!Response::new("answer", vec![]).is_empty());
    }

    #[test]
    fn test_formatted_sources() {
        let node = ScoredNode::new(Node::with_id("n1", "abcdefgh"), 0.5);
        let response = Response::new("x", vec![node]);

        assert_eq!(response.formatted_sources(4), "> Source (Node id: n1): abcd");
    }

    #[tokio::test]
    async fn test_streaming_read_twice_is_identical() {
        let ctx = QueryContext::background();
        let mut streaming = StreamingResponse::new(text_stream(vec![Ok("Hello "), Ok("world")]), vec![]);

        let first = streaming.get_response(&ctx).await.unwrap();
        let second = streaming.get_response(&ctx).await.unwrap();

        assert_eq!(first.text(), "Hello world");
        assert_eq!(first, second);
        assert!(streaming.is_done());
    }

    #[tokio::test]
    async fn test_deltas_then_cached_text() {
        let ctx = QueryContext::background();
        let mut streaming = StreamingResponse::new(text_stream(vec![Ok("a"), Ok("b")]), vec![]);

        assert_eq!(streaming.next_delta(&ctx).await.unwrap().as_deref(), Some("a"));
        assert_eq!(streaming.next_delta(&ctx).await.unwrap().as_deref(), Some("b"));
        assert_eq!(streaming.next_delta(&ctx).await.unwrap(), None);
        assert_eq!(streaming.get_response(&ctx).await.unwrap().text(), "ab");
    }

    #[tokio::test]
    async fn test_stream_failure_is_sticky() {
        let ctx = QueryContext::background();
        let mut streaming = StreamingResponse::new(
            text_stream(vec![Ok("partial"), Err(DomainError::upstream("llm", "dropped"))]),
            vec![],
        );

        assert!(streaming.get_response(&ctx).await.is_err());
        assert!(streaming.get_response(&ctx).await.is_err());
        assert!(!streaming.is_done());
    }

    #[tokio::test]
    async fn test_from_response_keeps_sources() {
        let ctx = QueryContext::background();
        let node = ScoredNode::new(Node::with_id("n1", "text"), 1.0);
        let mut streaming = StreamingResponse::from_response(
            Response::new("done", vec![node]).with_metadata("k", "v"),
        );

        let response = streaming.get_response(&ctx).await.unwrap();

        assert_eq!(response.text(), "done");
        assert_eq!(response.source_nodes.len(), 1);
        assert_eq!(response.metadata["k"], "v");
    }

    #[tokio::test]
    async fn test_empty_stream_is_empty_response() {
        let ctx = QueryContext::background();
        let mut streaming = StreamingResponse::new(text_stream(vec![]), vec![]);

        assert_eq!(streaming.get_response(&ctx).await.unwrap().text(), EMPTY_RESPONSE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_aborts_pending_stream() {
        use std::time::Duration;

        let (ctx, handle) = QueryContext::with_cancel();
        let stream: TextStream = Box::pin(
            futures::stream::iter(vec![Ok("first ".to_string())]).chain(futures::stream::pending()),
        );
        let mut streaming = StreamingResponse::new(stream, vec![]);

        assert_eq!(streaming.next_delta(&ctx).await.unwrap().as_deref(), Some("first "));

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            handle.cancel();
        });

        let err = streaming.get_response(&ctx).await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(!streaming.is_done());
        assert!(streaming.next_delta(&ctx).await.unwrap_err().is_cancelled());
    }
}
