pub mod rag;
pub mod rate_limit;

use std::future::Future;

use crate::error::Result;
use crate::state::{AgentStreamResponse, ChatRequest, ChatResponse, HealthStatus, RateLimitInfo, SearchResponse};

pub use rag::RagClient;
pub use rate_limit::{parse_rate_limit_headers, parse_retry_after, DEFAULT_RETRY_AFTER_SECS};

/// A decoded response body plus whatever quota headers came with it
#[derive(Debug, Clone, PartialEq)]
pub struct Reply<T> {
    pub body: T,
    pub rate_limit: Option<RateLimitInfo>,
}

impl<T> Reply<T> {
    pub fn new(body: T) -> Self {
        Self {
            body,
            rate_limit: None,
        }
    }
}

/// The backend calls the stores depend on.
///
/// [`RagClient`] talks HTTP; tests plug in in-memory fakes.
pub trait ChatTransport: Send + Sync + 'static {
    /// `GET /api/health`
    fn health(&self) -> impl Future<Output = Result<Reply<HealthStatus>>> + Send;

    /// `POST /api/chat`
    fn chat(&self, request: &ChatRequest) -> impl Future<Output = Result<Reply<ChatResponse>>> + Send;

    /// `POST /api/agent-stream`
    fn agent_stream(
        &self,
        request: &ChatRequest,
    ) -> impl Future<Output = Result<Reply<AgentStreamResponse>>> + Send;

    /// `POST /api/search`
    fn search(&self, query: &str) -> impl Future<Output = Result<Reply<SearchResponse>>> + Send;
}
