use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::rate_limit::{parse_rate_limit_headers, parse_retry_after};
use super::{ChatTransport, Reply};
use crate::error::{ChatError, Result};
use crate::state::{AgentStreamResponse, ChatRequest, ChatResponse, HealthStatus, SearchResponse};

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// HTTP client for the RAG / agent backend
#[derive(Clone)]
pub struct RagClient {
    client: Client,
    base_url: String,
}

impl RagClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<Reply<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        debug!(%url, "POST");

        let response = self.client.post(&url).json(body).send().await?;
        let rate_limit = parse_rate_limit_headers(response.headers());

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(rate_limited(&response));
        }

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .ok()
                .and_then(|body| body.error)
                .unwrap_or_else(|| format!("Request failed: {}", status));
            warn!(%url, status, "request failed");
            return Err(ChatError::Request { status, message });
        }

        let text = response.text().await?;
        Ok(Reply {
            body: serde_json::from_str(&text)?,
            rate_limit,
        })
    }
}

fn rate_limited(response: &Response) -> ChatError {
    let retry_after = parse_retry_after(response.headers());
    let quota = parse_rate_limit_headers(response.headers());
    warn!(retry_after, url = %response.url(), "rate limited by server");
    ChatError::RateLimited { retry_after, quota }
}

impl ChatTransport for RagClient {
    async fn health(&self) -> Result<Reply<HealthStatus>> {
        let url = self.url("/api/health");
        debug!(%url, "GET");

        let response = self.client.get(&url).send().await?;
        let rate_limit = parse_rate_limit_headers(response.headers());

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(rate_limited(&response));
        }

        if !response.status().is_success() {
            return Err(ChatError::request_failed(response.status().as_u16()));
        }

        let text = response.text().await?;
        Ok(Reply {
            body: serde_json::from_str(&text)?,
            rate_limit,
        })
    }

    async fn chat(&self, request: &ChatRequest) -> Result<Reply<ChatResponse>> {
        self.post_json("/api/chat", request).await
    }

    async fn agent_stream(&self, request: &ChatRequest) -> Result<Reply<AgentStreamResponse>> {
        self.post_json("/api/agent-stream", request).await
    }

    async fn search(&self, query: &str) -> Result<Reply<SearchResponse>> {
        self.post_json("/api/search", &SearchRequest { query })
            .await
            .map_err(|err| match err {
                ChatError::Request { status, .. } => ChatError::Request {
                    status,
                    message: format!("Search failed: {}", status),
                },
                other => other,
            })
    }
}
