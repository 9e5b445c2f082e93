//! In-memory transport used by the unit tests

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::api::{ChatTransport, Reply};
use crate::error::{ChatError, Result};
use crate::state::{
    AgentEvent, AgentStreamResponse, ChatRequest, ChatResponse, Citation, HealthStatus, SearchResponse,
};

#[derive(Default)]
pub(crate) struct FakeTransport {
    health: Mutex<VecDeque<Result<Reply<HealthStatus>>>>,
    chat: Mutex<VecDeque<Result<Reply<ChatResponse>>>>,
    agent: Mutex<VecDeque<Result<Reply<AgentStreamResponse>>>>,
    search: Mutex<VecDeque<Result<Reply<SearchResponse>>>>,
    requests: Mutex<Vec<ChatRequest>>,
    calls: Mutex<Vec<&'static str>>,
    hold: Mutex<Option<Arc<Notify>>>,
}

impl FakeTransport {
    pub fn push_health(&self, status: HealthStatus) {
        self.health.lock().push_back(Ok(Reply::new(status)));
    }

    pub fn push_health_err(&self, err: ChatError) {
        self.health.lock().push_back(Err(err));
    }

    pub fn push_chat_answer(&self, answer: &str, citations: Vec<Citation>) {
        self.push_chat_reply(Reply::new(ChatResponse {
            answer: answer.to_string(),
            citations,
            tool_calls: Vec::new(),
            usage: None,
        }));
    }

    pub fn push_chat_reply(&self, reply: Reply<ChatResponse>) {
        self.chat.lock().push_back(Ok(reply));
    }

    pub fn push_chat_err(&self, err: ChatError) {
        self.chat.lock().push_back(Err(err));
    }

    pub fn push_agent_events(&self, events: Vec<AgentEvent>) {
        self.agent
            .lock()
            .push_back(Ok(Reply::new(AgentStreamResponse { events })));
    }

    pub fn push_search(&self, result: Result<Reply<SearchResponse>>) {
        self.search.lock().push_back(result);
    }

    /// Make the next chat calls wait until the returned handle is notified
    pub fn hold_chat(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.hold.lock() = Some(Arc::clone(&notify));
        notify
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn health_calls(&self) -> usize {
        self.calls.lock().iter().filter(|c| **c == "health").count()
    }

    pub fn agent_calls(&self) -> usize {
        self.calls.lock().iter().filter(|c| **c == "agent").count()
    }

    fn record(&self, call: &'static str, request: Option<&ChatRequest>) {
        self.calls.lock().push(call);
        if let Some(request) = request {
            self.requests.lock().push(request.clone());
        }
    }
}

impl ChatTransport for FakeTransport {
    async fn health(&self) -> Result<Reply<HealthStatus>> {
        self.record("health", None);
        let next = self.health.lock().pop_front();
        next.unwrap_or_else(|| {
            Ok(Reply::new(HealthStatus {
                status: "healthy".to_string(),
                message: None,
                version: Some("2.0.0".to_string()),
            }))
        })
    }

    async fn chat(&self, request: &ChatRequest) -> Result<Reply<ChatResponse>> {
        self.record("chat", Some(request));
        let hold = self.hold.lock().clone();
        if let Some(hold) = hold {
            hold.notified().await;
        }
        let next = self.chat.lock().pop_front();
        next.unwrap_or_else(|| {
            Ok(Reply::new(ChatResponse {
                answer: format!("echo: {}", request.message),
                citations: Vec::new(),
                tool_calls: Vec::new(),
                usage: None,
            }))
        })
    }

    async fn agent_stream(&self, request: &ChatRequest) -> Result<Reply<AgentStreamResponse>> {
        self.record("agent", Some(request));
        let next = self.agent.lock().pop_front();
        next.unwrap_or_else(|| Ok(Reply::new(AgentStreamResponse::default())))
    }

    async fn search(&self, _query: &str) -> Result<Reply<SearchResponse>> {
        self.record("search", None);
        let next = self.search.lock().pop_front();
        next.unwrap_or_else(|| Ok(Reply::new(SearchResponse::default())))
    }
}

pub(crate) fn citation(title: &str) -> Citation {
    Citation {
        title: title.to_string(),
        content: format!("{} excerpt", title),
        url: None,
        filepath: None,
    }
}

/// Let spawned tasks (timers, background probes) run
pub(crate) async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}
