//! UI-agnostic conversation types
//!
//! These structures are shared by the store, the transport and any front end
//! (the terminal widget today). Wire names follow the RAG backend's JSON.

use serde::{Deserialize, Deserializer, Serialize};

use crate::mode::ChatMode;

/// A chat message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A source document backing part of an answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filepath: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCallStatus {
    Calling,
    Completed,
    Error,
}

/// One tool step reported by the agent during a turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool: String,
    pub status: ToolCallStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Per-turn overlay shown while the agent works.
///
/// Reset to [`AgentStatus::idle`] at the start and end of every send so a
/// stale "thinking" indicator never survives into the next turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentStatus {
    pub is_thinking: bool,
    pub current_tool: Option<String>,
    pub status_message: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

impl AgentStatus {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn thinking() -> Self {
        Self {
            is_thinking: true,
            current_tool: None,
            status_message: Some("Thinking...".to_string()),
            tool_calls: Vec::new(),
        }
    }
}

/// Quota metadata read from `X-RateLimit-*` and `Retry-After` headers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitInfo {
    pub limit: u32,
    pub remaining: u32,
    /// Unix seconds
    pub reset_time: u64,
    /// Seconds
    pub retry_after: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub conversation_history: Vec<Message>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// Explicit `null` reads the same as a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Body of `POST /api/chat`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub answer: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub citations: Vec<Citation>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// One server-emitted event from `POST /api/agent-stream`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AgentEvent {
    Status {
        #[serde(default)]
        tool: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
    Response {
        #[serde(default)]
        answer: Option<String>,
        #[serde(default)]
        citations: Option<Vec<Citation>>,
        #[serde(default)]
        tool_calls: Option<Vec<ToolCall>>,
    },
    Error {
        #[serde(default)]
        error: Option<String>,
    },
    /// Any event type this client does not know about
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStreamResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub events: Vec<AgentEvent>,
}

/// Body of `GET /api/health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub results: Vec<SearchResult>,
}

/// What either send strategy hands back to the store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnResult {
    pub answer: String,
    pub citations: Vec<Citation>,
    pub tool_calls: Vec<ToolCall>,
}

/// Snapshot of everything the conversation store owns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatState {
    pub messages: Vec<Message>,
    /// Bumped on every change to `messages`
    pub messages_revision: u64,
    pub citations: Vec<Citation>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub is_ready: bool,
    pub is_checking_health: bool,
    pub is_rate_limited: bool,
    pub rate_limit_info: Option<RateLimitInfo>,
    pub agent_status: AgentStatus,
    pub mode: ChatMode,
}

impl Default for ChatState {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            messages_revision: 0,
            citations: Vec::new(),
            is_loading: false,
            error: None,
            is_ready: false,
            is_checking_health: true,
            is_rate_limited: false,
            rate_limit_info: None,
            agent_status: AgentStatus::idle(),
            mode: ChatMode::default(),
        }
    }
}

impl ChatState {
    pub(crate) fn push_message(&mut self, message: Message) {
        self.messages.push(message);
        self.messages_revision += 1;
    }

    pub(crate) fn pop_message(&mut self) -> Option<Message> {
        let popped = self.messages.pop();
        if popped.is_some() {
            self.messages_revision += 1;
        }
        popped
    }

    pub(crate) fn clear_messages(&mut self) {
        self.messages.clear();
        self.messages_revision += 1;
    }
}
