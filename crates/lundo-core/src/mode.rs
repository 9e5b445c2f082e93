use tracing::debug;

use crate::agent::process_events;
use crate::api::{ChatTransport, Reply};
use crate::error::Result;
use crate::state::{AgentStatus, ChatRequest, RateLimitInfo, TurnResult};

/// How a turn is sent to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatMode {
    /// `POST /api/chat`, one answer with citations
    Simple,
    /// `POST /api/agent-stream`, tool status events then an answer
    #[default]
    Agent,
}

/// Result of running one turn with a [`ChatMode`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeReply {
    pub turn: TurnResult,
    pub rate_limit: Option<RateLimitInfo>,
}

impl ChatMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatMode::Simple => "simple",
            ChatMode::Agent => "agent",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "simple" | "chat" => Some(ChatMode::Simple),
            "agent" => Some(ChatMode::Agent),
            _ => None,
        }
    }

    pub fn all() -> Vec<ChatMode> {
        vec![ChatMode::Agent, ChatMode::Simple]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ChatMode::Simple => "Simple RAG",
            ChatMode::Agent => "Agent (tools)",
        }
    }

    pub fn from_use_agent(use_agent: bool) -> Self {
        if use_agent {
            ChatMode::Agent
        } else {
            ChatMode::Simple
        }
    }

    pub fn uses_agent(&self) -> bool {
        matches!(self, ChatMode::Agent)
    }

    /// Send one turn. `on_progress` sees every change to the live agent
    /// overlay; the simple strategy never reports progress.
    pub async fn execute<T, F>(self, transport: &T, request: &ChatRequest, mut on_progress: F) -> Result<ModeReply>
    where
        T: ChatTransport,
        F: FnMut(&AgentStatus) + Send,
    {
        debug!(mode = self.as_str(), history = request.conversation_history.len(), "sending turn");
        match self {
            ChatMode::Simple => {
                let Reply { body, rate_limit } = transport.chat(request).await?;
                Ok(ModeReply {
                    turn: TurnResult {
                        answer: body.answer,
                        citations: body.citations,
                        tool_calls: Vec::new(),
                    },
                    rate_limit,
                })
            }
            ChatMode::Agent => {
                let mut status = AgentStatus::thinking();
                on_progress(&status);

                let Reply { body, rate_limit } = transport.agent_stream(request).await?;
                let turn = process_events(body.events, &mut status, &mut on_progress)?;
                Ok(ModeReply { turn, rate_limit })
            }
        }
    }
}
