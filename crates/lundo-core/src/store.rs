//! Conversation state store
//!
//! Owns the message history, citations, readiness and rate-limit flags and
//! the per-turn agent overlay. Front ends read snapshots (or subscribe to
//! changes) and drive it through `send_message`, `clear_chat` and
//! `check_health`.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::{ChatTransport, Reply};
use crate::error::ChatError;
use crate::mode::{ChatMode, ModeReply};
use crate::state::{AgentStatus, ChatRequest, ChatState, Message, RateLimitInfo, TurnResult};

pub const RATE_LIMITED_MESSAGE: &str = "Too many requests. Please wait.";
pub const NOT_CONFIGURED_MESSAGE: &str = "Chat service is not fully configured.";
pub const CONNECT_FAILED_MESSAGE: &str = "Cannot connect to server.";
pub const CONNECT_RETRY_MESSAGE: &str = "Cannot connect to server. Please try again later.";

/// What happened to a `send_message` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank input, nothing changed
    Ignored,
    /// Another turn is still in flight, nothing changed
    Busy,
    /// Blocked by the local rate-limit flag; only `error` changed
    RateLimited,
    Sent,
    Failed,
}

struct Inner<T> {
    transport: T,
    state: watch::Sender<ChatState>,
    rate_limit_timer: Mutex<Option<JoinHandle<()>>>,
}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        if let Some(timer) = self.rate_limit_timer.get_mut().take() {
            timer.abort();
        }
    }
}

/// Cheaply cloneable handle to one conversation
pub struct ChatStore<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for ChatStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: ChatTransport> ChatStore<T> {
    /// A store that has not probed the backend yet (`is_checking_health` is
    /// true until the first `check_health` finishes).
    pub fn new(transport: T) -> Self {
        let (state, _) = watch::channel(ChatState::default());
        Self {
            inner: Arc::new(Inner {
                transport,
                state,
                rate_limit_timer: Mutex::new(None),
            }),
        }
    }

    /// Create the store and kick off the initial health check in the
    /// background. Must be called inside a tokio runtime.
    pub fn start(transport: T) -> Self {
        let store = Self::new(transport);
        let probe = store.clone();
        tokio::spawn(async move { probe.check_health().await });
        store
    }

    pub fn transport(&self) -> &T {
        &self.inner.transport
    }

    pub fn snapshot(&self) -> ChatState {
        self.inner.state.borrow().clone()
    }

    /// Receiver that is notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<ChatState> {
        self.inner.state.subscribe()
    }

    pub fn mode(&self) -> ChatMode {
        self.inner.state.borrow().mode
    }

    pub fn set_mode(&self, mode: ChatMode) {
        self.inner.state.send_if_modified(|state| {
            let changed = state.mode != mode;
            state.mode = mode;
            changed
        });
    }

    pub fn set_use_agent(&self, use_agent: bool) {
        self.set_mode(ChatMode::from_use_agent(use_agent));
    }

    /// Probe `GET /api/health` and update readiness. Concurrent probes are
    /// not deduplicated.
    pub async fn check_health(&self) {
        self.inner.state.send_modify(|state| state.is_checking_health = true);

        let result = self.inner.transport.health().await;
        let mut retry_after = None;

        self.inner.state.send_modify(|state| {
            match result {
                Ok(Reply { body, rate_limit }) => {
                    let healthy = body.is_healthy();
                    info!(status = %body.status, "health check finished");
                    if rate_limit.is_some() {
                        state.rate_limit_info = rate_limit;
                    }
                    state.is_ready = healthy;
                    state.is_rate_limited = false;
                    if !healthy {
                        state.error = Some(NOT_CONFIGURED_MESSAGE.to_string());
                    }
                }
                Err(ChatError::RateLimited { retry_after: wait, quota }) => {
                    warn!(retry_after = wait, "health check rate limited");
                    mark_rate_limited(state, wait, quota);
                    state.error = Some(RATE_LIMITED_MESSAGE.to_string());
                    state.is_ready = false;
                    retry_after = Some(wait);
                }
                Err(ChatError::Request { status, .. }) => {
                    warn!(status, "health check failed");
                    state.is_ready = false;
                    state.error = Some(CONNECT_FAILED_MESSAGE.to_string());
                }
                Err(err) => {
                    warn!(error = %err, "health check could not reach server");
                    state.is_ready = false;
                    state.error = Some(CONNECT_RETRY_MESSAGE.to_string());
                }
            }
            state.is_checking_health = false;
        });

        match retry_after {
            Some(wait) => self.schedule_rate_limit_reset(wait),
            None if !self.inner.state.borrow().is_rate_limited => self.cancel_rate_limit_reset(),
            None => {}
        }
    }

    /// Run one conversation turn.
    ///
    /// The user message is appended immediately; on failure it is removed
    /// again and `error` is set. The agent overlay is idle before and after.
    pub async fn send_message(&self, text: &str) -> SendOutcome {
        match self.send_turn(text).await {
            Ok(_) => SendOutcome::Sent,
            Err(outcome) => outcome,
        }
    }

    /// Like [`send_message`](Self::send_message), but hands back the
    /// committed turn including the tool calls the agent made. `Err` carries
    /// the outcome when nothing was committed.
    pub async fn send_turn(&self, text: &str) -> std::result::Result<TurnResult, SendOutcome> {
        if text.trim().is_empty() {
            return Err(SendOutcome::Ignored);
        }

        let mut outcome = SendOutcome::Sent;
        let mut history = Vec::new();
        let mut mode = ChatMode::default();

        self.inner.state.send_if_modified(|state| {
            if state.is_loading {
                outcome = SendOutcome::Busy;
                return false;
            }
            if state.is_rate_limited {
                outcome = SendOutcome::RateLimited;
                state.error = Some(RATE_LIMITED_MESSAGE.to_string());
                return true;
            }
            history = state.messages.clone();
            mode = state.mode;
            state.is_loading = true;
            state.error = None;
            state.agent_status = AgentStatus::idle();
            state.push_message(Message::user(text));
            true
        });

        match outcome {
            SendOutcome::Busy => {
                warn!("send ignored, a turn is already in flight");
                return Err(outcome);
            }
            SendOutcome::RateLimited => {
                debug!("send blocked while rate limited");
                return Err(outcome);
            }
            _ => {}
        }

        let request = ChatRequest {
            message: text.to_string(),
            conversation_history: history,
        };
        let result = mode
            .execute(&self.inner.transport, &request, |status| {
                let status = status.clone();
                self.inner.state.send_modify(move |state| state.agent_status = status);
            })
            .await;

        match result {
            Ok(reply) => Ok(self.commit_turn(reply)),
            Err(err) => {
                self.rollback_turn(text, err);
                Err(SendOutcome::Failed)
            }
        }
    }

    fn commit_turn(&self, reply: ModeReply) -> TurnResult {
        let ModeReply { turn, rate_limit } = reply;
        debug!(citations = turn.citations.len(), tools = turn.tool_calls.len(), "turn answered");

        self.inner.state.send_modify(|state| {
            if rate_limit.is_some() {
                state.rate_limit_info = rate_limit;
            }
            state.push_message(Message::assistant(turn.answer.clone()));
            if !turn.citations.is_empty() {
                state.citations = turn.citations.clone();
            }
            finish_turn(state);
        });
        turn
    }

    fn rollback_turn(&self, text: &str, err: ChatError) {
        warn!(error = %err, "turn failed");
        let message = err.to_string();
        let retry_after = match err {
            ChatError::RateLimited { retry_after, quota } => Some((retry_after, quota)),
            _ => None,
        };

        self.inner.state.send_modify(|state| {
            if let Some((wait, quota)) = retry_after {
                mark_rate_limited(state, wait, quota);
            }
            state.error = Some(message);
            if state.messages.last().map(|m| m.content.as_str()) == Some(text) {
                state.pop_message();
            }
            finish_turn(state);
        });

        if let Some((wait, _)) = retry_after {
            self.schedule_rate_limit_reset(wait);
        }
    }

    /// Empty messages and citations. Readiness and rate limiting are kept.
    pub fn clear_chat(&self) {
        self.inner.state.send_modify(|state| {
            if !state.messages.is_empty() {
                state.clear_messages();
            }
            state.citations.clear();
            state.error = None;
            state.agent_status = AgentStatus::idle();
        });
    }

    fn schedule_rate_limit_reset(&self, retry_after: u64) {
        let inner: Weak<Inner<T>> = Arc::downgrade(&self.inner);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(retry_after)).await;
            if let Some(inner) = inner.upgrade() {
                debug!("rate limit window elapsed");
                inner.state.send_modify(|state| {
                    state.is_rate_limited = false;
                    state.error = None;
                });
            }
        });

        if let Some(previous) = self.inner.rate_limit_timer.lock().replace(timer) {
            previous.abort();
        }
    }

    fn cancel_rate_limit_reset(&self) {
        if let Some(timer) = self.inner.rate_limit_timer.lock().take() {
            timer.abort();
        }
    }
}

fn mark_rate_limited(state: &mut ChatState, retry_after: u64, quota: Option<RateLimitInfo>) {
    state.is_rate_limited = true;
    if let Some(quota) = quota {
        state.rate_limit_info = Some(RateLimitInfo {
            retry_after: Some(retry_after),
            ..quota
        });
    }
}

fn finish_turn(state: &mut ChatState) {
    state.is_loading = false;
    state.agent_status = AgentStatus::idle();
}
