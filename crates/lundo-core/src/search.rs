//! Direct document search against `POST /api/search`, without a chat turn

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::rate_limit::DEFAULT_RETRY_AFTER_SECS;
use crate::api::ChatTransport;
use crate::error::ChatError;
use crate::state::SearchResult;
use crate::store::RATE_LIMITED_MESSAGE;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchState {
    pub results: Vec<SearchResult>,
    pub is_searching: bool,
    pub search_error: Option<String>,
    pub is_rate_limited: bool,
}

struct Inner<T> {
    transport: T,
    state: watch::Sender<SearchState>,
    cooldown: Mutex<Option<JoinHandle<()>>>,
}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        if let Some(timer) = self.cooldown.get_mut().take() {
            timer.abort();
        }
    }
}

pub struct SearchStore<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for SearchStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: ChatTransport> SearchStore<T> {
    pub fn new(transport: T) -> Self {
        let (state, _) = watch::channel(SearchState::default());
        Self {
            inner: Arc::new(Inner {
                transport,
                state,
                cooldown: Mutex::new(None),
            }),
        }
    }

    pub fn snapshot(&self) -> SearchState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.inner.state.subscribe()
    }

    pub async fn search(&self, query: &str) {
        if query.trim().is_empty() {
            return;
        }

        let mut blocked = false;
        self.inner.state.send_modify(|state| {
            if state.is_rate_limited {
                blocked = true;
                state.search_error = Some(RATE_LIMITED_MESSAGE.to_string());
                return;
            }
            state.is_searching = true;
            state.search_error = None;
        });
        if blocked {
            debug!("search blocked while rate limited");
            return;
        }

        let result = self.inner.transport.search(query).await;
        let mut throttled = false;

        self.inner.state.send_modify(|state| {
            match result {
                Ok(reply) => {
                    debug!(results = reply.body.results.len(), "search finished");
                    state.results = reply.body.results;
                }
                Err(err) => {
                    warn!(error = %err, "search failed");
                    let message = match err {
                        ChatError::RateLimited { .. } => {
                            throttled = true;
                            RATE_LIMITED_MESSAGE.to_string()
                        }
                        ChatError::Request { status, .. } => format!("Search failed: {}", status),
                        other => other.to_string(),
                    };
                    state.is_rate_limited |= throttled;
                    state.search_error = Some(message);
                    state.results.clear();
                }
            }
            state.is_searching = false;
        });

        if throttled {
            self.start_cooldown();
        }
    }

    pub fn clear_results(&self) {
        self.inner.state.send_modify(|state| state.results.clear());
    }

    fn start_cooldown(&self) {
        let inner: Weak<Inner<T>> = Arc::downgrade(&self.inner);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(DEFAULT_RETRY_AFTER_SECS)).await;
            if let Some(inner) = inner.upgrade() {
                inner.state.send_modify(|state| state.is_rate_limited = false);
            }
        });
        if let Some(previous) = self.inner.cooldown.lock().replace(timer) {
            previous.abort();
        }
    }
}
