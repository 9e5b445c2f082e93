//! Agent event processing
//!
//! The agent endpoint returns one batch of events per turn. Each `status`
//! event is a finished tool step, a `response` event carries the answer, and
//! an `error` event aborts the turn.

use std::borrow::Cow;

use tracing::debug;

use crate::error::{ChatError, Result};
use crate::state::{AgentEvent, AgentStatus, ToolCall, ToolCallStatus, TurnResult};

/// Fold a batch of agent events into a [`TurnResult`].
///
/// `status` is the live overlay; it is updated for every `status` event and
/// handed to `on_progress` so a front end can show tool progress as it goes.
/// An empty batch yields an empty answer, not an error.
pub fn process_events<F>(events: Vec<AgentEvent>, status: &mut AgentStatus, mut on_progress: F) -> Result<TurnResult>
where
    F: FnMut(&AgentStatus),
{
    let mut result = TurnResult::default();

    for event in events {
        match event {
            AgentEvent::Status { tool, message } => {
                let tool_call = ToolCall {
                    tool: tool.clone().unwrap_or_else(|| "unknown".to_string()),
                    status: ToolCallStatus::Completed,
                    message: message.clone(),
                };
                debug!(tool = %tool_call.tool, "agent tool step");

                status.current_tool = tool;
                status.status_message = message;
                status.tool_calls.push(tool_call.clone());
                result.tool_calls.push(tool_call);
                on_progress(status);
            }
            AgentEvent::Response { answer, citations, .. } => {
                result.answer = answer.unwrap_or_default();
                result.citations = citations.unwrap_or_default();
            }
            AgentEvent::Error { error } => {
                return Err(ChatError::Agent(error.unwrap_or_else(|| "Agent error".to_string())));
            }
            AgentEvent::Unknown => {}
        }
    }

    Ok(result)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolIcon {
    Search,
    Globe,
    User,
    Clock,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDisplay {
    pub icon: ToolIcon,
    pub label: Cow<'static, str>,
}

const TOOL_DISPLAY: &[(&str, ToolIcon, &str)] = &[
    ("RAG-search_documents", ToolIcon::Search, "Documents"),
    ("WebSearch-search_web", ToolIcon::Globe, "Web"),
    ("AboutMe-get_profile", ToolIcon::User, "Profile"),
    ("DateTime-get_current_time", ToolIcon::Clock, "Time"),
    ("DateTime-calculate_date", ToolIcon::Clock, "Date"),
    ("DateTime-days_until", ToolIcon::Clock, "Days"),
];

/// Icon and short label for a `Plugin-function` style tool identifier
pub fn tool_display(tool: &str) -> ToolDisplay {
    if let Some((_, icon, label)) = TOOL_DISPLAY.iter().find(|(name, _, _)| *name == tool) {
        return ToolDisplay {
            icon: *icon,
            label: Cow::Borrowed(*label),
        };
    }

    let label = match tool.rsplit('-').next() {
        Some(last) if !last.is_empty() => Cow::Owned(last.to_string()),
        _ => Cow::Borrowed("Tool"),
    };
    ToolDisplay {
        icon: ToolIcon::Search,
        label,
    }
}
