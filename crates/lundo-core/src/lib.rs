pub mod agent;
pub mod api;
pub mod config;
pub mod error;
pub mod mode;
pub mod search;
pub mod state;
pub mod store;
pub mod widget;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use agent::{process_events, tool_display, ToolDisplay, ToolIcon};
pub use api::{ChatTransport, RagClient, Reply};
pub use config::{Config, ConfigError};
pub use error::{ChatError, Result};
pub use mode::ChatMode;
pub use search::{SearchState, SearchStore};
pub use state::{
    AgentEvent, AgentStatus, ChatRequest, ChatResponse, ChatState, Citation, HealthStatus, Message,
    RateLimitInfo, Role, SearchResult, ToolCall, ToolCallStatus, TurnResult,
};
pub use store::{ChatStore, SendOutcome};
pub use widget::{PanelView, Position, ScrollTracker, ToolPill, WidgetController, WidgetView};
