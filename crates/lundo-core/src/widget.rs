//! Chat widget controller
//!
//! Framework-free state machine behind the chat panel: who owns the
//! open/closed flag, which body to show, when input may be submitted and
//! when the view should jump to the newest message. A front end renders
//! [`WidgetView`] and forwards user actions here.

use crate::agent::{tool_display, ToolDisplay};
use crate::state::{ChatState, Citation, ToolCallStatus};

pub const ASSISTANT_NAME: &str = "Lundo";

pub const DEFAULT_WELCOME: &str = "Hey there! I'm **Lundo**, Mert's personalized AI assistant.\n\n\
I can search through his documents, browse the web, and tell you about his work. What would you like to know?";

/// At most this many citations are shown under the conversation
pub const MAX_VISIBLE_CITATIONS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Position {
    #[default]
    BottomRight,
    BottomLeft,
}

impl Position {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "bottom-right" => Some(Position::BottomRight),
            "bottom-left" => Some(Position::BottomLeft),
            _ => None,
        }
    }
}

enum Ownership {
    /// The widget owns its open flag
    Uncontrolled { is_open: bool },
    /// A parent owns the flag and is told when the user closes the panel
    Controlled {
        is_open: bool,
        on_close: Option<Box<dyn FnMut() + Send>>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPill {
    pub display: ToolDisplay,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelView {
    CheckingHealth,
    NotReady,
    Ready {
        /// No messages yet, show the greeting
        show_welcome: bool,
        thinking: bool,
        /// Agent progress line, only while thinking
        status_message: Option<String>,
        tool_pills: Vec<ToolPill>,
        /// Plain spinner for turns without agent status
        show_spinner: bool,
        error: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetView {
    /// Controlled and closed: render nothing
    Hidden,
    /// Uncontrolled and closed: render the launcher button
    Launcher,
    Panel(PanelView),
}

pub struct WidgetController {
    ownership: Ownership,
    position: Position,
    welcome: String,
    input: String,
    cursor: usize,
}

impl WidgetController {
    pub fn uncontrolled(default_open: bool) -> Self {
        Self::with_ownership(Ownership::Uncontrolled { is_open: default_open })
    }

    pub fn controlled(is_open: bool, on_close: Option<Box<dyn FnMut() + Send>>) -> Self {
        Self::with_ownership(Ownership::Controlled { is_open, on_close })
    }

    fn with_ownership(ownership: Ownership) -> Self {
        Self {
            ownership,
            position: Position::default(),
            welcome: DEFAULT_WELCOME.to_string(),
            input: String::new(),
            cursor: 0,
        }
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    pub fn with_welcome(mut self, welcome: impl Into<String>) -> Self {
        self.welcome = welcome.into();
        self
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn welcome(&self) -> &str {
        &self.welcome
    }

    pub fn is_controlled(&self) -> bool {
        matches!(self.ownership, Ownership::Controlled { .. })
    }

    pub fn is_open(&self) -> bool {
        match self.ownership {
            Ownership::Uncontrolled { is_open } | Ownership::Controlled { is_open, .. } => is_open,
        }
    }

    /// Parent-side update of a controlled widget. Ignored when uncontrolled.
    pub fn set_open(&mut self, open: bool) {
        if let Ownership::Controlled { is_open, .. } = &mut self.ownership {
            *is_open = open;
        }
    }

    /// The user pressed the launcher. Returns whether the panel opened; a
    /// controlled widget has no launcher.
    pub fn activate_launcher(&mut self) -> bool {
        match &mut self.ownership {
            Ownership::Uncontrolled { is_open } => {
                *is_open = true;
                true
            }
            Ownership::Controlled { .. } => false,
        }
    }

    pub fn close(&mut self) {
        match &mut self.ownership {
            Ownership::Uncontrolled { is_open } => *is_open = false,
            Ownership::Controlled { on_close, .. } => {
                if let Some(on_close) = on_close {
                    on_close();
                }
            }
        }
    }

    pub fn view(&self, state: &ChatState) -> WidgetView {
        if !self.is_open() {
            return if self.is_controlled() {
                WidgetView::Hidden
            } else {
                WidgetView::Launcher
            };
        }
        WidgetView::Panel(panel_view(state))
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Cursor position in characters
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn placeholder(&self, state: &ChatState) -> &'static str {
        if state.is_ready {
            "Ask me anything..."
        } else {
            "Not ready..."
        }
    }

    /// Whether the input box accepts typing
    pub fn input_enabled(&self, state: &ChatState) -> bool {
        !state.is_loading && state.is_ready
    }

    pub fn can_submit(&self, state: &ChatState) -> bool {
        self.input_enabled(state) && !self.input.trim().is_empty()
    }

    /// Take the typed message for sending, clearing the input. Returns
    /// `None` (and keeps the input) when submission is not allowed.
    pub fn take_submission(&mut self, state: &ChatState) -> Option<String> {
        if !self.can_submit(state) {
            return None;
        }
        self.cursor = 0;
        Some(std::mem::take(&mut self.input))
    }

    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.input, self.cursor);
        self.input.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.input.chars().count() {
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.input.chars().count());
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.input.chars().count();
    }
}

fn panel_view(state: &ChatState) -> PanelView {
    if state.is_checking_health {
        return PanelView::CheckingHealth;
    }
    if !state.is_ready {
        return PanelView::NotReady;
    }

    let status = &state.agent_status;
    let tool_pills = if status.is_thinking {
        status
            .tool_calls
            .iter()
            .map(|call| ToolPill {
                display: tool_display(&call.tool),
                completed: call.status == ToolCallStatus::Completed,
            })
            .collect()
    } else {
        Vec::new()
    };

    PanelView::Ready {
        show_welcome: state.messages.is_empty(),
        thinking: status.is_thinking,
        status_message: status
            .status_message
            .clone()
            .filter(|_| status.is_thinking),
        tool_pills,
        show_spinner: state.is_loading && status.status_message.is_none(),
        error: state.error.clone(),
    }
}

pub fn visible_citations(state: &ChatState) -> &[Citation] {
    let end = state.citations.len().min(MAX_VISIBLE_CITATIONS);
    &state.citations[..end]
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Decides when the message view should jump to the newest entry: whenever
/// the message list or the live status message changed since last time.
#[derive(Debug, Default)]
pub struct ScrollTracker {
    seen: Option<(u64, Option<String>)>,
}

impl ScrollTracker {
    pub fn observe(&mut self, state: &ChatState) -> bool {
        let current = (
            state.messages_revision,
            state.agent_status.status_message.clone(),
        );
        if self.seen.as_ref() == Some(&current) {
            return false;
        }
        self.seen = Some(current);
        true
    }
}
