use futures_util::FutureExt;
use lundo_core::{ChatMode, ChatState, ChatStore, RagClient, ScrollTracker, SendOutcome, WidgetController};
use ratatui::layout::Rect;
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub struct App {
    pub should_quit: bool,

    pub store: ChatStore<RagClient>,
    pub widget: WidgetController,
    /// Latest store snapshot, refreshed on every event
    pub chat: ChatState,

    // Message view scrolling
    pub scroll_tracker: ScrollTracker,
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of message area for scroll calculations
    pub chat_width: u16,  // Width of message area for wrap calculations
    pub chat_area: Option<Rect>,

    pub send_task: Option<JoinHandle<SendOutcome>>,

    // Spinner frame for "Connecting..." and "Thinking..."
    pub animation_frame: usize,
}

impl App {
    pub fn new(store: ChatStore<RagClient>, widget: WidgetController) -> Self {
        let chat = store.snapshot();
        Self {
            should_quit: false,
            store,
            widget,
            chat,
            scroll_tracker: ScrollTracker::default(),
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            chat_area: None,
            send_task: None,
            animation_frame: 0,
        }
    }

    /// Pull the latest store state and follow new messages / status lines
    pub fn refresh(&mut self) {
        self.chat = self.store.snapshot();
        if self.scroll_tracker.observe(&self.chat) {
            self.scroll_to_bottom();
        }
        self.reap_send_task();
    }

    fn reap_send_task(&mut self) {
        let finished = self.send_task.as_ref().is_some_and(|task| task.is_finished());
        if !finished {
            return;
        }
        if let Some(task) = self.send_task.take() {
            if let Some(Ok(outcome)) = task.now_or_never() {
                debug!(?outcome, "send task finished");
            }
        }
    }

    pub fn submit(&mut self) {
        let Some(text) = self.widget.take_submission(&self.chat) else {
            return;
        };
        let store = self.store.clone();
        self.send_task = Some(tokio::spawn(async move { store.send_message(&text).await }));
    }

    pub fn retry_health(&self) {
        let store = self.store.clone();
        tokio::spawn(async move { store.check_health().await });
    }

    pub fn clear_chat(&mut self) {
        self.store.clear_chat();
        self.chat_scroll = 0;
        self.refresh();
    }

    pub fn toggle_mode(&mut self) {
        let next = match self.store.mode() {
            ChatMode::Agent => ChatMode::Simple,
            ChatMode::Simple => ChatMode::Agent,
        };
        info!(mode = next.as_str(), "switched chat mode");
        self.store.set_mode(next);
        self.refresh();
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.chat.is_loading || self.chat.is_checking_health {
            self.animation_frame = self.animation_frame.wrapping_add(1);
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max = self.total_chat_lines().saturating_sub(self.visible_height());
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max);
    }

    /// Scroll so the newest message and any status line are visible
    pub fn scroll_to_bottom(&mut self) {
        let total_lines = self.total_chat_lines();
        let visible_height = self.visible_height();
        self.chat_scroll = total_lines.saturating_sub(visible_height);
    }

    fn visible_height(&self) -> u16 {
        if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        }
    }

    /// Rough wrapped line count of the message view, saturating at `u16::MAX`
    fn total_chat_lines(&self) -> u16 {
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let count = |text: &str| -> usize {
            text.lines()
                .map(|line| {
                    // Character count, not byte length, for UTF-8
                    let chars = line.chars().count();
                    if chars == 0 {
                        1
                    } else {
                        chars / wrap_width + 1
                    }
                })
                .sum()
        };

        let mut total: usize = 0;
        if self.chat.messages.is_empty() {
            total += 2 + count(self.widget.welcome());
        }
        for msg in &self.chat.messages {
            // Role line, content, blank line after
            total += 2 + count(&msg.content);
        }

        // Status line, tool pills, spinner
        if self.chat.is_loading {
            total += 3;
        }
        if let Some(error) = &self.chat.error {
            total += count(error) + 1;
        }
        u16::try_from(total).unwrap_or(u16::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lundo_core::Message;

    fn app() -> App {
        let store = ChatStore::new(RagClient::new("http://127.0.0.1:9"));
        App::new(store, WidgetController::uncontrolled(true))
    }

    #[tokio::test]
    async fn test_scroll_down_is_clamped() {
        let mut app = app();
        app.chat_height = 5;
        app.scroll_down(100);
        assert_eq!(app.chat_scroll, app.total_chat_lines().saturating_sub(5));
        app.scroll_up(100);
        assert_eq!(app.chat_scroll, 0);
    }

    #[tokio::test]
    async fn test_huge_transcript_line_count_saturates() {
        let mut app = app();
        app.chat.messages = vec![
            Message::user("\n".repeat(40_000)),
            Message::assistant("x".repeat(50 * 40_000)),
        ];
        assert_eq!(app.total_chat_lines(), u16::MAX);
        app.scroll_to_bottom();
        assert_eq!(app.chat_scroll, u16::MAX - 20);
    }

    #[tokio::test]
    async fn test_submit_ignored_when_not_ready() {
        let mut app = app();
        app.widget.insert_char('h');
        app.submit();
        assert!(app.send_task.is_none());
        assert_eq!(app.widget.input(), "h");
    }

    #[tokio::test]
    async fn test_toggle_mode() {
        let mut app = app();
        assert_eq!(app.chat.mode, ChatMode::Agent);
        app.toggle_mode();
        assert_eq!(app.chat.mode, ChatMode::Simple);
    }
}
