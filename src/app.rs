use std::time::Instant;

use ratatui::layout::Rect;
use tracing::warn;

use crate::config::Config;
use crate::coordinator::{Coordinator, TurnState};
use crate::notice::{NoticeBoard, NoticeReceiver};
use crate::provider::Provider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,

    // Input line
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars

    // Conversation
    pub coordinator: Coordinator,
    pub provider: Provider,
    pub backend_label: String,

    // Transient notifications
    pub notices: NoticeBoard,
    notice_rx: NoticeReceiver,

    // Chat view
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations
    pub chat_area: Option<Rect>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    /// Write the voice toggle back to the config file.
    pub persist_voice: bool,
}

impl App {
    pub fn new(
        coordinator: Coordinator,
        notice_rx: NoticeReceiver,
        provider: Provider,
        backend_label: String,
    ) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            input: String::new(),
            cursor: 0,
            coordinator,
            provider,
            backend_label,
            notices: NoticeBoard::new(),
            notice_rx,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            chat_area: None,
            animation_frame: 0,
            persist_voice: false,
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.coordinator.state() == TurnState::AwaitingReply
    }

    /// Send the input line as a new turn.
    pub fn submit(&mut self) -> bool {
        let submitted = self.coordinator.submit(&mut self.input);
        if submitted {
            self.cursor = 0;
            self.scroll_to_bottom();
        }
        submitted
    }

    pub fn toggle_voice(&mut self) {
        let enabled = self.coordinator.toggle_voice();
        if self.persist_voice {
            if let Err(e) = Config::save_voice_enabled(enabled) {
                warn!(error = %e, "could not save voice setting");
            }
        }
    }

    /// Settle a finished reply, if there is one. Returns true when the
    /// transcript changed.
    pub async fn poll_reply(&mut self) -> bool {
        if self.coordinator.poll_reply().await.is_some() {
            self.scroll_to_bottom();
            true
        } else {
            false
        }
    }

    /// Settle `turn` as soon as its request reports back.
    pub async fn settle_turn(&mut self, turn: u64) -> bool {
        if self.coordinator.settle_turn(turn).await.is_some() {
            self.scroll_to_bottom();
            true
        } else {
            false
        }
    }

    /// Pull in notice updates from narration tasks and drop expired ones.
    pub fn drain_notices(&mut self) {
        let now = Instant::now();
        while let Ok(notice) = self.notice_rx.try_recv() {
            self.notices.upsert(notice, now);
        }
        self.notices.expire(now);
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_waiting() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_down(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_add(1);
    }

    pub fn scroll_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    /// Scroll chat so the newest message is visible
    pub fn scroll_to_bottom(&mut self) {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for msg in self.coordinator.transcript().messages() {
            total_lines = total_lines.saturating_add(1); // Role line ("You:" or "AI:")
            for line in msg.text().lines() {
                // Use character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                let wrapped = if char_count == 0 { 1 } else { char_count / wrap_width + 1 };
                total_lines = total_lines.saturating_add(wrapped as u16);
            }
            total_lines = total_lines.saturating_add(1); // Blank line after message
        }

        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        self.chat_scroll = total_lines.saturating_sub(visible_height);
    }
}
