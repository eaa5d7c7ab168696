use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use crate::app::{App, InputMode};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => {}
        AppEvent::Tick => {
            app.tick_animation();
        }
        AppEvent::ReplyReady(turn) => {
            app.settle_turn(turn).await;
        }
    }

    app.poll_reply().await;
    app.drain_notices();
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('i') | KeyCode::Enter => app.input_mode = InputMode::Editing,
        KeyCode::Char('v') => app.toggle_voice(),
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(),
        KeyCode::Char('G') | KeyCode::End => app.scroll_to_bottom(),
        KeyCode::Char('g') | KeyCode::Home => app.chat_scroll = 0,
        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    // Voice can be toggled without leaving the input line
    if key.code == KeyCode::Char('v') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.toggle_voice();
        return;
    }

    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            app.submit();
        }
        KeyCode::Backspace => {
            if app.cursor > 0 {
                app.cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.input.chars().count();
            if app.cursor < char_count {
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.cursor = app.cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.input.chars().count();
            app.cursor = (app.cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.cursor = 0;
        }
        KeyCode::End => {
            app.cursor = app.input.chars().count();
        }
        KeyCode::Up => app.scroll_up(),
        KeyCode::Down => app.scroll_down(),
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.input, app.cursor);
            app.input.insert(byte_pos, c);
            app.cursor += 1;
        }
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_chat = app
        .chat_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);
    if !in_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.chat_scroll = app.chat_scroll.saturating_add(3),
        MouseEventKind::ScrollUp => app.chat_scroll = app.chat_scroll.saturating_sub(3),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::ai::ChatBackend;
    use crate::coordinator::Coordinator;
    use crate::error::ChatError;
    use crate::narrator::testing::{RecordingOutput, RecordingSynth};
    use crate::narrator::Narrator;
    use crate::notice;
    use crate::provider::Provider;
    use crate::state::{HistoryEntry, Message};

    struct EchoBackend;

    #[async_trait]
    impl ChatBackend for EchoBackend {
        async fn complete(&self, history: &[HistoryEntry]) -> Result<String, ChatError> {
            Ok(format!("echo: {}", history.last().map(|h| h.content.as_str()).unwrap_or("")))
        }
    }

    fn app() -> App {
        let (tx, rx) = notice::channel();
        let narrator = Narrator::new(
            Arc::new(RecordingSynth::default()),
            Arc::new(RecordingOutput::default()),
            tx,
        );
        let coordinator = Coordinator::new(Arc::new(EchoBackend), narrator, false);
        App::new(coordinator, rx, Provider::Backend, "test".to_string())
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_key(app, key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_char_to_byte_index_multibyte() {
        assert_eq!(char_to_byte_index("héllo", 2), 3);
        assert_eq!(char_to_byte_index("héllo", 10), 6);
    }

    #[tokio::test]
    async fn test_editing_with_cursor_movement() {
        let mut app = app();
        type_text(&mut app, "hllo");
        handle_key(&mut app, key(KeyCode::Home));
        handle_key(&mut app, key(KeyCode::Right));
        type_text(&mut app, "é");
        assert_eq!(app.input, "héllo");

        handle_key(&mut app, key(KeyCode::End));
        handle_key(&mut app, key(KeyCode::Backspace));
        assert_eq!(app.input, "héll");
        assert_eq!(app.cursor, 4);
    }

    #[tokio::test]
    async fn test_enter_submits_and_reply_lands_on_tick() {
        let mut app = app();
        type_text(&mut app, "Hi");
        handle_key(&mut app, key(KeyCode::Enter));

        assert!(app.input.is_empty());
        assert_eq!(app.cursor, 0);
        assert!(app.coordinator.transcript().has_pending());

        while app.is_waiting() {
            handle_event(&mut app, AppEvent::Tick).await.unwrap();
            tokio::task::yield_now().await;
        }
        assert_eq!(
            app.coordinator.transcript().last(),
            Some(&Message::Reply("echo: Hi".to_string()))
        );
    }

    #[tokio::test]
    async fn test_reply_ready_settles_without_ticks() {
        let mut app = app();
        let mut replies = app.coordinator.subscribe_replies();
        type_text(&mut app, "Hi");
        handle_key(&mut app, key(KeyCode::Enter));

        let turn = replies.recv().await.unwrap();
        handle_event(&mut app, AppEvent::ReplyReady(turn)).await.unwrap();

        assert!(!app.is_waiting());
        assert_eq!(
            app.coordinator.transcript().last(),
            Some(&Message::Reply("echo: Hi".to_string()))
        );

        // The same signal arriving late is harmless.
        handle_event(&mut app, AppEvent::ReplyReady(turn)).await.unwrap();
        assert_eq!(app.coordinator.transcript().len(), 2);
    }

    #[tokio::test]
    async fn test_blank_enter_keeps_transcript_empty() {
        let mut app = app();
        type_text(&mut app, "   ");
        handle_key(&mut app, key(KeyCode::Enter));
        assert!(app.coordinator.transcript().is_empty());
        assert_eq!(app.input, "   ");
    }

    #[tokio::test]
    async fn test_voice_toggle_keys() {
        let mut app = app();
        assert!(!app.coordinator.voice_enabled());

        handle_key(&mut app, KeyEvent::new(KeyCode::Char('v'), KeyModifiers::CONTROL));
        assert!(app.coordinator.voice_enabled());
        assert!(app.input.is_empty());

        handle_key(&mut app, key(KeyCode::Esc));
        handle_key(&mut app, key(KeyCode::Char('v')));
        assert!(!app.coordinator.voice_enabled());
    }

    #[tokio::test]
    async fn test_quit_keys() {
        let mut app = app();
        handle_key(&mut app, key(KeyCode::Char('q')));
        assert!(!app.should_quit, "q is text while editing");

        handle_key(&mut app, key(KeyCode::Esc));
        handle_key(&mut app, key(KeyCode::Char('q')));
        assert!(app.should_quit);
    }
}
