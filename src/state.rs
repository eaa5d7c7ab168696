//! UI-agnostic conversation state
//!
//! The transcript is plain data: it doesn't depend on the terminal UI or on
//! any network client, so the coordinator can be exercised without either.

use serde::{Deserialize, Serialize};

use crate::error::TranscriptError;

/// Text shown in place of an assistant reply that hasn't arrived yet.
pub const PLACEHOLDER: &str = "…";

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One entry in the conversation.
///
/// A pending reply has no text of its own, so "pending but with content"
/// can't be expressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "lowercase")]
pub enum Message {
    User(String),
    Pending,
    Reply(String),
    Failed(String),
}

impl Message {
    pub fn role(&self) -> ChatRole {
        match self {
            Message::User(_) => ChatRole::User,
            Message::Pending | Message::Reply(_) | Message::Failed(_) => ChatRole::Assistant,
        }
    }

    /// Text as it is rendered and sent back to the backend.
    pub fn text(&self) -> String {
        match self {
            Message::User(text) | Message::Reply(text) => text.clone(),
            Message::Pending => PLACEHOLDER.to_string(),
            Message::Failed(reason) => format!("Error: {}", reason),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Message::Pending)
    }
}

/// A `{role, content}` pair in the payload sent to the chat backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: ChatRole,
    pub content: String,
}

/// Ordered conversation record. Append-only, except that a trailing
/// pending reply may be replaced once.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: Message) -> Result<(), TranscriptError> {
        if self.has_pending() {
            return Err(TranscriptError::PendingNotLast);
        }
        self.messages.push(message);
        Ok(())
    }

    pub fn replace_last(&mut self, message: Message) -> Result<(), TranscriptError> {
        match self.messages.last_mut() {
            Some(last) => {
                *last = message;
                Ok(())
            }
            None => Err(TranscriptError::Empty),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Only the last message can be pending, so checking it is enough.
    pub fn has_pending(&self) -> bool {
        self.messages.last().is_some_and(Message::is_pending)
    }

    /// Build the history payload: every settled message, followed by `input`
    /// as the newest user turn.
    pub fn history_with(&self, input: &str) -> Vec<HistoryEntry> {
        self.messages
            .iter()
            .filter(|m| !m.is_pending())
            .map(|m| HistoryEntry {
                role: m.role(),
                content: m.text(),
            })
            .chain(std::iter::once(HistoryEntry {
                role: ChatRole::User,
                content: input.to_string(),
            }))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_roles_and_text() {
        assert_eq!(Message::User("hi".into()).role(), ChatRole::User);
        assert_eq!(Message::Pending.role(), ChatRole::Assistant);
        assert_eq!(Message::Pending.text(), PLACEHOLDER);
        assert_eq!(Message::Failed("timeout".into()).text(), "Error: timeout");
        assert!(!Message::Failed("timeout".into()).is_pending());
    }

    #[test]
    fn test_replace_last_on_empty_fails() {
        let mut transcript = Transcript::new();
        assert_eq!(
            transcript.replace_last(Message::Reply("x".into())),
            Err(TranscriptError::Empty)
        );
        assert!(transcript.is_empty());
    }

    #[test]
    fn test_append_after_pending_is_rejected() {
        let mut transcript = Transcript::new();
        transcript.append(Message::User("hi".into())).unwrap();
        transcript.append(Message::Pending).unwrap();

        assert_eq!(
            transcript.append(Message::User("again".into())),
            Err(TranscriptError::PendingNotLast)
        );
        assert_eq!(transcript.len(), 2);

        transcript.replace_last(Message::Reply("hello".into())).unwrap();
        assert!(!transcript.has_pending());
        transcript.append(Message::User("again".into())).unwrap();
        assert_eq!(transcript.len(), 3);
    }

    #[test]
    fn test_history_skips_pending_and_appends_input() {
        let mut transcript = Transcript::new();
        transcript.append(Message::User("Hi".into())).unwrap();
        transcript.append(Message::Failed("timeout".into())).unwrap();
        transcript.append(Message::User("Hi again".into())).unwrap();
        transcript.append(Message::Pending).unwrap();

        let history = transcript.history_with("third");
        let pairs: Vec<(ChatRole, &str)> = history
            .iter()
            .map(|h| (h.role, h.content.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (ChatRole::User, "Hi"),
                (ChatRole::Assistant, "Error: timeout"),
                (ChatRole::User, "Hi again"),
                (ChatRole::User, "third"),
            ]
        );
    }

    #[test]
    fn test_history_entry_wire_shape() {
        let entry = HistoryEntry {
            role: ChatRole::Assistant,
            content: "Hello!".into(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json, serde_json::json!({"role": "assistant", "content": "Hello!"}));
    }
}
