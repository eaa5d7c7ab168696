//! Error types shared by the chat and speech clients.

use thiserror::Error;

/// Failures from the outbound collaborators (chat backend, speech API, audio device).
///
/// The `Display` text of these errors is what ends up in a failed turn
/// (`"Error: <display>"`) or in a voice error notice.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("{0}")]
    Http(#[from] reqwest::Error),

    #[error("request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("{0} API key not configured")]
    MissingApiKey(&'static str),

    #[error("backend returned an empty reply")]
    EmptyReply,

    #[error("audio playback failed: {0}")]
    Audio(String),

    #[error("request task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for ChatError {
    fn from(err: tokio::task::JoinError) -> Self {
        ChatError::Task(err.to_string())
    }
}

/// Misuse of the transcript store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranscriptError {
    #[error("transcript is empty")]
    Empty,

    #[error("a pending reply must stay the last message")]
    PendingNotLast,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_display() {
        let err = ChatError::Status {
            status: 500,
            message: "model overloaded".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "request failed with status 500: model overloaded"
        );
    }

    #[test]
    fn test_missing_key_display() {
        let err = ChatError::MissingApiKey("ElevenLabs");
        assert_eq!(err.to_string(), "ElevenLabs API key not configured");
    }

    #[test]
    fn test_transcript_error_display() {
        assert_eq!(TranscriptError::Empty.to_string(), "transcript is empty");
    }
}
