pub mod ai;
pub mod app;
pub mod audio;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod handler;
pub mod logging;
pub mod narrator;
pub mod notice;
pub mod provider;
pub mod state;
pub mod tui;
pub mod ui;

// Re-export main types for convenience
pub use ai::{BackendClient, ChatBackend, GroqClient, SpeechClient, SpeechSynthesizer};
pub use audio::{AudioOutput, RodioOutput};
pub use config::Config;
pub use coordinator::{Coordinator, TurnOutcome, TurnState};
pub use error::{ChatError, TranscriptError};
pub use narrator::Narrator;
pub use provider::Provider;
pub use state::{ChatRole, HistoryEntry, Message, Transcript};
