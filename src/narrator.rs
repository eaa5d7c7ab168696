//! Reads assistant replies aloud.
//!
//! Narration is deliberately detached from the conversation: `narrate` spawns
//! a task and hands back a `JoinHandle<()>` that carries no outcome. Whatever
//! happens is reported through notices and never reaches the transcript.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::ai::SpeechSynthesizer;
use crate::audio::AudioOutput;
use crate::notice::{Notice, NoticeSender};

const SUCCESS_TTL: Duration = Duration::from_secs(2);
const ERROR_TTL: Duration = Duration::from_secs(3);

#[derive(Clone)]
pub struct Narrator {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    output: Arc<dyn AudioOutput>,
    notices: NoticeSender,
    next_id: Arc<AtomicU64>,
}

impl Narrator {
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        output: Arc<dyn AudioOutput>,
        notices: NoticeSender,
    ) -> Self {
        Self {
            synthesizer,
            output,
            notices,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn narrate(&self, text: String) -> JoinHandle<()> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let synthesizer = Arc::clone(&self.synthesizer);
        let output = Arc::clone(&self.output);
        let notices = self.notices.clone();

        tokio::spawn(async move {
            // A closed receiver just means nobody is watching; keep going.
            let _ = notices.send(Notice::loading(id, "Generating AI Chatbot voice..."));

            let result = match synthesizer.synthesize(&text).await {
                Ok(audio) => output.play(audio).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(()) => {
                    info!(notice = id, "narration started");
                    let _ = notices.send(Notice::success(
                        id,
                        "AI Chatbot is speaking...",
                        SUCCESS_TTL,
                    ));
                }
                Err(e) => {
                    warn!(notice = id, error = %e, "narration failed");
                    let text = format!("Voice error: {}", e);
                    let _ = notices.send(Notice::error(id, text, ERROR_TTL));
                }
            }
        })
    }
}

/// Test doubles shared by the narrator and coordinator tests.
#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::ChatError;

    #[derive(Default)]
    pub struct RecordingSynth {
        pub calls: Mutex<Vec<String>>,
        pub fail: bool,
    }

    #[async_trait]
    impl SpeechSynthesizer for RecordingSynth {
        async fn synthesize(&self, text: &str) -> Result<Vec<u8>, ChatError> {
            self.calls.lock().unwrap().push(text.to_string());
            if self.fail {
                Err(ChatError::Status {
                    status: 401,
                    message: "invalid key".into(),
                })
            } else {
                Ok(text.as_bytes().to_vec())
            }
        }
    }

    /// Records what it was asked to play. With `fail` set it behaves like a
    /// machine without an output device.
    #[derive(Default)]
    pub struct RecordingOutput {
        pub played: Mutex<Vec<Vec<u8>>>,
        pub fail: bool,
    }

    #[async_trait]
    impl AudioOutput for RecordingOutput {
        async fn play(&self, audio: Vec<u8>) -> Result<(), ChatError> {
            if self.fail {
                return Err(ChatError::Audio("no output device".into()));
            }
            self.played.lock().unwrap().push(audio);
            Ok(())
        }
    }
}
