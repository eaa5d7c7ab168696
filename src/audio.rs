//! Audio output for narrated replies.

use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use async_trait::async_trait;
use rodio::{Decoder, OutputStream, Sink};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::ChatError;

/// Plays encoded audio. `play` resolves once playback has *started*; the
/// sound keeps going in the background.
#[async_trait]
pub trait AudioOutput: Send + Sync {
    async fn play(&self, audio: Vec<u8>) -> Result<(), ChatError>;
}

/// Default output device through rodio.
#[derive(Debug, Default, Clone)]
pub struct RodioOutput {
    playing: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl RodioOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until every sound started so far has finished. Used by the
    /// one-shot commands, which would otherwise exit mid-sentence.
    pub fn wait_until_done(&self) {
        let handles = match self.playing.lock() {
            Ok(mut playing) => std::mem::take(&mut *playing),
            Err(_) => return,
        };
        for handle in handles {
            let _ = handle.join();
        }
    }
}

#[async_trait]
impl AudioOutput for RodioOutput {
    async fn play(&self, audio: Vec<u8>) -> Result<(), ChatError> {
        let (started_tx, started_rx) = oneshot::channel();

        // The output stream isn't Send; it has to live on its own thread
        // until the sink drains.
        let handle = std::thread::Builder::new()
            .name("voicechat-audio".to_string())
            .spawn(move || {
                let (_stream, stream_handle) = match OutputStream::try_default() {
                    Ok(pair) => pair,
                    Err(e) => {
                        let _ = started_tx.send(Err(ChatError::Audio(e.to_string())));
                        return;
                    }
                };
                let sink = match Sink::try_new(&stream_handle) {
                    Ok(sink) => sink,
                    Err(e) => {
                        let _ = started_tx.send(Err(ChatError::Audio(e.to_string())));
                        return;
                    }
                };
                let source = match Decoder::new(Cursor::new(audio)) {
                    Ok(source) => source,
                    Err(e) => {
                        let _ = started_tx.send(Err(ChatError::Audio(e.to_string())));
                        return;
                    }
                };

                sink.append(source);
                let _ = started_tx.send(Ok(()));
                sink.sleep_until_end();
                debug!("playback finished");
            })
            .map_err(|e| ChatError::Audio(e.to_string()))?;

        if let Ok(mut playing) = self.playing.lock() {
            playing.retain(|h| !h.is_finished());
            playing.push(handle);
        }

        match started_rx.await {
            Ok(result) => result,
            Err(_) => {
                warn!("audio thread exited without reporting");
                Err(ChatError::Audio("audio thread exited".to_string()))
            }
        }
    }
}
