//! Terminal setup and the event source for the chat loop.

use std::io::{self, Stderr};
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{
    DisableMouseCapture, EnableMouseCapture, Event, EventStream, KeyEvent, KeyEventKind, MouseEvent,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use futures_util::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::warn;

pub type Tui = Terminal<CrosstermBackend<Stderr>>;

/// Drives the pending-reply animation and the fallback reply poll.
const TICK: Duration = Duration::from_millis(150);

#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Resize,
    Tick,
    /// The request for this turn has finished.
    ReplyReady(u64),
}

/// Merges terminal input, the animation tick and reply signals from the
/// coordinator into one stream.
pub struct EventHandler {
    terminal: EventStream,
    ticks: Interval,
    replies: mpsc::UnboundedReceiver<u64>,
}

impl EventHandler {
    pub fn new(replies: mpsc::UnboundedReceiver<u64>) -> Self {
        let mut ticks = interval(TICK);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self {
            terminal: EventStream::new(),
            ticks,
            replies,
        }
    }

    /// `None` once the terminal stops delivering input.
    pub async fn next(&mut self) -> Option<AppEvent> {
        loop {
            tokio::select! {
                Some(turn) = self.replies.recv() => return Some(AppEvent::ReplyReady(turn)),
                input = self.terminal.next() => match input {
                    Some(Ok(event)) => {
                        if let Some(event) = translate(event) {
                            return Some(event);
                        }
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "terminal input failed");
                        return None;
                    }
                    None => return None,
                },
                _ = self.ticks.tick() => return Some(AppEvent::Tick),
            }
        }
    }
}

/// Key releases and focus/paste events are of no interest.
fn translate(event: Event) -> Option<AppEvent> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => Some(AppEvent::Key(key)),
        Event::Mouse(mouse) => Some(AppEvent::Mouse(mouse)),
        Event::Resize(..) => Some(AppEvent::Resize),
        _ => None,
    }
}

pub fn init() -> Result<Tui> {
    enable_raw_mode()?;
    // Mouse capture is for wheel scrolling in the transcript.
    execute!(io::stderr(), EnterAlternateScreen, EnableMouseCapture)?;
    Ok(Terminal::new(CrosstermBackend::new(io::stderr()))?)
}

pub fn restore() -> Result<()> {
    execute!(io::stderr(), DisableMouseCapture, LeaveAlternateScreen)?;
    disable_raw_mode()?;
    Ok(())
}

/// Put the terminal back before the default hook prints the panic.
pub fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = restore();
        previous(info);
    }));
}
