//! Transient notifications (the terminal stand-in for toasts).

use std::time::{Duration, Instant};

use tokio::sync::mpsc;

pub type NoticeSender = mpsc::UnboundedSender<Notice>;
pub type NoticeReceiver = mpsc::UnboundedReceiver<Notice>;

pub fn channel() -> (NoticeSender, NoticeReceiver) {
    mpsc::unbounded_channel()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Loading,
    Success,
    Error,
}

/// A notice update. Updates sharing an `id` replace each other, so a
/// loading notice can later turn into a success or an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: u64,
    pub kind: NoticeKind,
    pub text: String,
    /// `None` keeps the notice up until it is replaced.
    pub ttl: Option<Duration>,
}

impl Notice {
    pub fn loading(id: u64, text: impl Into<String>) -> Self {
        Self {
            id,
            kind: NoticeKind::Loading,
            text: text.into(),
            ttl: None,
        }
    }

    pub fn success(id: u64, text: impl Into<String>, ttl: Duration) -> Self {
        Self {
            id,
            kind: NoticeKind::Success,
            text: text.into(),
            ttl: Some(ttl),
        }
    }

    pub fn error(id: u64, text: impl Into<String>, ttl: Duration) -> Self {
        Self {
            id,
            kind: NoticeKind::Error,
            text: text.into(),
            ttl: Some(ttl),
        }
    }
}

#[derive(Debug)]
struct ActiveNotice {
    notice: Notice,
    expires_at: Option<Instant>,
}

/// Currently visible notices, oldest first.
#[derive(Debug, Default)]
pub struct NoticeBoard {
    active: Vec<ActiveNotice>,
}

impl NoticeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&mut self, notice: Notice, now: Instant) {
        let expires_at = notice.ttl.map(|ttl| now + ttl);
        match self.active.iter_mut().find(|a| a.notice.id == notice.id) {
            Some(existing) => {
                existing.notice = notice;
                existing.expires_at = expires_at;
            }
            None => self.active.push(ActiveNotice { notice, expires_at }),
        }
    }

    /// Drop notices whose time is up.
    pub fn expire(&mut self, now: Instant) {
        self.active
            .retain(|a| a.expires_at.map_or(true, |deadline| now < deadline));
    }

    pub fn latest(&self) -> Option<&Notice> {
        self.active.last().map(|a| &a.notice)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_replaces_by_id() {
        let mut board = NoticeBoard::new();
        let now = Instant::now();
        board.upsert(Notice::loading(1, "Generating AI Chatbot voice..."), now);
        board.upsert(
            Notice::success(1, "AI Chatbot is speaking...", Duration::from_secs(2)),
            now,
        );

        assert_eq!(board.len(), 1);
        assert_eq!(board.latest().unwrap().kind, NoticeKind::Success);
    }

    #[test]
    fn test_expire_drops_only_timed_out_notices() {
        let mut board = NoticeBoard::new();
        let now = Instant::now();
        board.upsert(Notice::loading(1, "Generating AI Chatbot voice..."), now);
        board.upsert(Notice::error(2, "Voice error", Duration::from_secs(3)), now);

        board.expire(now + Duration::from_secs(1));
        assert_eq!(board.len(), 2);

        board.expire(now + Duration::from_secs(3));
        assert_eq!(board.len(), 1);
        assert_eq!(board.latest().unwrap().id, 1);
    }
}
