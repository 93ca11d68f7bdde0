//! Transient status-bar notifications

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// How long a notification stays on screen
pub const NOTIFICATION_TTL: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Info,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    created: Instant,
}

impl Notification {
    pub fn new(kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            created: Instant::now(),
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.created) >= NOTIFICATION_TTL
    }
}

/// Oldest-first queue; the front one is displayed
#[derive(Debug, Clone, Default)]
pub struct Notifications {
    queue: VecDeque<Notification>,
}

impl Notifications {
    pub fn push(&mut self, kind: NotificationKind, message: impl Into<String>) {
        self.queue.push_back(Notification::new(kind, message));
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(NotificationKind::Success, message);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(NotificationKind::Info, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(NotificationKind::Error, message);
    }

    pub fn current(&self) -> Option<&Notification> {
        self.queue.front()
    }

    pub fn dismiss(&mut self) {
        self.queue.pop_front();
    }

    /// Drop expired notifications from the front
    pub fn expire(&mut self, now: Instant) {
        while self.queue.front().is_some_and(|n| n.is_expired(now)) {
            self.queue.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
