use huddle_core::ParticipantId;
use std::collections::VecDeque;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch, the timestamp unit on the wire.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    pub from: ParticipantId,
    pub message: String,
    pub timestamp: u64,
}

/// Bounded chat history in arrival order. The oldest entry is dropped when full.
#[derive(Debug)]
pub struct ChatLog {
    entries: VecDeque<ChatEntry>,
    capacity: usize,
}

impl ChatLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, entry: ChatEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn entries(&self) -> impl Iterator<Item = &ChatEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionEntry {
    pub from: ParticipantId,
    pub kind: String,
    pub timestamp: u64,
}

/// Short-lived reactions; each one expires `ttl` after its timestamp.
#[derive(Debug)]
pub struct ReactionLog {
    entries: VecDeque<ReactionEntry>,
    capacity: usize,
    ttl: Duration,
}

impl ReactionLog {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
            ttl,
        }
    }

    pub fn push(&mut self, entry: ReactionEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Drop expired reactions. `now` is in epoch milliseconds.
    pub fn prune(&mut self, now: u64) -> usize {
        let ttl = self.ttl.as_millis() as u64;
        let before = self.entries.len();
        self.entries
            .retain(|r| r.timestamp.saturating_add(ttl) > now);
        before - self.entries.len()
    }

    pub fn active(&self) -> impl Iterator<Item = &ReactionEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
