//! Ordered chat/message log read by the UI.

use std::collections::VecDeque;

/// Messages kept before the oldest is dropped.
pub const CHAT_CAPACITY: usize = 100;

// ---------------------------------------------------------------------------
// ChatKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    /// Server game message.
    System,
    /// Overhead chat from a nearby player.
    Public,
    /// Public chat sent with the `~` prefix.
    Broadcast,
}

// ---------------------------------------------------------------------------
// ChatMessage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub kind: ChatKind,
    /// Sender name, decorated with its rights tag. `None` for system text.
    pub sender: Option<String>,
    pub text: String,
    /// Tick the message was decoded on.
    pub tick: u64,
}

// ---------------------------------------------------------------------------
// ChatLog
// ---------------------------------------------------------------------------

/// Bounded message list, oldest first.
#[derive(Debug, Clone)]
pub struct ChatLog {
    messages: VecDeque<ChatMessage>,
    capacity: usize,
}

impl Default for ChatLog {
    fn default() -> Self {
        Self::with_capacity(CHAT_CAPACITY)
    }
}

impl ChatLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            messages: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a message, evicting the oldest once full.
    pub fn push(&mut self, message: ChatMessage) {
        if self.capacity == 0 {
            return;
        }
        while self.messages.len() >= self.capacity {
            self.messages.pop_front();
        }
        self.messages.push_back(message);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }

    pub fn latest(&self) -> Option<&ChatMessage> {
        self.messages.back()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
