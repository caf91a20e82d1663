//! Short-term memory: fixed-capacity rings of recent messages and contexts.

use std::collections::VecDeque;

use crate::types::{ChatMessage, Context};

/// Oldest-first ring buffers for messages and context snapshots.
#[derive(Debug, Clone)]
pub struct ShortTermMemory {
    messages: VecDeque<ChatMessage>,
    contexts: VecDeque<Context>,
    message_capacity: usize,
    context_capacity: usize,
}

impl ShortTermMemory {
    pub fn new(message_capacity: usize, context_capacity: usize) -> Self {
        Self {
            messages: VecDeque::with_capacity(message_capacity),
            contexts: VecDeque::with_capacity(context_capacity),
            message_capacity,
            context_capacity,
        }
    }

    /// Append a message, returning the evicted oldest one when full.
    pub fn push_message(&mut self, message: ChatMessage) -> Option<ChatMessage> {
        if self.message_capacity == 0 {
            return Some(message);
        }
        let evicted = if self.messages.len() >= self.message_capacity {
            self.messages.pop_front()
        } else {
            None
        };
        self.messages.push_back(message);
        evicted
    }

    pub fn push_context(&mut self, context: Context) {
        if self.context_capacity == 0 {
            return;
        }
        if self.contexts.len() >= self.context_capacity {
            self.contexts.pop_front();
        }
        self.contexts.push_back(context);
    }

    /// All messages, oldest first.
    pub fn messages(&self) -> impl DoubleEndedIterator<Item = &ChatMessage> + ExactSizeIterator {
        self.messages.iter()
    }

    /// The last `n` messages, oldest first.
    pub fn recent(&self, n: usize) -> Vec<ChatMessage> {
        let skip = self.messages.len().saturating_sub(n);
        self.messages.iter().skip(skip).cloned().collect()
    }

    pub fn contexts(&self) -> impl Iterator<Item = &Context> {
        self.contexts.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn context_count(&self) -> usize {
        self.contexts.len()
    }

    pub fn capacity(&self) -> usize {
        self.message_capacity
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.contexts.clear();
    }
}
