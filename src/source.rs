//! Message sources and seen-tracking.
//!
//! A `MessageSource` is the page: it lists the messages currently on the
//! chat surface, and lists them again on the next call. The poll loop owns a
//! `SeenSet` so every message is handed to dispatch at most once.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::error::{ChatError, ChatResult};
use crate::fragment::{ChatMessage, MessageId};

/// Provider of raw chat messages.
pub trait MessageSource: Send {
    /// Messages currently visible, oldest first. Messages seen on earlier
    /// calls may be listed again.
    fn visible(&mut self) -> ChatResult<Vec<ChatMessage>>;
}

impl<F> MessageSource for F
where
    F: FnMut() -> ChatResult<Vec<ChatMessage>> + Send,
{
    fn visible(&mut self) -> ChatResult<Vec<ChatMessage>> {
        self()
    }
}

/// Shared in-memory chat surface.
///
/// Clones share the same buffer, so a test or an embedding host can keep one
/// handle to push messages while the watcher polls another. Messages stay
/// visible once pushed, like rendered chat lines.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    messages: Arc<Mutex<Vec<ChatMessage>>>,
}

fn lock_err() -> ChatError {
    ChatError::source_error("poisoned lock: in-memory source")
}

impl InMemorySource {
    /// Creates an empty surface.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Source pre-filled with `messages`.
    #[must_use]
    pub fn with_messages(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages: Arc::new(Mutex::new(messages)),
        }
    }

    /// Appends a message to the surface.
    pub fn push(&self, message: ChatMessage) -> ChatResult<()> {
        self.messages.lock().map_err(|_| lock_err())?.push(message);
        Ok(())
    }

    /// Number of messages on the surface.
    pub fn len(&self) -> ChatResult<usize> {
        Ok(self.messages.lock().map_err(|_| lock_err())?.len())
    }

    /// True when the surface shows no messages.
    pub fn is_empty(&self) -> ChatResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl MessageSource for InMemorySource {
    fn visible(&mut self) -> ChatResult<Vec<ChatMessage>> {
        Ok(self.messages.lock().map_err(|_| lock_err())?.clone())
    }
}

/// Identity-keyed record of messages already handed out.
#[derive(Debug, Default)]
pub struct SeenSet {
    seen: HashSet<MessageId>,
}

impl SeenSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `id` as seen. Returns false if it already was.
    pub fn mark(&mut self, id: &MessageId) -> bool {
        self.seen.insert(id.clone())
    }

    /// True if `id` was marked.
    #[must_use]
    pub fn contains(&self, id: &MessageId) -> bool {
        self.seen.contains(id)
    }

    /// Number of marked ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// True when nothing was marked yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Keeps only messages not seen before, marking them in the same pass.
    /// A message listed twice in one batch is kept once.
    pub fn take_unseen(&mut self, messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
        messages.into_iter().filter(|m| self.mark(m.id())).collect()
    }
}
