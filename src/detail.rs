//! Normalized per-message detail record.
//!
//! A `MessageDetail` is produced once per raw message by the extractor and
//! is what triggers evaluate. It is immutable: fields are only readable.

use serde::{Deserialize, Serialize};

/// Extracted attributes of one chat message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDetail {
    text: String,
    text_without_emotes: String,
    emotes: Vec<String>,
    mentions: Vec<String>,
    bits: u64,
}

impl MessageDetail {
    /// Builds a detail record from already-normalized parts.
    #[must_use]
    pub fn new(
        text: impl Into<String>,
        text_without_emotes: impl Into<String>,
        emotes: Vec<String>,
        mentions: Vec<String>,
        bits: u64,
    ) -> Self {
        Self {
            text: text.into(),
            text_without_emotes: text_without_emotes.into(),
            emotes,
            mentions,
            bits,
        }
    }

    /// Full message text, emote names included.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Message text with emote and cheer names left out.
    #[must_use]
    pub fn text_without_emotes(&self) -> &str {
        &self.text_without_emotes
    }

    /// Emote names in order of appearance.
    #[must_use]
    pub fn emotes(&self) -> &[String] {
        &self.emotes
    }

    /// Mentioned usernames (without the `@`) in order of appearance.
    #[must_use]
    pub fn mentions(&self) -> &[String] {
        &self.mentions
    }

    /// Total cheered bits.
    #[must_use]
    pub const fn bits(&self) -> u64 {
        self.bits
    }

    /// True when the message carries emotes or bits and no other visible text.
    #[must_use]
    pub fn is_emote_only(&self) -> bool {
        (!self.emotes.is_empty() || self.bits > 0)
            && self.text_without_emotes.chars().all(char::is_whitespace)
    }
}
