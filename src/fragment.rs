//! Raw chat messages as scraped from the page.
//!
//! A `ChatMessage` is an ordered list of `Fragment`s, each a small piece of
//! rendered markup described by its classes, attributes, literal text and an
//! optional embedded image. The marker constants below are the chat surface's
//! markup conventions the extractor classifies fragments by.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Attribute naming the role of a text-like fragment.
pub const TARGET_ATTRIBUTE: &str = "data-a-target";
/// `TARGET_ATTRIBUTE` value of a plain text fragment.
pub const TEXT_TARGET: &str = "chat-message-text";
/// `TARGET_ATTRIBUTE` value of a mention fragment.
pub const MENTION_TARGET: &str = "chat-message-mention";
/// Class of an emote button wrapping an emote image.
pub const EMOTE_CLASS: &str = "chat-line__message--emote-button";
/// Class of a cheer emote image.
pub const CHEER_CLASS: &str = "chat-line__message--cheer-emote";
/// Attribute naming the tooltip type of a fragment.
pub const TOOLTIP_TYPE_ATTRIBUTE: &str = "data-tooltip-type";
/// `TOOLTIP_TYPE_ATTRIBUTE` value of a link fragment.
pub const LINK_TOOLTIP: &str = "link";
/// Alternate text attribute of a cheer emote.
pub const ALT_ATTRIBUTE: &str = "alt";
/// Cheered amount attribute of a cheer emote.
pub const AMOUNT_ATTRIBUTE: &str = "amount";
/// Message attribute holding the author's login name.
pub const USERNAME_ATTRIBUTE: &str = "data-a-user";
/// Sigil that starts a mention.
pub const MENTION_SIGIL: char = '@';

/// Image embedded in a fragment (emote images).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentImage {
    /// Alternate text; for emotes this is the emote's name.
    pub alt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
}

impl FragmentImage {
    /// Creates an image with the given alternate text.
    #[must_use]
    pub fn new(alt: impl Into<String>) -> Self {
        Self {
            alt: alt.into(),
            src: None,
        }
    }
}

/// One piece of a message's rendered markup.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<FragmentImage>,
}

impl Fragment {
    /// Creates an empty fragment with no markers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a class.
    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    /// Sets an attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Sets the literal text.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Embeds an image.
    #[must_use]
    pub fn with_image(mut self, image: FragmentImage) -> Self {
        self.image = Some(image);
        self
    }

    /// A plain text fragment.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::new()
            .with_attribute(TARGET_ATTRIBUTE, TEXT_TARGET)
            .with_text(text)
    }

    /// A mention fragment; `text` should include the `@`.
    #[must_use]
    pub fn mention(text: impl Into<String>) -> Self {
        Self::new()
            .with_attribute(TARGET_ATTRIBUTE, MENTION_TARGET)
            .with_text(text)
    }

    /// An emote button wrapping an image named `name`.
    #[must_use]
    pub fn emote(name: impl Into<String>) -> Self {
        Self::new()
            .with_class(EMOTE_CLASS)
            .with_image(FragmentImage::new(name))
    }

    /// A cheer emote, e.g. `cheer("Cheer100", "100")`.
    #[must_use]
    pub fn cheer(alt: impl Into<String>, amount: impl Into<String>) -> Self {
        Self::new()
            .with_class(CHEER_CLASS)
            .with_attribute(ALT_ATTRIBUTE, alt)
            .with_attribute(AMOUNT_ATTRIBUTE, amount)
    }

    /// A link fragment.
    #[must_use]
    pub fn link(text: impl Into<String>) -> Self {
        Self::new()
            .with_attribute(TOOLTIP_TYPE_ATTRIBUTE, LINK_TOOLTIP)
            .with_text(text)
    }

    /// Returns true if the fragment carries `class`.
    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Reads an attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Identity of a raw message on the chat surface.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Wraps a source-assigned identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A raw chat message: identity, message-level attributes and fragments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    id: MessageId,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    attributes: BTreeMap<String, String>,
    #[serde(default)]
    fragments: Vec<Fragment>,
}

impl ChatMessage {
    /// Creates a message with no attributes.
    #[must_use]
    pub fn new(id: impl Into<MessageId>, fragments: Vec<Fragment>) -> Self {
        Self {
            id: id.into(),
            attributes: BTreeMap::new(),
            fragments,
        }
    }

    /// Sets a message-level attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Sets the author attribute.
    #[must_use]
    pub fn with_username(self, username: impl Into<String>) -> Self {
        self.with_attribute(USERNAME_ATTRIBUTE, username)
    }

    /// Source-assigned identifier.
    #[must_use]
    pub const fn id(&self) -> &MessageId {
        &self.id
    }

    /// The rendered fragments in order.
    #[must_use]
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// Reads an arbitrary message-level attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// The author's login name, if the message carries one.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.attribute(USERNAME_ATTRIBUTE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_constructors_set_markers() {
        assert_eq!(Fragment::text("hi").attribute(TARGET_ATTRIBUTE), Some(TEXT_TARGET));
        assert_eq!(Fragment::mention("@bob").attribute(TARGET_ATTRIBUTE), Some(MENTION_TARGET));
        assert!(Fragment::emote("Kappa").has_class(EMOTE_CLASS));
        assert_eq!(
            Fragment::emote("Kappa").image.map(|i| i.alt),
            Some("Kappa".to_string())
        );
        let cheer = Fragment::cheer("Cheer100", "100");
        assert!(cheer.has_class(CHEER_CLASS));
        assert_eq!(cheer.attribute(AMOUNT_ATTRIBUTE), Some("100"));
        assert_eq!(
            Fragment::link("https://example.com").attribute(TOOLTIP_TYPE_ATTRIBUTE),
            Some(LINK_TOOLTIP)
        );
    }

    #[test]
    fn username_reads_author_attribute() {
        let msg = ChatMessage::new("m1", vec![Fragment::text("hi")]).with_username("alice");
        assert_eq!(msg.username(), Some("alice"));
        assert_eq!(msg.attribute("data-missing"), None);
    }

    #[test]
    fn chat_message_deserializes_from_json() {
        let json = r#"{
            "id": "m7",
            "attributes": {"data-a-user": "carol"},
            "fragments": [
                {"attributes": {"data-a-target": "chat-message-text"}, "text": "gg "},
                {"classes": ["chat-line__message--emote-button"], "image": {"alt": "PogChamp"}}
            ]
        }"#;
        let msg: ChatMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.id().as_str(), "m7");
        assert_eq!(msg.username(), Some("carol"));
        assert_eq!(msg.fragments()[0], Fragment::text("gg "));
        assert_eq!(msg.fragments()[1], Fragment::emote("PogChamp"));
    }
}
