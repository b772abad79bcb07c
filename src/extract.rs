//! Message detail extraction.
//!
//! Turns a message's fragments into one `MessageDetail`. Every fragment is
//! classified by a fixed, prioritized list of shape rules; the first rule
//! that matches decides how the fragment contributes. A fragment no rule
//! recognizes fails the whole message: skipping it would silently corrupt
//! text ordering, so markup drift surfaces as `ExtractError` instead.

use crate::detail::MessageDetail;
use crate::error::ExtractError;
use crate::fragment::{
    Fragment, ALT_ATTRIBUTE, AMOUNT_ATTRIBUTE, CHEER_CLASS, EMOTE_CLASS, LINK_TOOLTIP,
    MENTION_SIGIL, MENTION_TARGET, TARGET_ATTRIBUTE, TEXT_TARGET, TOOLTIP_TYPE_ATTRIBUTE,
};

/// Recognized fragment shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentShape {
    /// Plain text.
    Text,
    /// `@username` mention.
    Mention,
    /// Named emote wrapping an image.
    Emote,
    /// Cheer emote carrying a bits amount.
    Cheer,
    /// Link; treated as plain text.
    Link,
}

type ShapeRule = (FragmentShape, fn(&Fragment) -> bool);

fn is_text(f: &Fragment) -> bool {
    f.attribute(TARGET_ATTRIBUTE) == Some(TEXT_TARGET)
}

fn is_mention(f: &Fragment) -> bool {
    f.attribute(TARGET_ATTRIBUTE) == Some(MENTION_TARGET)
}

fn is_emote(f: &Fragment) -> bool {
    f.has_class(EMOTE_CLASS)
}

fn is_cheer(f: &Fragment) -> bool {
    f.has_class(CHEER_CLASS)
}

fn is_link(f: &Fragment) -> bool {
    f.attribute(TOOLTIP_TYPE_ATTRIBUTE) == Some(LINK_TOOLTIP)
}

// Order is priority: the first matching rule wins.
const SHAPE_RULES: [ShapeRule; 5] = [
    (FragmentShape::Text, is_text),
    (FragmentShape::Mention, is_mention),
    (FragmentShape::Emote, is_emote),
    (FragmentShape::Cheer, is_cheer),
    (FragmentShape::Link, is_link),
];

impl FragmentShape {
    /// Classifies a fragment, or `None` if no shape rule recognizes it.
    #[must_use]
    pub fn classify(fragment: &Fragment) -> Option<Self> {
        SHAPE_RULES
            .iter()
            .find(|(_, test)| test(fragment))
            .map(|(shape, _)| *shape)
    }
}

/// Parses a cheer amount such as `"1,000"`.
///
/// Grouping commas are stripped; what remains must be a non-empty run of
/// ASCII digits that fits in a `u64`.
pub fn parse_cheer_amount(raw: &str) -> Result<u64, ExtractError> {
    let digits: String = raw.chars().filter(|c| *c != ',').collect();
    let invalid = || ExtractError::InvalidCheerAmount {
        amount: raw.to_string(),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    digits.parse::<u64>().map_err(|_| invalid())
}

/// Splits `@username` into `username`.
fn parse_mention(text: &str) -> Result<&str, ExtractError> {
    match text.strip_prefix(MENTION_SIGIL) {
        Some(user) if !user.is_empty() && !user.chars().any(char::is_whitespace) => Ok(user),
        _ => Err(ExtractError::MalformedMention {
            text: text.to_string(),
        }),
    }
}

#[derive(Debug, Default)]
struct DetailBuilder {
    text: String,
    text_without_emotes: String,
    emotes: Vec<String>,
    mentions: Vec<String>,
    bits: u64,
}

impl DetailBuilder {
    fn push_visible(&mut self, text: &str) {
        self.text.push_str(text);
        self.text_without_emotes.push_str(text);
    }

    fn push(&mut self, shape: FragmentShape, fragment: &Fragment) -> Result<(), ExtractError> {
        match shape {
            FragmentShape::Text | FragmentShape::Link => self.push_visible(&fragment.text),
            FragmentShape::Mention => {
                let user = parse_mention(&fragment.text)?;
                self.mentions.push(user.to_string());
                self.push_visible(&fragment.text);
            }
            FragmentShape::Emote => {
                let Some(image) = &fragment.image else {
                    return Err(ExtractError::MissingEmoteImage {
                        fragment: fragment.clone(),
                    });
                };
                self.text.push_str(&image.alt);
                self.emotes.push(image.alt.clone());
            }
            FragmentShape::Cheer => {
                // Only the amount is required; a cheer without alt adds no text.
                let alt = fragment.attribute(ALT_ATTRIBUTE).unwrap_or_default();
                let raw = fragment
                    .attribute(AMOUNT_ATTRIBUTE)
                    .ok_or_else(|| ExtractError::MissingCheerAmount {
                        fragment: fragment.clone(),
                    })?;
                let amount = parse_cheer_amount(raw)?;
                self.bits = self
                    .bits
                    .checked_add(amount)
                    .ok_or(ExtractError::BitsOverflow { amount })?;
                self.text.push_str(alt);
            }
        }
        Ok(())
    }

    fn finish(self) -> MessageDetail {
        MessageDetail::new(
            self.text,
            self.text_without_emotes,
            self.emotes,
            self.mentions,
            self.bits,
        )
    }
}

/// Extracts the detail record of a message from its fragments.
///
/// All-or-nothing: the first bad fragment fails the whole message.
pub fn extract(fragments: &[Fragment]) -> Result<MessageDetail, ExtractError> {
    let mut builder = DetailBuilder::default();
    for fragment in fragments {
        let Some(shape) = FragmentShape::classify(fragment) else {
            return Err(ExtractError::UnrecognizedFragment {
                fragment: fragment.clone(),
            });
        };
        builder.push(shape, fragment)?;
    }
    Ok(builder.finish())
}
