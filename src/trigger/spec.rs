//! Serializable trigger descriptions.
//!
//! `TriggerSpec` is the data form of a trigger, used by configuration files.
//! Compiling goes through the `and`/`or` combinators so the resulting tree is
//! simplified exactly like one built in code.

use serde::{Deserialize, Serialize};

use crate::error::RegistrationError;

use super::Trigger;

/// Data description of a trigger.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerSpec {
    AllMessages,
    NoMessages,
    TextRegex {
        pattern: String,
    },
    Emote {
        name: String,
    },
    EmoteRegex {
        pattern: String,
    },
    Bits {
        threshold: u64,
    },
    Mention {
        user: String,
    },
    EmoteOnly,

    /// Every listed trigger must match (empty list matches everything).
    All {
        #[serde(default)]
        triggers: Vec<TriggerSpec>,
    },

    /// Any listed trigger must match (empty list matches nothing).
    Any {
        #[serde(default)]
        triggers: Vec<TriggerSpec>,
    },
}

impl TriggerSpec {
    /// Builds the trigger this spec describes.
    pub fn compile(&self) -> Result<Trigger, RegistrationError> {
        Ok(match self {
            Self::AllMessages => Trigger::all_messages(),
            Self::NoMessages => Trigger::no_messages(),
            Self::TextRegex { pattern } => Trigger::text_regex(pattern)?,
            Self::Emote { name } => Trigger::emote(name.clone()),
            Self::EmoteRegex { pattern } => Trigger::emote_regex(pattern)?,
            Self::Bits { threshold } => Trigger::bits(*threshold),
            Self::Mention { user } => Trigger::mention(user.clone()),
            Self::EmoteOnly => Trigger::emote_only(),
            Self::All { triggers } => Trigger::all_of(compile_all(triggers)?),
            Self::Any { triggers } => Trigger::any_of(compile_all(triggers)?),
        })
    }
}

fn compile_all(specs: &[TriggerSpec]) -> Result<Vec<Trigger>, RegistrationError> {
    specs.iter().map(TriggerSpec::compile).collect()
}
