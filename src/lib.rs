//! # chatreact - reactive rules for scraped chat
//!
//! chatreact watches a live chat surface, turns each new message's rendered
//! markup into a normalized record and runs every listener whose trigger
//! matches it.
//!
//! ## Core Concepts
//!
//! - **Fragment**: one piece of a message's markup (text, mention, emote, cheer, link)
//! - **MessageDetail**: the normalized record extracted from a message's fragments
//! - **Trigger**: a composable predicate over a detail, simplified as it is combined
//! - **Listener**: a trigger paired with a response
//! - **ChatWatcher**: the poll loop that feeds new messages to the listeners
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chatreact::{ChatWatcher, InMemorySource, Trigger};
//!
//! let source = InMemorySource::new();
//! let mut watcher = ChatWatcher::new(source.clone());
//!
//! let hype = Trigger::bits(100) | Trigger::emote("PogChamp");
//! watcher.add_listener(hype & Trigger::mention("streamer"), |detail, message| {
//!     println!("{:?}: {}", message.username(), detail.text());
//!     Ok(())
//! })?;
//! watcher.start()?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod config;
pub mod detail;
pub mod error;
pub mod extract;
pub mod fragment;
pub mod listener;
pub mod source;
pub mod trigger;
pub mod watcher;

pub use config::{RuleConfig, WatcherConfig};
pub use detail::MessageDetail;
pub use error::{ChatError, ChatResult, ExtractError, RegistrationError, ResponseError};
pub use extract::{extract, parse_cheer_amount, FragmentShape};
pub use fragment::{ChatMessage, Fragment, FragmentImage, MessageId};
pub use listener::{Listener, ListenerId, Registry, Response};
pub use source::{InMemorySource, MessageSource, SeenSet};
pub use trigger::{Trigger, TriggerKind, TriggerSpec};
pub use watcher::{ChatWatcher, TickReport};
