//! Listener registry and dispatch.
//!
//! A listener binds a trigger to a response. Dispatch extracts a message's
//! detail once, then walks the registry in registration order and invokes
//! the response of *every* listener whose trigger matches.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::detail::MessageDetail;
use crate::error::{ChatError, ChatResult, ResponseError};
use crate::extract::extract;
use crate::fragment::ChatMessage;
use crate::trigger::{Trigger, TriggerSpec};

/// Unique identifier for a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListenerId(Uuid);

impl ListenerId {
    /// Create a new random listener id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Response invoked for a matching message.
pub type Response = Arc<dyn Fn(&MessageDetail, &ChatMessage) -> Result<(), ResponseError> + Send + Sync>;

/// A trigger paired with its response.
pub struct Listener {
    id: ListenerId,
    name: Option<String>,
    trigger: Trigger,
    response: Response,
}

impl Listener {
    /// Bundles a trigger and response under a fresh id.
    #[must_use]
    pub fn new(name: Option<String>, trigger: Trigger, response: Response) -> Self {
        Self {
            id: ListenerId::new(),
            name,
            trigger,
            response,
        }
    }

    /// Registration id.
    #[must_use]
    pub const fn id(&self) -> ListenerId {
        self.id
    }

    /// Optional rule name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The trigger guarding this listener.
    #[must_use]
    pub const fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    fn respond(&self, detail: &MessageDetail, message: &ChatMessage) -> ChatResult<()> {
        (self.response)(detail, message).map_err(|source| ChatError::Response {
            listener: self.id,
            source,
        })
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("trigger", &self.trigger)
            .finish_non_exhaustive()
    }
}

/// Ordered, append-only set of listeners.
#[derive(Debug, Default)]
pub struct Registry {
    listeners: Vec<Listener>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a listener. A trigger that is `NoMessages` can never fire, so
    /// it is dropped and `None` is returned.
    pub fn register<F>(&mut self, trigger: Trigger, response: F) -> Option<ListenerId>
    where
        F: Fn(&MessageDetail, &ChatMessage) -> Result<(), ResponseError> + Send + Sync + 'static,
    {
        self.insert(None, trigger, Arc::new(response))
    }

    /// Like `register`, with a name used in logs.
    pub fn register_named<F>(&mut self, name: impl Into<String>, trigger: Trigger, response: F) -> Option<ListenerId>
    where
        F: Fn(&MessageDetail, &ChatMessage) -> Result<(), ResponseError> + Send + Sync + 'static,
    {
        self.insert(Some(name.into()), trigger, Arc::new(response))
    }

    /// Compiles `spec` and registers it.
    pub fn register_spec<F>(&mut self, spec: &TriggerSpec, response: F) -> ChatResult<Option<ListenerId>>
    where
        F: Fn(&MessageDetail, &ChatMessage) -> Result<(), ResponseError> + Send + Sync + 'static,
    {
        let trigger = spec.compile()?;
        Ok(self.register(trigger, response))
    }

    pub(crate) fn insert(&mut self, name: Option<String>, trigger: Trigger, response: Response) -> Option<ListenerId> {
        if trigger.is_no_messages() {
            warn!(name = name.as_deref(), "dropping listener whose trigger never matches");
            return None;
        }
        let listener = Listener::new(name, trigger, response);
        let id = listener.id();
        debug!(listener = %id, name = listener.name(), trigger = %listener.trigger(), "listener registered");
        self.listeners.push(listener);
        Some(id)
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// True when no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Listeners in registration order.
    #[must_use]
    pub fn listeners(&self) -> &[Listener] {
        &self.listeners
    }

    /// Extracts `message` once and runs every matching listener.
    ///
    /// Returns the number of responses invoked. A failing response aborts
    /// the walk; listeners after it are not evaluated.
    pub fn dispatch(&self, message: &ChatMessage) -> ChatResult<usize> {
        let detail = extract(message.fragments())?;
        self.dispatch_detail(&detail, message)
    }

    /// Runs every listener matching an already extracted `detail`.
    pub fn dispatch_detail(&self, detail: &MessageDetail, message: &ChatMessage) -> ChatResult<usize> {
        let mut fired = 0;
        for listener in &self.listeners {
            if !listener.trigger.matches(detail) {
                continue;
            }
            trace!(listener = %listener.id, message = %message.id(), "trigger matched");
            listener.respond(detail, message)?;
            fired += 1;
        }
        Ok(fired)
    }
}
