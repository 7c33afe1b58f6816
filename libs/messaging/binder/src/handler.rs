//! Handlers and handler chains

use codec::Cell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_HANDLER: AtomicU64 = AtomicU64::new(1);
static NEXT_OWNER: AtomicU64 = AtomicU64::new(1);

/// Callback invoked with a dispatched message
pub type Callback = dyn Fn(&dyn Cell) + Send + Sync;

/// Process-unique handler identity; clones of a [`Handler`] share it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

impl HandlerId {
    fn next() -> Self {
        Self(NEXT_HANDLER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Identity of a party holding bindings, released together on detach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnerId(u64);

impl OwnerId {
    pub fn next() -> Self {
        Self(NEXT_OWNER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "owner-{}", self.0)
    }
}

/// Shareable callback with an identity and an optional owner
#[derive(Clone)]
pub struct Handler {
    id: HandlerId,
    owner: Option<OwnerId>,
    callback: Arc<Callback>,
}

impl Handler {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&dyn Cell) + Send + Sync + 'static,
    {
        Self {
            id: HandlerId::next(),
            owner: None,
            callback: Arc::new(callback),
        }
    }

    pub fn owned_by(mut self, owner: OwnerId) -> Self {
        self.owner = Some(owner);
        self
    }

    #[inline]
    pub fn id(&self) -> HandlerId {
        self.id
    }

    #[inline]
    pub fn owner(&self) -> Option<OwnerId> {
        self.owner
    }

    #[inline]
    pub fn call(&self, message: &dyn Cell) {
        (self.callback)(message)
    }
}

impl PartialEq for Handler {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Handler {}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .finish()
    }
}

/// Handlers resolved for one message, most-derived registrations first.
/// An empty chain means the message is unhandled.
#[derive(Debug, Clone, Default)]
pub struct HandlerChain {
    handlers: Vec<Handler>,
}

impl HandlerChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn extend_from(&mut self, handlers: &[Handler]) {
        self.handlers.extend_from_slice(handlers);
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Handler> {
        self.handlers.iter()
    }

    pub fn ids(&self) -> Vec<HandlerId> {
        self.handlers.iter().map(Handler::id).collect()
    }

    /// Call every handler in order; returns how many ran
    pub fn invoke(&self, message: &dyn Cell) -> usize {
        for handler in &self.handlers {
            handler.call(message);
        }
        self.handlers.len()
    }
}

impl<'a> IntoIterator for &'a HandlerChain {
    type Item = &'a Handler;
    type IntoIter = std::slice::Iter<'a, Handler>;

    fn into_iter(self) -> Self::IntoIter {
        self.handlers.iter()
    }
}

impl IntoIterator for HandlerChain {
    type Item = Handler;
    type IntoIter = std::vec::IntoIter<Handler>;

    fn into_iter(self) -> Self::IntoIter {
        self.handlers.into_iter()
    }
}
