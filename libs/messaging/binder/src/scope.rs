//! Owner-scoped bindings
//!
//! A component that binds handlers for its own lifetime holds a
//! [`BindingScope`]: the binder plus an [`OwnerId`] stamped on every handler
//! bound through it. At teardown the component calls
//! [`BindingScope::detach`], which drops all of its bindings in one pass.
//!
//! The detached flag stays locked across check-and-bind and across
//! flag-and-detach: a bind through the scope never lands after its detach.

use crate::binder::{Binder, BindingToken};
use crate::error::{BinderError, Result};
use crate::handler::{Handler, OwnerId};
use codec::Cell;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug)]
pub struct BindingScope {
    binder: Arc<Binder>,
    owner: OwnerId,
    detached: Mutex<bool>,
}

impl BindingScope {
    pub fn new(binder: Arc<Binder>) -> Self {
        Self::with_owner(binder, OwnerId::next())
    }

    pub fn with_owner(binder: Arc<Binder>, owner: OwnerId) -> Self {
        Self {
            binder,
            owner,
            detached: Mutex::new(false),
        }
    }

    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    pub fn binder(&self) -> &Arc<Binder> {
        &self.binder
    }

    pub fn bind<F>(&self, pattern: &dyn Cell, callback: F) -> Result<BindingToken>
    where
        F: Fn(&dyn Cell) + Send + Sync + 'static,
    {
        self.bind_handler(pattern, Handler::new(callback))
    }

    /// Bind `handler` on behalf of this scope's owner
    pub fn bind_handler(&self, pattern: &dyn Cell, handler: Handler) -> Result<BindingToken> {
        let detached = self.detached.lock();
        if *detached {
            return Err(BinderError::ScopeDetached { owner: self.owner });
        }
        Ok(self.binder.bind(pattern, handler.owned_by(self.owner)))
    }

    /// Drop every binding of this owner. Later binds through the scope fail.
    /// Returns the number of bindings removed; a second call removes none.
    pub fn detach(&self) -> usize {
        let mut detached = self.detached.lock();
        if *detached {
            return 0;
        }
        *detached = true;
        let removed = self.binder.detach_owner(self.owner);
        debug!(owner = %self.owner, removed, "Binding scope detached");
        removed
    }

    pub fn is_detached(&self) -> bool {
        *self.detached.lock()
    }
}
