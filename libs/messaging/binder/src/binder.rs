//! # Binder
//!
//! ## Purpose
//!
//! Registry of `(pattern message, handler)` bindings and the resolver that
//! turns an incoming message into its ordered handler chain.
//!
//! ## Two-Stage Matching
//!
//! ```text
//! message (Extended, touched {x, z})
//!   │ walk type chain: Extended → Base → Event
//!   ▼
//! stage 1: slots of the type id, sorted by fingerprint
//!          keep slots whose pattern ⊆ message fingerprint
//!   ▼
//! stage 2: hash the message's values under the slot pattern, then compare
//!          the bound instance against the message on exactly those bits
//!   ▼
//! chain: [Extended handlers..., Base handlers..., Event handlers...]
//! ```
//!
//! Within one type, slots contribute in ascending fingerprint order, so an
//! unconstrained binding precedes a constrained one.
//!
//! ## Locking
//!
//! One `parking_lot::RwLock` guards the whole registry. Resolution takes the
//! read lock and runs concurrently; bind, unbind and detach take the write
//! lock. Handlers are invoked after the lock is released.

use crate::handler::{Handler, HandlerChain, HandlerId, OwnerId};
use crate::slot::{Added, Slot};
use codec::{Cell, CellExt};
use config::BinderConfig;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, trace};
use types::Fingerprint;

/// Receipt for one binding, needed to remove it again
#[derive(Debug, Clone)]
pub struct BindingToken {
    type_id: u32,
    pattern: Box<dyn Cell>,
    handler: HandlerId,
}

impl BindingToken {
    pub fn type_id(&self) -> u32 {
        self.type_id
    }

    pub fn handler(&self) -> HandlerId {
        self.handler
    }

    pub fn pattern(&self) -> &dyn Cell {
        self.pattern.as_ref()
    }
}

struct Registry {
    types: HashMap<u32, Vec<Slot>>,
    bindings: usize,
}

/// Pattern-matching dispatcher
pub struct Binder {
    registry: RwLock<Registry>,
}

impl Binder {
    pub fn new() -> Self {
        Self::with_config(&BinderConfig::default())
    }

    pub fn with_config(config: &BinderConfig) -> Self {
        Self {
            registry: RwLock::new(Registry {
                types: HashMap::with_capacity(config.initial_type_capacity),
                bindings: 0,
            }),
        }
    }

    /// Route messages matching `pattern` to `handler`.
    ///
    /// The pattern's runtime type, its touched fields and their values form
    /// the match condition. Binding the same handler to an equal pattern
    /// again changes nothing.
    pub fn bind(&self, pattern: &dyn Cell, handler: Handler) -> BindingToken {
        let tag = pattern.type_tag();
        let fingerprint = pattern.fingerprint();
        let hash = pattern.value_hash(fingerprint);
        let handler_id = handler.id();

        let mut registry = self.registry.write();
        let slots = registry.types.entry(tag.id()).or_default();
        let index = match slots.binary_search_by(|slot| slot.pattern.cmp(fingerprint)) {
            Ok(index) => index,
            Err(index) => {
                slots.insert(index, Slot::new(fingerprint.clone()));
                index
            }
        };

        match slots[index].add(hash, pattern, handler) {
            Added::Duplicate => {
                trace!(type_id = tag.id(), handler = handler_id.as_u64(), "Duplicate binding ignored");
            }
            Added::NewEntry | Added::NewHandler => {
                registry.bindings += 1;
                debug!(
                    type_id = tag.id(),
                    type_name = tag.name(),
                    pattern = ?fingerprint,
                    handler = handler_id.as_u64(),
                    "Handler bound"
                );
            }
        }

        BindingToken {
            type_id: tag.id(),
            pattern: pattern.clone_cell(),
            handler: handler_id,
        }
    }

    /// Bind a closure; see [`Binder::bind`]
    pub fn bind_fn<F>(&self, pattern: &dyn Cell, callback: F) -> BindingToken
    where
        F: Fn(&dyn Cell) + Send + Sync + 'static,
    {
        self.bind(pattern, Handler::new(callback))
    }

    /// Remove one binding. Unbinding something no longer bound is a no-op
    /// and returns false.
    pub fn unbind(&self, token: &BindingToken) -> bool {
        let fingerprint = token.pattern.fingerprint();
        let hash = token.pattern.value_hash(fingerprint);

        let mut registry = self.registry.write();
        let Some(slots) = registry.types.get_mut(&token.type_id) else {
            return false;
        };
        let Ok(index) = slots.binary_search_by(|slot| slot.pattern.cmp(fingerprint)) else {
            return false;
        };
        if !slots[index].remove(hash, token.pattern.as_ref(), token.handler) {
            return false;
        }

        if slots[index].references == 0 {
            slots.remove(index);
        }
        if slots.is_empty() {
            registry.types.remove(&token.type_id);
        }
        registry.bindings -= 1;
        debug!(
            type_id = token.type_id,
            handler = token.handler.as_u64(),
            "Handler unbound"
        );
        true
    }

    /// Remove every binding held by `owner` in one write-locked pass.
    /// Returns the number of bindings removed.
    pub fn detach_owner(&self, owner: OwnerId) -> usize {
        let mut registry = self.registry.write();
        let mut removed = 0;
        for slots in registry.types.values_mut() {
            for slot in slots.iter_mut() {
                removed += slot.remove_owner(owner);
            }
            slots.retain(|slot| slot.references > 0);
        }
        registry.types.retain(|_, slots| !slots.is_empty());
        registry.bindings -= removed;
        if removed > 0 {
            debug!(%owner, removed, "Owner detached");
        }
        removed
    }

    /// Handlers for `message`, most-derived type first
    pub fn build_handler_chain(&self, message: &dyn Cell) -> HandlerChain {
        let mut chain = HandlerChain::new();
        let fingerprint = message.fingerprint();
        let registry = self.registry.read();

        for tag in message.type_tag().chain() {
            let Some(slots) = registry.types.get(&tag.id()) else {
                continue;
            };
            // A subset never compares above its superset, so every candidate
            // sits at or below the message's bits at this level's length
            let probe = truncated(fingerprint, tag.field_count());
            let end = slots.partition_point(|slot| slot.pattern <= probe);

            for slot in &slots[..end] {
                if !slot.pattern.equivalent(fingerprint) {
                    continue;
                }
                let hash = message.value_hash(&slot.pattern);
                if let Some(handlers) = slot.matching(hash, message) {
                    chain.extend_from(handlers);
                }
            }
        }

        trace!(
            type_name = message.type_tag().name(),
            handlers = chain.len(),
            "Handler chain built"
        );
        chain
    }

    /// Resolve and invoke; returns how many handlers ran
    pub fn dispatch(&self, message: &dyn Cell) -> usize {
        self.build_handler_chain(message).invoke(message)
    }

    pub fn is_bound(&self, token: &BindingToken) -> bool {
        let fingerprint = token.pattern.fingerprint();
        let hash = token.pattern.value_hash(fingerprint);
        let registry = self.registry.read();
        registry
            .types
            .get(&token.type_id)
            .and_then(|slots| {
                slots
                    .binary_search_by(|slot| slot.pattern.cmp(fingerprint))
                    .ok()
                    .map(|index| &slots[index])
            })
            .is_some_and(|slot| slot.contains(hash, token.pattern.as_ref(), token.handler))
    }

    /// Distinct patterns registered for `type_id`
    pub fn slot_count(&self, type_id: u32) -> usize {
        self.registry
            .read()
            .types
            .get(&type_id)
            .map_or(0, Vec::len)
    }

    /// Live (pattern, handler) bindings
    pub fn binding_count(&self) -> usize {
        self.registry.read().bindings
    }
}

impl Default for Binder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Binder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.read();
        let handlers: usize = registry
            .types
            .values()
            .flatten()
            .map(Slot::handler_count)
            .sum();
        f.debug_struct("Binder")
            .field("types", &registry.types.len())
            .field("bindings", &registry.bindings)
            .field("handlers", &handlers)
            .finish()
    }
}

/// `fingerprint` cut or zero-extended to `len` bits
fn truncated(fingerprint: &Fingerprint, len: usize) -> Fingerprint {
    let bytes: Vec<u8> = fingerprint.wire_bytes(len).collect();
    let mut out = Fingerprint::new(len);
    out.load_bytes(&bytes);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use codec::Event;

    #[test]
    fn test_truncated_keeps_low_bits() {
        let mut fp = Fingerprint::new(40);
        fp.touch(1).unwrap();
        fp.touch(35).unwrap();
        let cut = truncated(&fp, 4);
        assert_eq!(cut.len(), 4);
        assert_eq!(cut.iter_set().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_slots_are_shared_by_equal_patterns() {
        let binder = Binder::new();
        let a = Event::new().with_handle(1);
        let b = Event::new().with_handle(2);
        binder.bind_fn(&a, |_| {});
        binder.bind_fn(&b, |_| {});
        binder.bind_fn(&Event::new(), |_| {});

        // {handle} shared by both values, plus the empty pattern
        assert_eq!(binder.slot_count(Event::TAG.id()), 2);
        assert_eq!(binder.binding_count(), 3);
    }

    #[test]
    fn test_duplicate_bind_is_noop() {
        let binder = Binder::new();
        let handler = Handler::new(|_| {});
        let pattern = Event::new().with_channel("md".into());
        let first = binder.bind(&pattern, handler.clone());
        let second = binder.bind(&pattern, handler);
        assert_eq!(first.handler(), second.handler());
        assert_eq!(binder.binding_count(), 1);
        assert_eq!(
            binder.build_handler_chain(&Event::new().with_channel("md".into())).len(),
            1
        );
    }

    #[test]
    fn test_unbind_drops_empty_slot() {
        let binder = Binder::new();
        let token = binder.bind_fn(&Event::new().with_transform(true), |_| {});
        assert!(binder.is_bound(&token));
        assert!(binder.unbind(&token));
        assert!(!binder.is_bound(&token));
        assert_eq!(binder.slot_count(Event::TAG.id()), 0);
        assert_eq!(binder.binding_count(), 0);
    }
}
