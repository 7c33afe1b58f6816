//! Per-type binding storage
//!
//! A [`Slot`] is one distinct fingerprint pattern registered for a type id.
//! Bound instances sharing that pattern live in its entries, bucketed by
//! the hash of their touched values; each carries its own handler set.

use crate::handler::{Handler, HandlerId, OwnerId};
use codec::{Cell, CellExt};
use std::collections::HashMap;
use types::Fingerprint;

pub(crate) struct Entry {
    pub(crate) pattern: Box<dyn Cell>,
    pub(crate) handlers: Vec<Handler>,
}

pub(crate) struct Slot {
    pub(crate) pattern: Fingerprint,
    /// Entries using this pattern
    pub(crate) references: usize,
    entries: HashMap<u64, Vec<Entry>>,
}

/// Outcome of adding a handler to a slot
pub(crate) enum Added {
    NewEntry,
    NewHandler,
    Duplicate,
}

impl Slot {
    pub(crate) fn new(pattern: Fingerprint) -> Self {
        Self {
            pattern,
            references: 0,
            entries: HashMap::new(),
        }
    }

    pub(crate) fn add(&mut self, hash: u64, pattern: &dyn Cell, handler: Handler) -> Added {
        let bucket = self.entries.entry(hash).or_default();
        match bucket.iter_mut().find(|entry| entry.pattern.structural_eq(pattern)) {
            Some(entry) if entry.handlers.iter().any(|h| h.id() == handler.id()) => {
                Added::Duplicate
            }
            Some(entry) => {
                entry.handlers.push(handler);
                Added::NewHandler
            }
            None => {
                bucket.push(Entry {
                    pattern: pattern.clone_cell(),
                    handlers: vec![handler],
                });
                self.references += 1;
                Added::NewEntry
            }
        }
    }

    /// Drop `handler` from the entry bound to exactly `pattern`.
    /// Returns false when there was nothing to remove.
    pub(crate) fn remove(&mut self, hash: u64, pattern: &dyn Cell, handler: HandlerId) -> bool {
        let Some(bucket) = self.entries.get_mut(&hash) else {
            return false;
        };
        let Some(index) = bucket
            .iter()
            .position(|entry| entry.pattern.structural_eq(pattern))
        else {
            return false;
        };

        let entry = &mut bucket[index];
        let before = entry.handlers.len();
        entry.handlers.retain(|h| h.id() != handler);
        if entry.handlers.len() == before {
            return false;
        }

        if entry.handlers.is_empty() {
            bucket.swap_remove(index);
            self.references -= 1;
            if bucket.is_empty() {
                self.entries.remove(&hash);
            }
        }
        true
    }

    /// Remove every handler held by `owner`; returns how many went
    pub(crate) fn remove_owner(&mut self, owner: OwnerId) -> usize {
        let mut removed = 0;
        let mut emptied = 0;
        for bucket in self.entries.values_mut() {
            for entry in bucket.iter_mut() {
                let before = entry.handlers.len();
                entry.handlers.retain(|h| h.owner() != Some(owner));
                removed += before - entry.handlers.len();
            }
            let before = bucket.len();
            bucket.retain(|entry| !entry.handlers.is_empty());
            emptied += before - bucket.len();
        }
        self.entries.retain(|_, bucket| !bucket.is_empty());
        self.references -= emptied;
        removed
    }

    /// Handlers of the entry whose values match `message` on this pattern
    pub(crate) fn matching(&self, hash: u64, message: &dyn Cell) -> Option<&[Handler]> {
        self.entries
            .get(&hash)?
            .iter()
            .find(|entry| entry.pattern.equivalent_under(message, &self.pattern))
            .map(|entry| entry.handlers.as_slice())
    }

    pub(crate) fn contains(&self, hash: u64, pattern: &dyn Cell, handler: HandlerId) -> bool {
        self.entries.get(&hash).is_some_and(|bucket| {
            bucket.iter().any(|entry| {
                entry.pattern.structural_eq(pattern)
                    && entry.handlers.iter().any(|h| h.id() == handler)
            })
        })
    }

    pub(crate) fn handler_count(&self) -> usize {
        self.entries
            .values()
            .flatten()
            .map(|entry| entry.handlers.len())
            .sum()
    }
}
