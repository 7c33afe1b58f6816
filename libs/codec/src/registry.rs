//! Type Registry
//!
//! Maps wire type ids to constructors so a decoder can allocate the concrete
//! message type before running its decode chain. A link owns a local
//! registry for types only it speaks; lookups fall back to the process-wide
//! [`TypeRegistry::global`], which knows [`Event`] from the start.

use crate::cell::{Cell, Message};
use crate::error::{CodecError, CodecResult};
use crate::event::Event;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};
use types::TypeTag;

/// Allocates a fresh, untouched instance of one message type
pub type Constructor = fn() -> Box<dyn Cell>;

static GLOBAL_REGISTRY: Lazy<TypeRegistry> = Lazy::new(|| {
    let registry = TypeRegistry::new();
    if let Err(err) = registry.register::<Event>() {
        warn!(error = %err, "Failed to seed global type registry");
    }
    registry
});

fn construct<T: Message>() -> Box<dyn Cell> {
    Box::new(T::default())
}

#[derive(Clone, Copy)]
struct Registration {
    tag: &'static TypeTag,
    construct: Constructor,
}

/// Type id → constructor map
pub struct TypeRegistry {
    types: RwLock<HashMap<u32, Registration>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self {
            types: RwLock::new(HashMap::new()),
        }
    }

    /// Process-wide fallback registry
    pub fn global() -> &'static TypeRegistry {
        &GLOBAL_REGISTRY
    }

    /// Register a message type declared with [`message!`](crate::message)
    pub fn register<T: Message>(&self) -> CodecResult<()> {
        self.register_type(T::TAG, construct::<T>)
    }

    /// Register `construct` under `tag`'s id.
    ///
    /// Registering the same type again is a no-op; claiming an id already
    /// held by a different type fails with [`CodecError::TypeConflict`].
    pub fn register_type(&self, tag: &'static TypeTag, construct: Constructor) -> CodecResult<()> {
        let mut types = self.types.write();
        if let Some(existing) = types.get(&tag.id()) {
            if existing.tag.name() == tag.name() {
                return Ok(());
            }
            warn!(
                type_id = tag.id(),
                existing = existing.tag.name(),
                requested = tag.name(),
                "Type id conflict"
            );
            return Err(CodecError::TypeConflict {
                type_id: tag.id(),
                existing: existing.tag.name(),
                requested: tag.name(),
            });
        }
        types.insert(tag.id(), Registration { tag, construct });
        debug!(type_id = tag.id(), name = tag.name(), "Registered message type");
        Ok(())
    }

    /// Fresh instance of the type registered under `type_id`
    pub fn create(&self, type_id: u32) -> Option<Box<dyn Cell>> {
        let registration = self.types.read().get(&type_id).copied()?;
        Some((registration.construct)())
    }

    pub fn tag(&self, type_id: u32) -> Option<&'static TypeTag> {
        self.types.read().get(&type_id).map(|registration| registration.tag)
    }

    pub fn contains(&self, type_id: u32) -> bool {
        self.types.read().contains_key(&type_id)
    }

    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.read().is_empty()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<u32> = self.types.read().keys().copied().collect();
        ids.sort_unstable();
        f.debug_struct("TypeRegistry").field("types", &ids).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::message! {
        struct Ping: 900 {
            seq: u32,
        }
    }

    crate::message! {
        struct Impostor: 900 {
            seq: u32,
        }
    }

    #[test]
    fn test_register_and_create() {
        let registry = TypeRegistry::new();
        registry.register::<Ping>().unwrap();
        // Same type twice is fine
        registry.register::<Ping>().unwrap();
        assert_eq!(registry.len(), 1);

        let created = registry.create(900).unwrap();
        assert_eq!(created.type_tag().name(), "Ping");
        assert!(created.fingerprint().is_clear());
        assert!(registry.create(901).is_none());
    }

    #[test]
    fn test_conflicting_id_rejected() {
        let registry = TypeRegistry::new();
        registry.register::<Ping>().unwrap();
        let err = registry.register::<Impostor>().unwrap_err();
        assert_eq!(
            err,
            CodecError::TypeConflict {
                type_id: 900,
                existing: "Ping",
                requested: "Impostor"
            }
        );
        assert_eq!(registry.tag(900).map(TypeTag::name), Some("Ping"));
    }

    #[test]
    fn test_global_knows_event() {
        assert!(TypeRegistry::global().contains(Event::TAG.id()));
        let event = TypeRegistry::global().create(1).unwrap();
        assert!(event.is::<Event>());
    }
}
