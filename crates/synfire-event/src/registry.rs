//! Entity registry: id resolution for connection setup and delivery
//!
//! Events address entities by opaque id; the registry owns the entities and
//! resolves ids at delivery time. Connection-graph construction is the host's
//! business; the registry only validates (kind, r-port) pairs and routes
//! already-addressed events.

use std::collections::HashMap;

use crate::error::{ProtocolError, Result};
use crate::event::{Event, EventHandler, EventTag, RPort};
use crate::ids::EntityId;

/// Owns registered entities and resolves event addressing.
///
/// Generic over the entity type so homogeneous hosts keep typed access;
/// heterogeneous hosts use `EntityRegistry<Box<dyn EventHandler>>`.
#[derive(Debug)]
pub struct EntityRegistry<T: EventHandler> {
    entities: HashMap<EntityId, T>,
}

impl<T: EventHandler> EntityRegistry<T> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            entities: HashMap::new(),
        }
    }

    /// Add an entity under the id it reports.
    ///
    /// The id must be valid and not already taken.
    pub fn register(&mut self, entity: T) -> Result<EntityId> {
        let id = entity.id();
        if !id.is_valid() {
            return Err(ProtocolError::registration(id, "id is unresolved"));
        }
        if self.entities.contains_key(&id) {
            return Err(ProtocolError::registration(id, "id already registered"));
        }
        self.entities.insert(id, entity);
        log::debug!("registered entity {}", id);
        Ok(id)
    }

    /// Number of registered entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Whether the id resolves to a registered entity
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Borrow a registered entity
    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.entities.get(&id)
    }

    /// Mutably borrow a registered entity
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        self.entities.get_mut(&id)
    }

    /// Ids of all registered entities
    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.keys().copied().collect()
    }

    /// Validate a requested connection to `receiver` at setup time.
    ///
    /// Returns the resolved r-port the sender must embed in every future
    /// event of this connection. Invalid (kind, r-port) pairs are rejected
    /// here so delivery never sees them.
    pub fn connect(&mut self, receiver: EntityId, kind: EventTag, rport: RPort) -> Result<RPort> {
        let entity = self
            .entities
            .get_mut(&receiver)
            .ok_or(ProtocolError::UnknownEntity { entity: receiver })?;
        entity.accepts(kind, rport)
    }

    /// Resolve the event's receiver and deliver it.
    ///
    /// Returns the receiver's immediate reply event, if any. An unresolvable
    /// receiver is a fatal protocol error: the event is never dropped
    /// silently.
    pub fn dispatch(&mut self, event: Event) -> Result<Option<Event>> {
        let receiver = event.receiver();
        let entity = self
            .entities
            .get_mut(&receiver)
            .ok_or(ProtocolError::UnknownEntity { entity: receiver })?;
        event.deliver(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventHead;
    use crate::time::Time;

    struct Counter {
        id: EntityId,
        spikes: u32,
    }

    impl Counter {
        fn new(id: u64) -> Self {
            Self {
                id: EntityId::new(id),
                spikes: 0,
            }
        }
    }

    impl EventHandler for Counter {
        fn id(&self) -> EntityId {
            self.id
        }

        fn accepts(&mut self, kind: EventTag, rport: RPort) -> Result<RPort> {
            match kind {
                EventTag::Spike if rport == 0 => Ok(0),
                EventTag::Spike => Err(ProtocolError::unknown_receptor(rport, kind, self.id)),
                other => Err(ProtocolError::unsupported(other, self.id)),
            }
        }

        fn handle_spike(&mut self, _head: &EventHead, multiplicity: u32) -> Result<()> {
            self.spikes += multiplicity;
            Ok(())
        }
    }

    #[test]
    fn test_register_and_dispatch() {
        let mut registry = EntityRegistry::new();
        let id = registry.register(Counter::new(3)).unwrap();

        let event = Event::spike(2)
            .with_sender(EntityId::new(1))
            .with_receiver(id)
            .with_delay(1)
            .with_stamp(Time::ZERO);
        let reply = registry.dispatch(event).unwrap();
        assert!(reply.is_none());
        assert_eq!(registry.get(id).unwrap().spikes, 2);
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut registry = EntityRegistry::new();
        registry.register(Counter::new(3)).unwrap();
        let result = registry.register(Counter::new(3));
        assert!(matches!(result, Err(ProtocolError::Registration { .. })));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_rejects_unresolved_id() {
        let mut registry = EntityRegistry::new();
        let result = registry.register(Counter {
            id: EntityId::INVALID,
            spikes: 0,
        });
        assert!(matches!(result, Err(ProtocolError::Registration { .. })));
    }

    #[test]
    fn test_dispatch_unknown_receiver_is_fatal() {
        let mut registry: EntityRegistry<Counter> = EntityRegistry::new();
        let event = Event::spike(1)
            .with_sender(EntityId::new(1))
            .with_receiver(EntityId::new(42))
            .with_delay(1);
        let result = registry.dispatch(event);
        assert!(matches!(result, Err(ProtocolError::UnknownEntity { .. })));
    }

    #[test]
    fn test_connect_validates_rport() {
        let mut registry = EntityRegistry::new();
        let id = registry.register(Counter::new(5)).unwrap();
        assert_eq!(registry.connect(id, EventTag::Spike, 0).unwrap(), 0);
        assert!(matches!(
            registry.connect(id, EventTag::Spike, 3),
            Err(ProtocolError::UnknownReceptor { .. })
        ));
        assert!(matches!(
            registry.connect(id, EventTag::Rate, 0),
            Err(ProtocolError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_boxed_entities() {
        let mut registry: EntityRegistry<Box<dyn EventHandler>> = EntityRegistry::new();
        let id = registry.register(Box::new(Counter::new(8))).unwrap();
        assert!(registry.contains(id));
    }
}
