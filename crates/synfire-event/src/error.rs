//! Error types for the event protocol

use thiserror::Error;

use crate::event::EventTag;
use crate::ids::EntityId;

/// Result type for protocol operations
pub type Result<T> = core::result::Result<T, ProtocolError>;

/// Errors that can occur in the event protocol
///
/// Connection-time rejections (`UnknownReceptor`, `Unsupported`) are
/// recoverable: the requested connection is simply refused. Everything else
/// signals a broken protocol invariant and must be treated as fatal by the
/// host; silently dropping such an event would corrupt causal ordering.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Event failed its validity check at delivery
    #[error("Invalid event: {reason}")]
    InvalidEvent {
        /// Why the event is invalid
        reason: String,
    },

    /// Receiver ID could not be resolved through the registry
    #[error("Unknown entity {entity}")]
    UnknownEntity {
        /// ID that failed to resolve
        entity: EntityId,
    },

    /// Entity does not handle this event kind
    #[error("{kind} events are not supported by entity {entity}")]
    Unsupported {
        /// Rejected event kind
        kind: EventTag,
        /// Rejecting entity
        entity: EntityId,
    },

    /// Receiver port is outside the entity's valid range for this kind
    #[error("Unknown receptor port {rport} for {kind} events on entity {entity}")]
    UnknownReceptor {
        /// Rejected receiver port
        rport: u32,
        /// Event kind the connection was requested for
        kind: EventTag,
        /// Rejecting entity
        entity: EntityId,
    },

    /// Event kind must not be copied
    #[error("{kind} events are not cloneable")]
    NotCloneable {
        /// Offending event kind
        kind: EventTag,
    },

    /// Accumulator write beyond the configured delay horizon
    #[error("Delivery step {rel_step} exceeds delay horizon {horizon}")]
    DelayHorizon {
        /// Relative delivery step of the write
        rel_step: i64,
        /// Configured horizon in ticks
        horizon: usize,
    },

    /// Event would have to be delivered in the past
    #[error("Causality violation: relative delivery step {rel_step} is negative")]
    Causality {
        /// Computed relative delivery step
        rel_step: i64,
    },

    /// Logging request names a quantity the entity cannot record
    #[error("Unknown recordable quantity '{name}' on entity {entity}")]
    UnknownQuantity {
        /// Requested quantity name
        name: String,
        /// Rejecting entity
        entity: EntityId,
    },

    /// Entity could not be added to the registry
    #[error("Cannot register entity {entity}: {reason}")]
    Registration {
        /// Offending entity id
        entity: EntityId,
        /// Why registration failed
        reason: String,
    },
}

impl ProtocolError {
    /// Create an invalid event error
    pub fn invalid_event(reason: impl Into<String>) -> Self {
        Self::InvalidEvent {
            reason: reason.into(),
        }
    }

    /// Create an unknown entity error
    pub fn unknown_entity(entity: EntityId) -> Self {
        Self::UnknownEntity { entity }
    }

    /// Create an unsupported event kind error
    pub fn unsupported(kind: EventTag, entity: EntityId) -> Self {
        Self::Unsupported { kind, entity }
    }

    /// Create an unknown receptor error
    pub fn unknown_receptor(rport: u32, kind: EventTag, entity: EntityId) -> Self {
        Self::UnknownReceptor {
            rport,
            kind,
            entity,
        }
    }

    /// Create a delay horizon error
    pub fn delay_horizon(rel_step: i64, horizon: usize) -> Self {
        Self::DelayHorizon { rel_step, horizon }
    }

    /// Create a causality violation error
    pub fn causality(rel_step: i64) -> Self {
        Self::Causality { rel_step }
    }

    /// Create an unknown recordable quantity error
    pub fn unknown_quantity(name: impl Into<String>, entity: EntityId) -> Self {
        Self::UnknownQuantity {
            name: name.into(),
            entity,
        }
    }

    /// Create a registration error
    pub fn registration(entity: EntityId, reason: impl Into<String>) -> Self {
        Self::Registration {
            entity,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProtocolError::unknown_entity(EntityId::new(7));
        assert!(format!("{}", err).contains("E7"));

        let err = ProtocolError::causality(-2);
        assert!(format!("{}", err).contains("-2"));
    }
}
