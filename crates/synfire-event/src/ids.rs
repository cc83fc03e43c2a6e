//! Identity handles for simulation entities

use core::fmt;

/// Opaque, non-owning identifier for a simulation entity.
///
/// Events carry sender and receiver as `EntityId` values which are resolved
/// through an [`EntityRegistry`](crate::EntityRegistry) at delivery time.
/// An event may be cloned and re-addressed long after the sending entity has
/// been moved; an id stays valid where a reference would not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityId(pub u64);

impl EntityId {
    /// Create a new entity ID
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub const fn raw(&self) -> u64 {
        self.0
    }

    /// Unresolved entity ID constant
    pub const INVALID: Self = Self(u64::MAX);

    /// Check if this ID refers to a resolved entity
    pub const fn is_valid(&self) -> bool {
        self.0 != u64::MAX
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "E{}", self.0)
        } else {
            write!(f, "E?")
        }
    }
}
