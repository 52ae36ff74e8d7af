use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for an entity in a world.
///
/// An entity carries no data of its own; it is only a key into the
/// component stores. Ids are ordered by allocation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity(pub u64);

impl Entity {
    /// Largest id a world accepts. Ids above it are rejected so the
    /// allocator always has room to keep counting upwards.
    pub const MAX_ID: u64 = i64::MAX as u64;

    /// Raw numeric id.
    pub fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out monotonically increasing entity ids, starting at 1.
#[derive(Debug, Clone, Default)]
pub struct EntityAllocator {
    last: u64,
}

impl EntityAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next id.
    pub fn allocate(&mut self) -> Entity {
        // `observe` caps `last` at `Entity::MAX_ID`, leaving 2^63 ids above it.
        self.last += 1;
        Entity(self.last)
    }

    /// Make sure ids handed out later never collide with `entity`.
    ///
    /// Needed when an entity id arrives from outside the allocator
    /// (an upsert on an id that was never created here). Ids above
    /// [`Entity::MAX_ID`] are refused and `false` is returned.
    pub fn observe(&mut self, entity: Entity) -> bool {
        if entity.0 > Entity::MAX_ID {
            return false;
        }
        self.last = self.last.max(entity.0);
        true
    }

    /// The most recently allocated (or observed) id, if any.
    pub fn last(&self) -> Option<Entity> {
        (self.last > 0).then_some(Entity(self.last))
    }
}
