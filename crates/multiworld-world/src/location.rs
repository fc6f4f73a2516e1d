//! Locations and the items placed at them.

use multiworld_types::{ItemType, LocationId, WorldId};
use serde::{Deserialize, Serialize};

/// An item as placed in a world: the item type and the world that receives
/// it when the location is cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedItem {
    /// The item type.
    pub item: ItemType,
    /// World that owns the item. Fixed at generation time.
    pub owner: WorldId,
}

impl PlacedItem {
    /// Create a placed item.
    pub const fn new(item: ItemType, owner: WorldId) -> Self {
        Self { item, owner }
    }

    /// An empty slot owned by `owner`.
    pub const fn nothing(owner: WorldId) -> Self {
        Self {
            item: ItemType::Nothing,
            owner,
        }
    }
}

/// A location within one world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Layout id, shared by the same location in every world.
    pub id: LocationId,
    /// Human-readable name.
    pub name: String,
    /// Item assigned to the location.
    pub item: PlacedItem,
}

impl Location {
    /// Create a location holding `item`.
    pub fn new(id: LocationId, name: impl Into<String>, item: PlacedItem) -> Self {
        Self {
            id,
            name: name.into(),
            item,
        }
    }

    /// Whether the item here is owned by a different world than `world`.
    pub fn holds_foreign_item(&self, world: WorldId) -> bool {
        self.item.owner != world
    }
}
