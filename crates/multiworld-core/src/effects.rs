//! Local effects produced by reconciling remote updates.

use multiworld_types::{BossType, ItemType, LocationId, PlayerStatus, WorldId};
use serde::{Deserialize, Serialize};

/// One thing the local client should do in response to a remote update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Effect {
    /// Hand an item to the local player.
    GiveItem {
        /// The item.
        item: ItemType,
        /// Receiving (local) world.
        to_world: WorldId,
        /// World whose location held the item.
        from_world: WorldId,
        /// The location that was cleared.
        location: LocationId,
    },
    /// Record a remote location as cleared in the tracker.
    MarkLocationCleared {
        /// World of the location.
        world_id: WorldId,
        /// The location.
        location_id: LocationId,
    },
    /// Raise a remote player's tracked item count.
    UpdateItemTracking {
        /// World whose inventory changed.
        world_id: WorldId,
        /// The item.
        item: ItemType,
        /// New tracking value.
        tracking_value: u32,
    },
    /// Record a remote boss as defeated in the tracker.
    MarkBossDefeated {
        /// World of the boss.
        world_id: WorldId,
        /// The boss.
        boss: BossType,
    },
    /// A remote player forfeited or completed their game.
    PlayerEndedGame {
        /// The player's world.
        world_id: WorldId,
        /// `Forfeited` or `Completed`.
        outcome: PlayerStatus,
        /// Whether items owed to the local player were delivered.
        deliver_items: bool,
    },
    /// A remote player died and death link is on.
    DeathLink {
        /// World of the player who died.
        world_id: WorldId,
    },
}

impl Effect {
    /// Whether applying this effect changes the tracker.
    pub const fn mutates_tracker(&self) -> bool {
        matches!(
            self,
            Self::GiveItem { .. }
                | Self::MarkLocationCleared { .. }
                | Self::UpdateItemTracking { .. }
                | Self::MarkBossDefeated { .. }
        )
    }
}

/// Effects derived from one inbound event for one remote player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    /// World of the remote player.
    pub world_id: WorldId,
    /// Display name of the remote player.
    pub player_name: String,
    /// Effects in application order.
    pub effects: Vec<Effect>,
}

impl Reconciliation {
    /// A result with nothing to do.
    pub fn empty(world_id: WorldId, player_name: impl Into<String>) -> Self {
        Self {
            world_id,
            player_name: player_name.into(),
            effects: Vec::new(),
        }
    }

    /// Whether there is nothing to do.
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Items granted to the local player.
    pub fn granted_items(&self) -> impl Iterator<Item = ItemType> + '_ {
        self.effects.iter().filter_map(|effect| match effect {
            Effect::GiveItem { item, .. } => Some(*item),
            _ => None,
        })
    }

    /// Effects that mutate the tracker.
    pub fn tracker_effects(&self) -> Vec<Effect> {
        self.effects
            .iter()
            .filter(|effect| effect.mutates_tracker())
            .cloned()
            .collect()
    }
}
