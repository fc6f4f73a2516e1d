//! Per-world placement payloads.
//!
//! After the leader generates a seed it broadcasts one [`PlacementData`] per
//! world. Followers apply these to freshly built layouts instead of running
//! the solver's randomized search, so every client reaches identical worlds.

use std::collections::BTreeMap;

use multiworld_types::{BossType, ItemType, LocationId, RewardType, WorldId};
use serde::{Deserialize, Serialize};

use crate::location::PlacedItem;

/// Every assignment that distinguishes one generated world from the bare
/// layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementData {
    /// World the data was extracted from.
    pub world_id: WorldId,
    /// Item (with owner) at every location.
    pub locations: BTreeMap<LocationId, PlacedItem>,
    /// Reward region name -> reward.
    pub rewards: BTreeMap<String, RewardType>,
    /// Boss region name -> boss.
    pub bosses: BTreeMap<String, BossType>,
    /// Prerequisite region name -> required item.
    pub prerequisites: BTreeMap<String, ItemType>,
}
