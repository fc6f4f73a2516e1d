//! One player's generated world.
//!
//! A [`World`] is built from the layout template, filled in by the placement
//! solver (or by re-applying [`PlacementData`]) and never changes afterwards.

use std::collections::{BTreeMap, BTreeSet};

use multiworld_types::{BossType, ItemType, LocationId, PlayerWorldState, RewardType, WorldId};
use serde::{Deserialize, Serialize};

use crate::error::WorldError;
use crate::location::{Location, PlacedItem};
use crate::placement::PlacementData;

/// A generated world: locations with their items plus region assignments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct World {
    /// World id, sequential in config order.
    pub id: WorldId,
    /// Name of the player the world belongs to.
    pub player_name: String,
    /// Whether this is the local player's world.
    pub is_local: bool,
    locations: BTreeMap<LocationId, Location>,
    reward_regions: BTreeMap<String, RewardType>,
    boss_regions: BTreeMap<String, BossType>,
    prerequisite_regions: BTreeMap<String, ItemType>,
}

impl World {
    /// Create an empty world.
    pub fn new(id: WorldId, player_name: impl Into<String>, is_local: bool) -> Self {
        Self {
            id,
            player_name: player_name.into(),
            is_local,
            locations: BTreeMap::new(),
            reward_regions: BTreeMap::new(),
            boss_regions: BTreeMap::new(),
            prerequisite_regions: BTreeMap::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Locations
    // -----------------------------------------------------------------------

    /// Add a location to the world.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::DuplicateLocation`] if the id is already present.
    pub fn add_location(&mut self, location: Location) -> Result<(), WorldError> {
        if self.locations.contains_key(&location.id) {
            return Err(WorldError::DuplicateLocation {
                world: self.id,
                location: location.id,
            });
        }
        self.locations.insert(location.id, location);
        Ok(())
    }

    /// Get a location by id.
    pub fn location(&self, id: LocationId) -> Option<&Location> {
        self.locations.get(&id)
    }

    /// Iterate over all locations in id order.
    pub fn locations(&self) -> impl Iterator<Item = &Location> {
        self.locations.values()
    }

    /// Number of locations.
    pub fn location_count(&self) -> usize {
        self.locations.len()
    }

    /// Place `item` at `location`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::LocationNotFound`] if the location is unknown.
    pub fn place_item(&mut self, location: LocationId, item: PlacedItem) -> Result<(), WorldError> {
        let slot = self
            .locations
            .get_mut(&location)
            .ok_or(WorldError::LocationNotFound {
                world: self.id,
                location,
            })?;
        slot.item = item;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Regions
    // -----------------------------------------------------------------------

    /// Declare a reward region with its initial reward.
    pub fn add_reward_region(&mut self, name: impl Into<String>, reward: RewardType) {
        self.reward_regions.insert(name.into(), reward);
    }

    /// Declare a boss region with its initial boss.
    pub fn add_boss_region(&mut self, name: impl Into<String>, boss: BossType) {
        self.boss_regions.insert(name.into(), boss);
    }

    /// Declare a prerequisite region with its initial required item.
    pub fn add_prerequisite_region(&mut self, name: impl Into<String>, item: ItemType) {
        self.prerequisite_regions.insert(name.into(), item);
    }

    /// Assign the reward of an existing region.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::RegionNotFound`] if the region is not declared.
    pub fn set_reward(&mut self, region: &str, reward: RewardType) -> Result<(), WorldError> {
        let slot = self.reward_regions.get_mut(region).ok_or_else(|| WorldError::RegionNotFound {
            world: self.id,
            region: region.to_owned(),
        })?;
        *slot = reward;
        Ok(())
    }

    /// Assign the boss of an existing region.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::RegionNotFound`] if the region is not declared.
    pub fn set_boss(&mut self, region: &str, boss: BossType) -> Result<(), WorldError> {
        let slot = self.boss_regions.get_mut(region).ok_or_else(|| WorldError::RegionNotFound {
            world: self.id,
            region: region.to_owned(),
        })?;
        *slot = boss;
        Ok(())
    }

    /// Assign the required item of an existing prerequisite region.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::RegionNotFound`] if the region is not declared.
    pub fn set_prerequisite(&mut self, region: &str, item: ItemType) -> Result<(), WorldError> {
        let slot = self
            .prerequisite_regions
            .get_mut(region)
            .ok_or_else(|| WorldError::RegionNotFound {
                world: self.id,
                region: region.to_owned(),
            })?;
        *slot = item;
        Ok(())
    }

    /// Reward regions in name order.
    pub fn reward_regions(&self) -> impl Iterator<Item = (&str, RewardType)> {
        self.reward_regions.iter().map(|(name, &reward)| (name.as_str(), reward))
    }

    /// Boss regions in name order.
    pub fn boss_regions(&self) -> impl Iterator<Item = (&str, BossType)> {
        self.boss_regions.iter().map(|(name, &boss)| (name.as_str(), boss))
    }

    /// Prerequisite regions in name order.
    pub fn prerequisite_regions(&self) -> impl Iterator<Item = (&str, ItemType)> {
        self.prerequisite_regions.iter().map(|(name, &item)| (name.as_str(), item))
    }

    /// Set of bosses present in this world.
    pub fn bosses(&self) -> BTreeSet<BossType> {
        self.boss_regions.values().copied().collect()
    }

    // -----------------------------------------------------------------------
    // Derived views
    // -----------------------------------------------------------------------

    /// Item types owned by this world, wherever in `all_worlds` they are
    /// placed. `Nothing` is never included.
    pub fn owned_items(&self, all_worlds: &[Self]) -> BTreeSet<ItemType> {
        all_worlds
            .iter()
            .flat_map(Self::locations)
            .filter(|location| location.item.owner == self.id && location.item.item != ItemType::Nothing)
            .map(|location| location.item.item)
            .collect()
    }

    /// Initial progress snapshot for this world's player: every location and
    /// boss untracked, every owned item at tracking value 0.
    pub fn default_state(&self, all_worlds: &[Self]) -> PlayerWorldState {
        PlayerWorldState {
            locations: self.locations.keys().map(|&id| (id, false)).collect(),
            items: self
                .owned_items(all_worlds)
                .into_iter()
                .map(|item| (item, 0))
                .collect(),
            bosses: self.bosses().into_iter().map(|boss| (boss, false)).collect(),
        }
    }

    /// Extract the payload a follower needs to re-derive this world.
    pub fn placement_data(&self) -> PlacementData {
        PlacementData {
            world_id: self.id,
            locations: self
                .locations
                .values()
                .map(|location| (location.id, location.item))
                .collect(),
            rewards: self.reward_regions.clone(),
            bosses: self.boss_regions.clone(),
            prerequisites: self.prerequisite_regions.clone(),
        }
    }

    /// Re-apply placement data extracted from the leader's copy of this world.
    ///
    /// Every location of the layout must be covered. Region entries must name
    /// declared regions.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::WorldMismatch`] if the data belongs to another
    /// world, [`WorldError::IncompletePlacement`] if a location has no entry,
    /// and [`WorldError::LocationNotFound`] / [`WorldError::RegionNotFound`]
    /// for entries that do not exist in the layout.
    pub fn apply_placement(&mut self, data: &PlacementData) -> Result<(), WorldError> {
        if data.world_id != self.id {
            return Err(WorldError::WorldMismatch {
                world: self.id,
                placement: data.world_id,
            });
        }
        if let Some(&missing) = self.locations.keys().find(|id| !data.locations.contains_key(id)) {
            return Err(WorldError::IncompletePlacement {
                world: self.id,
                location: missing,
            });
        }
        for (&location, &item) in &data.locations {
            self.place_item(location, item)?;
        }
        for (region, &reward) in &data.rewards {
            self.set_reward(region, reward)?;
        }
        for (region, &boss) in &data.bosses {
            self.set_boss(region, boss)?;
        }
        for (region, &item) in &data.prerequisites {
            self.set_prerequisite(region, item)?;
        }
        Ok(())
    }
}
