//! Player progress snapshots and live tracker records.
//!
//! [`PlayerWorldState`] is the wire-shape snapshot exchanged through the
//! relay. [`TrackerState`] is the local, authoritative view of every world
//! maintained by the tracker; this crate only defines its shape.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::enums::{BossType, ItemType};
use crate::ids::{LocationId, WorldId};

// ---------------------------------------------------------------------------
// PlayerWorldState
// ---------------------------------------------------------------------------

/// One player's progress as known at a point in time.
///
/// Values only ever move forward: booleans go `false -> true` and tracking
/// values never decrease across [`merge`](Self::merge).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerWorldState {
    /// Location id -> whether the location has been tracked.
    pub locations: BTreeMap<LocationId, bool>,
    /// Item type -> tracking value (how many of the item the player has).
    pub items: BTreeMap<ItemType, u32>,
    /// Boss type -> whether the boss has been tracked as defeated.
    pub bosses: BTreeMap<BossType, bool>,
}

impl PlayerWorldState {
    /// Create an empty snapshot.
    pub const fn new() -> Self {
        Self {
            locations: BTreeMap::new(),
            items: BTreeMap::new(),
            bosses: BTreeMap::new(),
        }
    }

    /// Whether `location` is tracked in this snapshot.
    pub fn is_location_tracked(&self, location: LocationId) -> bool {
        self.locations.get(&location).copied().unwrap_or(false)
    }

    /// Tracking value of `item`, 0 if absent.
    pub fn item_value(&self, item: ItemType) -> u32 {
        self.items.get(&item).copied().unwrap_or(0)
    }

    /// Whether `boss` is tracked as defeated in this snapshot.
    pub fn is_boss_tracked(&self, boss: BossType) -> bool {
        self.bosses.get(&boss).copied().unwrap_or(false)
    }

    /// Merge `other` into `self`, keeping the maximum value per key.
    ///
    /// Keys present in either side end up in the result.
    pub fn merge(&mut self, other: &Self) {
        for (&location, &tracked) in &other.locations {
            let entry = self.locations.entry(location).or_insert(false);
            *entry = *entry || tracked;
        }
        for (&item, &value) in &other.items {
            let entry = self.items.entry(item).or_insert(0);
            *entry = (*entry).max(value);
        }
        for (&boss, &tracked) in &other.bosses {
            let entry = self.bosses.entry(boss).or_insert(false);
            *entry = *entry || tracked;
        }
    }

    /// Return the merge of `self` and `other` without mutating either.
    #[must_use]
    pub fn merged(&self, other: &Self) -> Self {
        let mut result = self.clone();
        result.merge(other);
        result
    }
}

// ---------------------------------------------------------------------------
// Tracker records
// ---------------------------------------------------------------------------

/// The tracker's record of one location in one world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRecord {
    /// World the location belongs to.
    pub world_id: WorldId,
    /// The location.
    pub location_id: LocationId,
    /// Item placed at the location.
    pub item: ItemType,
    /// World that owns (receives) the placed item.
    pub item_world_id: WorldId,
    /// Whether the location is known to be cleared.
    pub cleared: bool,
    /// Whether the clear was detected by the local auto-tracker.
    pub autotracked: bool,
}

/// The tracker's record of one item type for one world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    /// World whose inventory this is.
    pub world_id: WorldId,
    /// The item type.
    pub item: ItemType,
    /// How many of the item are tracked.
    pub tracking_state: u32,
}

/// The tracker's record of one boss in one world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BossRecord {
    /// World the boss belongs to.
    pub world_id: WorldId,
    /// The boss.
    pub boss: BossType,
    /// Whether the boss is known to be defeated.
    pub defeated: bool,
    /// Whether the defeat was detected by the local auto-tracker.
    pub autotracked: bool,
}

/// Point-in-time copy of the live tracker's facts for every world.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackerState {
    /// Location records, keyed by `(world, location)`.
    pub locations: BTreeMap<(WorldId, LocationId), LocationRecord>,
    /// Item records, keyed by `(world, item)`.
    pub items: BTreeMap<(WorldId, ItemType), ItemRecord>,
    /// Boss records, keyed by `(world, boss)`.
    pub bosses: BTreeMap<(WorldId, BossType), BossRecord>,
}

impl TrackerState {
    /// Look up a location record.
    pub fn location(&self, world_id: WorldId, location_id: LocationId) -> Option<&LocationRecord> {
        self.locations.get(&(world_id, location_id))
    }

    /// Look up an item record.
    pub fn item(&self, world_id: WorldId, item: ItemType) -> Option<&ItemRecord> {
        self.items.get(&(world_id, item))
    }

    /// Look up a boss record.
    pub fn boss(&self, world_id: WorldId, boss: BossType) -> Option<&BossRecord> {
        self.bosses.get(&(world_id, boss))
    }

    /// Insert or replace a location record.
    pub fn insert_location(&mut self, record: LocationRecord) {
        self.locations.insert((record.world_id, record.location_id), record);
    }

    /// Insert or replace an item record.
    pub fn insert_item(&mut self, record: ItemRecord) {
        self.items.insert((record.world_id, record.item), record);
    }

    /// Insert or replace a boss record.
    pub fn insert_boss(&mut self, record: BossRecord) {
        self.bosses.insert((record.world_id, record.boss), record);
    }

    /// Iterate over the location records of one world.
    pub fn locations_in(&self, world_id: WorldId) -> impl Iterator<Item = &LocationRecord> {
        self.locations.values().filter(move |record| record.world_id == world_id)
    }

    /// Iterate over the item records of one world.
    pub fn items_in(&self, world_id: WorldId) -> impl Iterator<Item = &ItemRecord> {
        self.items.values().filter(move |record| record.world_id == world_id)
    }

    /// Iterate over the boss records of one world.
    pub fn bosses_in(&self, world_id: WorldId) -> impl Iterator<Item = &BossRecord> {
        self.bosses.values().filter(move |record| record.world_id == world_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(locations: &[(u32, bool)], items: &[(ItemType, u32)], bosses: &[(BossType, bool)]) -> PlayerWorldState {
        PlayerWorldState {
            locations: locations.iter().map(|&(id, t)| (LocationId(id), t)).collect(),
            items: items.iter().copied().collect(),
            bosses: bosses.iter().copied().collect(),
        }
    }

    #[test]
    fn merge_keeps_maximum_per_key() {
        let a = state(
            &[(1, true), (2, false)],
            &[(ItemType::Bow, 1), (ItemType::Missile, 4)],
            &[(BossType::Kraid, false)],
        );
        let b = state(
            &[(1, false), (2, true), (3, false)],
            &[(ItemType::Bow, 0), (ItemType::Missile, 6), (ItemType::Hookshot, 1)],
            &[(BossType::Kraid, true)],
        );
        let merged = a.merged(&b);
        assert!(merged.is_location_tracked(LocationId(1)));
        assert!(merged.is_location_tracked(LocationId(2)));
        assert!(!merged.is_location_tracked(LocationId(3)));
        assert_eq!(merged.locations.len(), 3);
        assert_eq!(merged.item_value(ItemType::Bow), 1);
        assert_eq!(merged.item_value(ItemType::Missile), 6);
        assert_eq!(merged.item_value(ItemType::Hookshot), 1);
        assert!(merged.is_boss_tracked(BossType::Kraid));
    }

    #[test]
    fn merge_is_monotonic_in_both_directions() {
        let a = state(&[(1, true)], &[(ItemType::Super, 3)], &[(BossType::Ridley, true)]);
        let b = state(&[(1, false)], &[(ItemType::Super, 1)], &[(BossType::Ridley, false)]);
        for merged in [a.merged(&b), b.merged(&a)] {
            for (&id, &tracked) in a.locations.iter().chain(b.locations.iter()) {
                assert!(merged.is_location_tracked(id) || !tracked);
            }
            for (&item, &value) in a.items.iter().chain(b.items.iter()) {
                assert!(merged.item_value(item) >= value);
            }
            assert!(merged.is_boss_tracked(BossType::Ridley));
        }
    }

    #[test]
    fn missing_keys_read_as_untracked() {
        let empty = PlayerWorldState::new();
        assert!(!empty.is_location_tracked(LocationId(9)));
        assert_eq!(empty.item_value(ItemType::Bow), 0);
        assert!(!empty.is_boss_tracked(BossType::Phantoon));
    }

    #[test]
    fn tracker_lookups_are_scoped_by_world() {
        let mut tracker = TrackerState::default();
        tracker.insert_location(LocationRecord {
            world_id: WorldId(0),
            location_id: LocationId(17),
            item: ItemType::Bow,
            item_world_id: WorldId(1),
            cleared: false,
            autotracked: false,
        });
        assert!(tracker.location(WorldId(0), LocationId(17)).is_some());
        assert!(tracker.location(WorldId(1), LocationId(17)).is_none());
        assert_eq!(tracker.locations_in(WorldId(0)).count(), 1);
        assert_eq!(tracker.locations_in(WorldId(1)).count(), 0);
    }

    #[test]
    fn snapshot_roundtrips_through_json() {
        let original = state(&[(4, true)], &[(ItemType::Morph, 1)], &[(BossType::Draygon, false)]);
        let json = serde_json::to_string(&original).ok();
        let restored: Option<PlayerWorldState> =
            json.as_deref().and_then(|text| serde_json::from_str(text).ok());
        assert_eq!(restored, Some(original));
    }
}
