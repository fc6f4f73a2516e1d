//! Tracker store seam and an in-memory implementation.
//!
//! The tracker is the live-game source of truth. The multiworld layer reads
//! point-in-time copies of it and asks it to apply batches of effects; it
//! never edits records directly.

use std::sync::{PoisonError, RwLock};

use multiworld_types::{
    BossRecord, BossType, ItemRecord, ItemType, LocationId, LocationRecord, TrackerState, WorldId,
};
use multiworld_world::SeedData;
use tracing::debug;

use crate::effects::Effect;

/// Access to the live tracker.
pub trait TrackerStore: Send + Sync {
    /// Point-in-time copy of every record.
    fn snapshot(&self) -> TrackerState;

    /// Apply a batch of effects atomically with respect to [`snapshot`].
    ///
    /// Effects that do not mutate the tracker are ignored. Records flagged
    /// as auto-tracked are left untouched.
    ///
    /// [`snapshot`]: TrackerStore::snapshot
    fn apply(&self, effects: &[Effect]);

    /// Replace every record with a fresh, untracked view of `seed`.
    fn load_seed(&self, seed: &SeedData);
}

/// An item handed to the local player by another world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceivedItem {
    /// The item.
    pub item: ItemType,
    /// World whose location held it.
    pub from_world: WorldId,
    /// The location.
    pub location: LocationId,
}

#[derive(Debug, Default)]
struct Inner {
    state: TrackerState,
    received: Vec<ReceivedItem>,
}

/// Tracker held in process memory behind a read-write lock.
#[derive(Debug, Default)]
pub struct InMemoryTracker {
    inner: RwLock<Inner>,
}

impl InMemoryTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tracker initialised from `seed`.
    pub fn from_seed(seed: &SeedData) -> Self {
        let tracker = Self::new();
        tracker.load_seed(seed);
        tracker
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    // -----------------------------------------------------------------------
    // Local gameplay (auto-tracker)
    // -----------------------------------------------------------------------

    /// The auto-tracker saw a location being cleared. Returns `false` if the
    /// location is unknown.
    pub fn autotrack_location(&self, world_id: WorldId, location_id: LocationId) -> bool {
        let mut inner = self.write();
        match inner.state.locations.get_mut(&(world_id, location_id)) {
            Some(record) => {
                record.cleared = true;
                record.autotracked = true;
                true
            }
            None => false,
        }
    }

    /// The auto-tracker read a new item count.
    pub fn autotrack_item(&self, world_id: WorldId, item: ItemType, tracking_state: u32) {
        let mut inner = self.write();
        let record = inner.state.items.entry((world_id, item)).or_insert(ItemRecord {
            world_id,
            item,
            tracking_state: 0,
        });
        record.tracking_state = record.tracking_state.max(tracking_state);
    }

    /// The auto-tracker saw a boss being defeated. Returns `false` if the
    /// boss is unknown.
    pub fn autotrack_boss(&self, world_id: WorldId, boss: BossType) -> bool {
        let mut inner = self.write();
        match inner.state.bosses.get_mut(&(world_id, boss)) {
            Some(record) => {
                record.defeated = true;
                record.autotracked = true;
                true
            }
            None => false,
        }
    }

    /// Items received from other worlds, in arrival order.
    pub fn received_items(&self) -> Vec<ReceivedItem> {
        self.read().received.clone()
    }
}

impl TrackerStore for InMemoryTracker {
    fn snapshot(&self) -> TrackerState {
        self.read().state.clone()
    }

    fn apply(&self, effects: &[Effect]) {
        let mut inner = self.write();
        let Inner { state, received } = &mut *inner;
        for effect in effects {
            match *effect {
                Effect::GiveItem {
                    item,
                    to_world,
                    from_world,
                    location,
                } => {
                    received.push(ReceivedItem {
                        item,
                        from_world,
                        location,
                    });
                    let record = state.items.entry((to_world, item)).or_insert(ItemRecord {
                        world_id: to_world,
                        item,
                        tracking_state: 0,
                    });
                    record.tracking_state = record.tracking_state.saturating_add(1);
                }
                Effect::MarkLocationCleared { world_id, location_id } => {
                    if let Some(record) = state.locations.get_mut(&(world_id, location_id)) {
                        if !record.autotracked {
                            record.cleared = true;
                        }
                    }
                }
                Effect::UpdateItemTracking {
                    world_id,
                    item,
                    tracking_value,
                } => {
                    if let Some(record) = state.items.get_mut(&(world_id, item)) {
                        record.tracking_state = record.tracking_state.max(tracking_value);
                    }
                }
                Effect::MarkBossDefeated { world_id, boss } => {
                    if let Some(record) = state.bosses.get_mut(&(world_id, boss)) {
                        if !record.autotracked {
                            record.defeated = true;
                        }
                    }
                }
                Effect::PlayerEndedGame { .. } | Effect::DeathLink { .. } => {}
            }
        }
        debug!(effects = effects.len(), "Applied effect batch to tracker");
    }

    fn load_seed(&self, seed: &SeedData) {
        let mut state = TrackerState::default();
        for world in &seed.worlds {
            for location in world.locations() {
                state.insert_location(LocationRecord {
                    world_id: world.id,
                    location_id: location.id,
                    item: location.item.item,
                    item_world_id: location.item.owner,
                    cleared: false,
                    autotracked: false,
                });
            }
            for item in world.owned_items(&seed.worlds) {
                state.insert_item(ItemRecord {
                    world_id: world.id,
                    item,
                    tracking_state: 0,
                });
            }
            for boss in world.bosses() {
                state.insert_boss(BossRecord {
                    world_id: world.id,
                    boss,
                    defeated: false,
                    autotracked: false,
                });
            }
        }
        let mut inner = self.write();
        inner.state = state;
        inner.received.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use multiworld_world::{Location, PlacedItem, World};

    use super::*;

    fn seed() -> SeedData {
        let mut w0 = World::new(WorldId(0), "A", true);
        w0.add_location(Location::new(LocationId(1), "X", PlacedItem::new(ItemType::Morph, WorldId(1))))
            .unwrap();
        w0.add_boss_region("Kraid's Lair", BossType::Kraid);
        let mut w1 = World::new(WorldId(1), "B", false);
        w1.add_location(Location::new(LocationId(1), "X", PlacedItem::new(ItemType::Bow, WorldId(0))))
            .unwrap();
        SeedData::assemble("s", vec![w0, w1]).unwrap()
    }

    #[test]
    fn seed_loads_records_for_every_world() {
        let tracker = InMemoryTracker::from_seed(&seed());
        let state = tracker.snapshot();
        assert_eq!(state.locations.len(), 2);
        let record = state.location(WorldId(1), LocationId(1)).unwrap();
        assert_eq!(record.item_world_id, WorldId(0));
        assert_eq!(state.item(WorldId(0), ItemType::Bow).map(|r| r.tracking_state), Some(0));
        assert!(state.boss(WorldId(0), BossType::Kraid).is_some());
    }

    #[test]
    fn apply_grants_and_clears() {
        let tracker = InMemoryTracker::from_seed(&seed());
        tracker.apply(&[
            Effect::GiveItem {
                item: ItemType::Bow,
                to_world: WorldId(0),
                from_world: WorldId(1),
                location: LocationId(1),
            },
            Effect::MarkLocationCleared {
                world_id: WorldId(1),
                location_id: LocationId(1),
            },
        ]);
        let state = tracker.snapshot();
        assert!(state.location(WorldId(1), LocationId(1)).unwrap().cleared);
        assert_eq!(state.item(WorldId(0), ItemType::Bow).map(|r| r.tracking_state), Some(1));
        assert_eq!(tracker.received_items().len(), 1);
    }

    #[test]
    fn autotracked_records_are_not_overwritten() {
        let tracker = InMemoryTracker::from_seed(&seed());
        assert!(tracker.autotrack_boss(WorldId(0), BossType::Kraid));
        let before = tracker.snapshot();
        tracker.apply(&[Effect::MarkBossDefeated {
            world_id: WorldId(0),
            boss: BossType::Kraid,
        }]);
        assert_eq!(tracker.snapshot(), before);
    }

    #[test]
    fn item_tracking_never_decreases() {
        let tracker = InMemoryTracker::from_seed(&seed());
        tracker.autotrack_item(WorldId(1), ItemType::Morph, 2);
        tracker.apply(&[Effect::UpdateItemTracking {
            world_id: WorldId(1),
            item: ItemType::Morph,
            tracking_value: 1,
        }]);
        assert_eq!(
            tracker.snapshot().item(WorldId(1), ItemType::Morph).map(|r| r.tracking_state),
            Some(2)
        );
    }
}
