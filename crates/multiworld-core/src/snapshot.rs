//! Building outbound snapshots and diffing inbound ones.
//!
//! All functions here are pure. Outbound snapshots combine the live tracker
//! with the last snapshot the relay knows about, always keeping the larger
//! value, so a reconnecting player never downgrades the shared view of their
//! progress. Inbound diffs compare a player's new record with the record it
//! replaces.

use std::collections::BTreeSet;

use multiworld_types::{BossType, ItemType, LocationId, PlayerRecord, PlayerWorldState, TrackerState, WorldId};

/// Project the tracker's records for `world_id` into a snapshot.
pub fn build_outbound(tracker: &TrackerState, world_id: WorldId) -> PlayerWorldState {
    PlayerWorldState {
        locations: tracker
            .locations_in(world_id)
            .map(|record| (record.location_id, record.cleared))
            .collect(),
        items: tracker
            .items_in(world_id)
            .filter(|record| record.item != ItemType::Nothing)
            .map(|record| (record.item, record.tracking_state))
            .collect(),
        bosses: tracker
            .bosses_in(world_id)
            .map(|record| (record.boss, record.defeated))
            .collect(),
    }
}

/// Outbound snapshot for `record`'s world: per key, the larger of the
/// tracker value and the record's last known value.
pub fn merge_for_world(record: &PlayerRecord, tracker: &TrackerState) -> PlayerWorldState {
    build_outbound(tracker, record.world_id).merged(&record.last_known_state)
}

/// Locations to act on after an inbound update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationDiff {
    /// Locations the player newly tracked.
    pub tracked: BTreeSet<LocationId>,
    /// Untracked locations surrendered because the player left the game.
    pub revealed: BTreeSet<LocationId>,
    /// Whether the update ended the player's game with a bulk reveal.
    pub bulk_reveal: bool,
}

impl LocationDiff {
    /// Whether there is nothing to act on.
    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty() && self.revealed.is_empty()
    }
}

/// Whether `incoming` newly forfeited relative to `previous`.
pub fn newly_forfeited(previous: Option<&PlayerRecord>, incoming: &PlayerRecord) -> bool {
    incoming.has_forfeited && !previous.is_some_and(|p| p.has_forfeited)
}

/// Whether `incoming` newly completed relative to `previous`.
pub fn newly_completed(previous: Option<&PlayerRecord>, incoming: &PlayerRecord) -> bool {
    incoming.has_completed && !previous.is_some_and(|p| p.has_completed)
}

/// Diff a player's locations.
///
/// A newly forfeited player, or a newly completed one when
/// `send_items_on_complete` is set, reveals every location not yet tracked.
pub fn diff_locations(
    previous: Option<&PlayerRecord>,
    incoming: &PlayerRecord,
    send_items_on_complete: bool,
) -> LocationDiff {
    let before = previous.map(|p| &p.last_known_state);
    let was_tracked = |id: LocationId| before.is_some_and(|state| state.is_location_tracked(id));

    let tracked: BTreeSet<LocationId> = incoming
        .last_known_state
        .locations
        .iter()
        .filter(|&(&id, &tracked)| tracked && !was_tracked(id))
        .map(|(&id, _)| id)
        .collect();

    let bulk_reveal = newly_forfeited(previous, incoming)
        || (send_items_on_complete && newly_completed(previous, incoming));

    let revealed = if bulk_reveal {
        incoming
            .last_known_state
            .locations
            .iter()
            .filter(|&(&id, &tracked)| !tracked && !was_tracked(id))
            .map(|(&id, _)| id)
            .collect()
    } else {
        BTreeSet::new()
    };

    LocationDiff {
        tracked,
        revealed,
        bulk_reveal,
    }
}

/// Items whose tracking value strictly increased.
pub fn diff_items(previous: Option<&PlayerWorldState>, incoming: &PlayerWorldState) -> Vec<(ItemType, u32)> {
    incoming
        .items
        .iter()
        .filter(|&(&item, &value)| value > previous.map_or(0, |state| state.item_value(item)))
        .map(|(&item, &value)| (item, value))
        .collect()
}

/// Bosses that flipped from untracked to tracked.
pub fn diff_bosses(previous: Option<&PlayerWorldState>, incoming: &PlayerWorldState) -> BTreeSet<BossType> {
    incoming
        .bosses
        .iter()
        .filter(|&(&boss, &tracked)| tracked && !previous.is_some_and(|state| state.is_boss_tracked(boss)))
        .map(|(&boss, _)| boss)
        .collect()
}
