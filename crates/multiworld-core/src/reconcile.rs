//! Translating remote player updates into local effects.
//!
//! The [`Reconciler`] decides what an inbound snapshot means for the local
//! player. It never raises: missing tracker records, updates for the local
//! world and updates for players who already left are logged and produce an
//! empty [`Reconciliation`].
//!
//! Records the local auto-tracker owns are never touched by a remote update.
//! The same fact detected on both sides would otherwise echo back and forth
//! through the relay.

use multiworld_types::{ItemCategory, ItemType, PlayerRecord, PlayerStatus, TrackerState, WorldId};
use tracing::{debug, trace};

use crate::effects::{Effect, Reconciliation};
use crate::snapshot::{diff_bosses, diff_items, diff_locations, newly_completed, newly_forfeited};

/// Session-scoped reconciliation rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciler {
    local_world: WorldId,
    send_items_on_complete: bool,
    death_link: bool,
}

impl Reconciler {
    /// Create a reconciler for the local player's world.
    pub const fn new(local_world: WorldId, send_items_on_complete: bool, death_link: bool) -> Self {
        Self {
            local_world,
            send_items_on_complete,
            death_link,
        }
    }

    /// Reconcile one inbound record against the record it replaces.
    ///
    /// `previous` is `None` for the first update from a player, or when
    /// catching up after a reconnect.
    pub fn reconcile(
        &self,
        previous: Option<&PlayerRecord>,
        incoming: &PlayerRecord,
        tracker: &TrackerState,
    ) -> Reconciliation {
        let world_id = incoming.world_id;
        let mut result = Reconciliation::empty(world_id, incoming.player_name.clone());

        if world_id == self.local_world {
            debug!(world_id = %world_id, "Ignoring update for local world");
            return result;
        }
        if previous.is_some_and(PlayerRecord::has_ended) {
            debug!(world_id = %world_id, "Ignoring update for player who already left");
            return result;
        }

        let previous_state = previous.map(|p| &p.last_known_state);
        let effects = &mut result.effects;

        // --- Locations ---
        let locations = diff_locations(previous, incoming, self.send_items_on_complete);
        let mut revealed = locations.revealed.clone();
        if locations.bulk_reveal {
            // Tracker locations the snapshot never mentioned are surrendered too.
            revealed.extend(
                tracker
                    .locations_in(world_id)
                    .filter(|record| !record.cleared && !locations.tracked.contains(&record.location_id))
                    .map(|record| record.location_id),
            );
        }
        let all = locations
            .tracked
            .iter()
            .map(|&id| (id, false))
            .chain(revealed.iter().map(|&id| (id, true)));
        for (location_id, from_reveal) in all {
            let Some(record) = tracker.location(world_id, location_id) else {
                debug!(world_id = %world_id, location_id = %location_id, "No tracker record for location");
                continue;
            };
            if record.autotracked || record.cleared {
                trace!(world_id = %world_id, location_id = %location_id, "Location already known locally");
                continue;
            }
            if record.item_world_id == self.local_world && record.item != ItemType::Nothing {
                if from_reveal && record.item.is_in_category(ItemCategory::IgnoreOnMultiplayerCompletion) {
                    trace!(item = %record.item, "Skipping filler item from bulk reveal");
                } else {
                    effects.push(Effect::GiveItem {
                        item: record.item,
                        to_world: self.local_world,
                        from_world: world_id,
                        location: location_id,
                    });
                }
            }
            effects.push(Effect::MarkLocationCleared {
                world_id,
                location_id,
            });
        }

        // --- Items ---
        for (item, tracking_value) in diff_items(previous_state, &incoming.last_known_state) {
            if item == ItemType::Nothing {
                continue;
            }
            let Some(record) = tracker.item(world_id, item) else {
                debug!(world_id = %world_id, item = %item, "No tracker record for item");
                continue;
            };
            if record.tracking_state >= tracking_value {
                continue;
            }
            effects.push(Effect::UpdateItemTracking {
                world_id,
                item,
                tracking_value,
            });
        }

        // --- Bosses ---
        for boss in diff_bosses(previous_state, &incoming.last_known_state) {
            let Some(record) = tracker.boss(world_id, boss) else {
                debug!(world_id = %world_id, boss = %boss, "No tracker record for boss");
                continue;
            };
            if record.autotracked || record.defeated {
                continue;
            }
            effects.push(Effect::MarkBossDefeated { world_id, boss });
        }

        // --- Game end (first flag wins) ---
        if newly_forfeited(previous, incoming) {
            effects.push(Effect::PlayerEndedGame {
                world_id,
                outcome: PlayerStatus::Forfeited,
                deliver_items: true,
            });
        } else if newly_completed(previous, incoming) {
            effects.push(Effect::PlayerEndedGame {
                world_id,
                outcome: PlayerStatus::Completed,
                deliver_items: self.send_items_on_complete,
            });
        }

        if !result.is_empty() {
            debug!(
                world_id = %world_id,
                effects = result.effects.len(),
                "Reconciled remote update"
            );
        }
        result
    }

    /// Reconcile a remote player's death.
    pub fn reconcile_death(&self, world_id: WorldId, player_name: &str) -> Reconciliation {
        let mut result = Reconciliation::empty(world_id, player_name);
        if world_id == self.local_world {
            return result;
        }
        if self.death_link {
            result.effects.push(Effect::DeathLink { world_id });
        } else {
            debug!(world_id = %world_id, "Death link disabled, ignoring death");
        }
        result
    }
}
