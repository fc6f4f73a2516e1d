//! Seed data: the output of one generation.

use std::collections::{BTreeMap, BTreeSet};

use multiworld_types::WorldId;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::WorldError;
use crate::hash::validation_hash;
use crate::placement::PlacementData;
use crate::world::World;

/// Every world of a generated seed plus the per-world patch materials.
///
/// Patches are opaque to the multiworld layer. They are derived from each
/// world's [`PlacementData`] so regenerated seeds carry identical bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedData {
    /// Seed string the worlds were generated from.
    pub seed: String,
    /// All worlds, in world id order.
    pub worlds: Vec<World>,
    /// World id -> patch bytes.
    pub patches: BTreeMap<WorldId, Vec<u8>>,
}

impl SeedData {
    /// Assemble seed data from solver output, sorting worlds by id and
    /// deriving a patch for each.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::DuplicateWorld`] if two worlds share an id, or
    /// [`WorldError::PatchSerialization`] if a patch cannot be encoded.
    pub fn assemble(seed: impl Into<String>, mut worlds: Vec<World>) -> Result<Self, WorldError> {
        worlds.sort_by_key(|world| world.id);
        let mut seen = BTreeSet::new();
        let mut patches = BTreeMap::new();
        for world in &worlds {
            if !seen.insert(world.id) {
                return Err(WorldError::DuplicateWorld(world.id));
            }
            let patch = serde_json::to_vec(&world.placement_data()).map_err(|source| {
                WorldError::PatchSerialization {
                    world: world.id,
                    source,
                }
            })?;
            debug!(world_id = %world.id, patch_bytes = patch.len(), "Derived world patch");
            patches.insert(world.id, patch);
        }
        Ok(Self {
            seed: seed.into(),
            worlds,
            patches,
        })
    }

    /// Look up a world by id.
    pub fn world(&self, id: WorldId) -> Option<&World> {
        self.worlds.iter().find(|world| world.id == id)
    }

    /// The local player's world, if one is flagged.
    pub fn local_world(&self) -> Option<&World> {
        self.worlds.iter().find(|world| world.is_local)
    }

    /// Validation hash over every world.
    pub fn validation_hash(&self) -> String {
        validation_hash(&self.worlds)
    }

    /// Placement payloads for broadcasting to followers.
    pub fn placement_data(&self) -> Vec<PlacementData> {
        self.worlds.iter().map(World::placement_data).collect()
    }
}
