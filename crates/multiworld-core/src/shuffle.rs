//! Built-in placement solver.
//!
//! [`ShuffleSolver`] deals the combined item pool of every world across every
//! location of every world, then shuffles rewards, bosses and prerequisites
//! inside each world. It has no logic model: any arrangement is accepted. All
//! randomness comes from one [`StdRng`] seeded from the seed string, so the
//! same configs and seed always produce the same worlds on the same build.

use std::collections::BTreeMap;

use multiworld_types::{GenerationConfig, ItemType, WorldId};
use multiworld_world::layout::{DUNGEONS, ITEM_POOL, PREREQUISITE_CHOICES, PREREQUISITE_REGIONS};
use multiworld_world::{PlacedItem, PlacementData, World, build_world, fnv1a};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};
use tracing::debug;

use crate::solver::{PlacementSolver, SolverError};

/// Settings key that makes the solver refuse a config.
///
/// Lets a player's settings express "impossible" requests the way a real
/// logic solver would reject them.
pub const UNSATISFIABLE_KEY: &str = "unsatisfiable";

/// Deterministic shuffle over the built-in layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShuffleSolver;

impl ShuffleSolver {
    /// Create a new solver.
    pub const fn new() -> Self {
        Self
    }

    fn rng(seed: &str) -> StdRng {
        StdRng::seed_from_u64(u64::from(fnv1a(seed)))
    }

    fn layouts(configs: &[GenerationConfig]) -> Result<Vec<World>, SolverError> {
        configs
            .iter()
            .map(|config| build_world(config.world_id, &config.player_name, config.is_local).map_err(SolverError::from))
            .collect()
    }

    fn shuffle_regions(world: &mut World, rng: &mut StdRng) -> Result<(), SolverError> {
        // Rewards and bosses stay within their half of the layout.
        for metroid in [false, true] {
            let dungeons: Vec<_> = DUNGEONS.iter().filter(|d| d.metroid == metroid).collect();
            let mut rewards: Vec<_> = dungeons.iter().map(|d| d.reward).collect();
            let mut bosses: Vec<_> = dungeons.iter().map(|d| d.boss).collect();
            rewards.shuffle(rng);
            bosses.shuffle(rng);
            for ((dungeon, reward), boss) in dungeons.iter().zip(rewards).zip(bosses) {
                world.set_reward(dungeon.name, reward)?;
                world.set_boss(dungeon.name, boss)?;
            }
        }
        for &(region, _) in &PREREQUISITE_REGIONS {
            if let Some(&item) = PREREQUISITE_CHOICES.choose(rng) {
                world.set_prerequisite(region, item)?;
            }
        }
        Ok(())
    }
}

impl PlacementSolver for ShuffleSolver {
    fn generate_worlds(&self, configs: &[GenerationConfig], seed: &str) -> Result<Vec<World>, SolverError> {
        if let Some(config) = configs
            .iter()
            .find(|config| config.settings.get(UNSATISFIABLE_KEY).and_then(serde_json::Value::as_bool) == Some(true))
        {
            return Err(SolverError::Generation {
                message: format!("settings for {} cannot be satisfied", config.player_name),
            });
        }

        let mut rng = Self::rng(seed);
        let mut worlds = Self::layouts(configs)?;

        let mut pool: Vec<PlacedItem> = worlds
            .iter()
            .flat_map(|world| ITEM_POOL.iter().map(move |&item| PlacedItem::new(item, world.id)))
            .collect();
        pool.shuffle(&mut rng);

        let mut remaining = pool.into_iter();
        for world in &mut worlds {
            let ids: Vec<_> = world.locations().map(|location| location.id).collect();
            for id in ids {
                let item = remaining.next().unwrap_or_else(|| PlacedItem::nothing(world.id));
                world.place_item(id, item)?;
            }
            Self::shuffle_regions(world, &mut rng)?;
        }

        debug!(worlds = worlds.len(), seed, "Shuffled item pool across worlds");
        Ok(worlds)
    }

    fn generate_worlds_from_placement(
        &self,
        configs: &[GenerationConfig],
        _seed: &str,
        placement: &BTreeMap<WorldId, PlacementData>,
    ) -> Result<Vec<World>, SolverError> {
        let mut worlds = Self::layouts(configs)?;
        for world in &mut worlds {
            let data = placement.get(&world.id).ok_or_else(|| SolverError::Generation {
                message: format!("no placement data for world {}", world.id),
            })?;
            world.apply_placement(data)?;
        }
        Ok(worlds)
    }

    fn validate(&self, worlds: &[World]) -> bool {
        // Every world's pool must be placed exactly once somewhere.
        let mut placed: BTreeMap<(WorldId, ItemType), usize> = BTreeMap::new();
        for location in worlds.iter().flat_map(World::locations) {
            let count = placed.entry((location.item.owner, location.item.item)).or_insert(0);
            *count = count.saturating_add(1);
        }
        let mut expected: BTreeMap<(WorldId, ItemType), usize> = BTreeMap::new();
        for world in worlds {
            for &item in &ITEM_POOL {
                let count = expected.entry((world.id, item)).or_insert(0);
                *count = count.saturating_add(1);
            }
        }
        placed == expected
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use multiworld_world::validation_hash;

    use super::*;

    fn configs(count: u32) -> Vec<GenerationConfig> {
        (0..count)
            .map(|i| {
                let mut config = GenerationConfig::new(format!("Player{i}"));
                config.world_id = WorldId(i);
                config.is_local = i == 0;
                config
            })
            .collect()
    }

    #[test]
    fn same_seed_same_worlds() {
        let solver = ShuffleSolver::new();
        let a = solver.generate_worlds(&configs(3), "abc").unwrap();
        let b = solver.generate_worlds(&configs(3), "abc").unwrap();
        assert_eq!(validation_hash(&a), validation_hash(&b));
    }

    #[test]
    fn different_seed_different_worlds() {
        let solver = ShuffleSolver::new();
        let a = solver.generate_worlds(&configs(2), "abc").unwrap();
        let b = solver.generate_worlds(&configs(2), "xyz").unwrap();
        assert_ne!(validation_hash(&a), validation_hash(&b));
    }

    #[test]
    fn generated_worlds_pass_validation() {
        let solver = ShuffleSolver::new();
        let worlds = solver.generate_worlds(&configs(2), "abc").unwrap();
        assert!(solver.validate(&worlds));
        let mut broken = worlds;
        let first = broken.first_mut().unwrap();
        first
            .place_item(multiworld_types::LocationId(1), PlacedItem::new(ItemType::Bow, WorldId(9)))
            .unwrap();
        assert!(!solver.validate(&broken));
    }

    #[test]
    fn unsatisfiable_settings_rejected() {
        let mut configs = configs(2);
        if let Some(config) = configs.get_mut(1) {
            config.settings = serde_json::json!({ "unsatisfiable": true });
        }
        let result = ShuffleSolver::new().generate_worlds(&configs, "abc");
        assert!(matches!(result, Err(SolverError::Generation { .. })));
    }

    #[test]
    fn placement_rederives_identical_worlds() {
        let solver = ShuffleSolver::new();
        let leader = solver.generate_worlds(&configs(2), "abc").unwrap();
        let placement: BTreeMap<_, _> = leader.iter().map(|w| (w.id, w.placement_data())).collect();
        let follower = solver
            .generate_worlds_from_placement(&configs(2), "abc", &placement)
            .unwrap();
        assert_eq!(validation_hash(&leader), validation_hash(&follower));
    }
}
