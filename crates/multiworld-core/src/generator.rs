//! Seed generation and regeneration with bounded retries.
//!
//! The leader calls [`SeedGenerator::generate`]; every follower calls
//! [`SeedGenerator::regenerate`] with the placement data the leader
//! broadcast, then compares validation hashes with
//! [`SeedGenerator::verify_hash`].
//!
//! Both entry points are synchronous and CPU-bound. Async callers wrap them
//! in `spawn_blocking`.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use multiworld_types::{GenerationConfig, WorldId};
use multiworld_world::{PlacementData, SeedData, World};
use tracing::{info, warn};

use crate::solver::{PlacementSolver, SolverError};

/// Default number of attempts before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Errors surfaced by seed generation.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The solver raised an error. Retryable.
    #[error("seed generation failed: {source}")]
    GenerationFailed {
        /// The solver error.
        #[from]
        source: SolverError,
    },

    /// The solver produced an inconsistent seed. Retryable.
    #[error("generated seed failed the solver's self-check")]
    ValidationFailed,

    /// Every attempt failed.
    #[error("could not generate a seed with the requested settings after {attempts} attempts: {last_error}")]
    ExhaustedRetries {
        /// Number of attempts made.
        attempts: u32,
        /// Message of the final failure.
        last_error: String,
    },

    /// A config's world id has no matching placement data.
    #[error("no placement data for world {world_id}")]
    MissingPlacementData {
        /// The world without data.
        world_id: WorldId,
    },

    /// The regenerated seed does not match the leader's.
    #[error("validation hash mismatch: expected {expected}, computed {actual}")]
    DesyncDetected {
        /// Hash announced by the leader.
        expected: String,
        /// Hash computed locally.
        actual: String,
    },

    /// No configs were supplied.
    #[error("no player configs to generate from")]
    NoPlayers,

    /// More players than world ids can address.
    #[error("too many players: {count}")]
    TooManyPlayers {
        /// Number of configs supplied.
        count: usize,
    },
}

impl GenerationError {
    /// Whether another attempt may succeed.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::GenerationFailed { .. } | Self::ValidationFailed)
    }
}

/// Wraps a [`PlacementSolver`] with world id assignment, validation and
/// bounded retries.
#[derive(Clone)]
pub struct SeedGenerator {
    solver: Arc<dyn PlacementSolver>,
    max_attempts: u32,
}

impl std::fmt::Debug for SeedGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedGenerator")
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl SeedGenerator {
    /// Create a generator. `max_attempts` is clamped to at least 1.
    pub fn new(solver: Arc<dyn PlacementSolver>, max_attempts: u32) -> Self {
        Self {
            solver,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Number of attempts per call.
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Generate a seed from player configs.
    ///
    /// Configs receive sequential world ids (0, 1, 2, ...) in the order given.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::ExhaustedRetries`] when every attempt
    /// fails, or [`GenerationError::NoPlayers`] /
    /// [`GenerationError::TooManyPlayers`] for unusable input.
    pub fn generate(&self, mut configs: Vec<GenerationConfig>, seed: &str) -> Result<SeedData, GenerationError> {
        assign_world_ids(&mut configs)?;
        let expected: BTreeSet<WorldId> = configs.iter().map(|config| config.world_id).collect();
        self.with_retries(seed, &expected, || self.solver.generate_worlds(&configs, seed))
    }

    /// Re-derive the leader's seed from broadcast placement data.
    ///
    /// Configs keep the world ids they declare.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::MissingPlacementData`] if a config's world
    /// has no entry in `placement`, and otherwise the same errors as
    /// [`generate`](Self::generate).
    pub fn regenerate(
        &self,
        seed: &str,
        placement: &[PlacementData],
        configs: Vec<GenerationConfig>,
    ) -> Result<SeedData, GenerationError> {
        if configs.is_empty() {
            return Err(GenerationError::NoPlayers);
        }
        let by_world: BTreeMap<WorldId, PlacementData> =
            placement.iter().map(|data| (data.world_id, data.clone())).collect();
        if let Some(config) = configs.iter().find(|config| !by_world.contains_key(&config.world_id)) {
            return Err(GenerationError::MissingPlacementData {
                world_id: config.world_id,
            });
        }
        let expected: BTreeSet<WorldId> = configs.iter().map(|config| config.world_id).collect();
        self.with_retries(seed, &expected, || {
            self.solver.generate_worlds_from_placement(&configs, seed, &by_world)
        })
    }

    /// Compare a seed's validation hash with the hash the leader announced.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::DesyncDetected`] on mismatch.
    pub fn verify_hash(seed: &SeedData, expected: &str) -> Result<(), GenerationError> {
        let actual = seed.validation_hash();
        if actual == expected {
            Ok(())
        } else {
            Err(GenerationError::DesyncDetected {
                expected: expected.to_owned(),
                actual,
            })
        }
    }

    fn with_retries(
        &self,
        seed: &str,
        expected: &BTreeSet<WorldId>,
        mut run: impl FnMut() -> Result<Vec<World>, SolverError>,
    ) -> Result<SeedData, GenerationError> {
        let mut last_error = String::new();
        for attempt in 1..=self.max_attempts {
            match self.attempt(seed, expected, &mut run) {
                Ok(seed_data) => {
                    info!(
                        attempt,
                        worlds = seed_data.worlds.len(),
                        hash = %seed_data.validation_hash(),
                        "Seed generated"
                    );
                    return Ok(seed_data);
                }
                Err(err) => {
                    warn!(attempt, max_attempts = self.max_attempts, error = %err, "Seed generation attempt failed");
                    last_error = err.to_string();
                }
            }
        }
        Err(GenerationError::ExhaustedRetries {
            attempts: self.max_attempts,
            last_error,
        })
    }

    fn attempt(
        &self,
        seed: &str,
        expected: &BTreeSet<WorldId>,
        run: &mut impl FnMut() -> Result<Vec<World>, SolverError>,
    ) -> Result<SeedData, GenerationError> {
        let worlds = run()?;
        if !covers_every_config(&worlds, expected) {
            warn!(
                expected = expected.len(),
                returned = worlds.len(),
                "Solver did not return one world per config"
            );
            return Err(GenerationError::ValidationFailed);
        }
        if !self.solver.validate(&worlds) {
            return Err(GenerationError::ValidationFailed);
        }
        SeedData::assemble(seed, worlds).map_err(|err| GenerationError::from(SolverError::from(err)))
    }
}

/// Exactly one world per expected id, and no others.
fn covers_every_config(worlds: &[World], expected: &BTreeSet<WorldId>) -> bool {
    worlds.len() == expected.len() && worlds.iter().map(|world| world.id).collect::<BTreeSet<_>>() == *expected
}

fn assign_world_ids(configs: &mut [GenerationConfig]) -> Result<(), GenerationError> {
    if configs.is_empty() {
        return Err(GenerationError::NoPlayers);
    }
    let count = configs.len();
    for (index, config) in configs.iter_mut().enumerate() {
        let Ok(id) = u32::try_from(index) else {
            return Err(GenerationError::TooManyPlayers { count });
        };
        config.world_id = WorldId(id);
    }
    Ok(())
}
