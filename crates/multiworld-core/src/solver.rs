//! Placement solver seam.
//!
//! The solver decides where items go. The multiworld layer treats it as an
//! opaque collaborator: it hands over configs and a seed string, and gets
//! back one [`World`] per config. [`ShuffleSolver`](crate::shuffle::ShuffleSolver)
//! is the built-in implementation.

use std::collections::BTreeMap;

use multiworld_types::{GenerationConfig, WorldId};
use multiworld_world::{PlacementData, World, WorldError};

/// Errors raised by a placement solver.
#[derive(Debug, thiserror::Error)]
pub enum SolverError {
    /// The solver could not produce worlds for the given settings.
    #[error("solver could not place items: {message}")]
    Generation {
        /// Description of the failure.
        message: String,
    },

    /// Building or re-deriving a world failed.
    #[error(transparent)]
    World(#[from] WorldError),
}

/// A source of generated worlds.
///
/// Both entry points are blocking and may take several seconds. Callers run
/// them off the async runtime.
pub trait PlacementSolver: Send + Sync {
    /// Generate one world per config from `seed`.
    ///
    /// Configs arrive with their world ids already assigned.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError`] if placement fails.
    fn generate_worlds(&self, configs: &[GenerationConfig], seed: &str) -> Result<Vec<World>, SolverError>;

    /// Re-derive worlds from placement data broadcast by the leader, without
    /// running the randomized search.
    ///
    /// `placement` holds an entry for every config's world id.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError`] if the data cannot be applied.
    fn generate_worlds_from_placement(
        &self,
        configs: &[GenerationConfig],
        seed: &str,
        placement: &BTreeMap<WorldId, PlacementData>,
    ) -> Result<Vec<World>, SolverError>;

    /// Self-check over generated worlds. Solvers without one accept
    /// everything.
    fn validate(&self, _worlds: &[World]) -> bool {
        true
    }
}
