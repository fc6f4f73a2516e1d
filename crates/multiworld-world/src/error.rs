//! Error types for the `multiworld-world` crate.
//!
//! All fallible operations in this crate return [`WorldError`] through the
//! standard [`Result`] type alias.

use multiworld_types::{LocationId, WorldId};

/// Errors that can occur while building or re-deriving a world.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// A location was not found in the world.
    #[error("location {location} not found in world {world}")]
    LocationNotFound {
        /// The world that was searched.
        world: WorldId,
        /// The missing location.
        location: LocationId,
    },

    /// A duplicate location was inserted where uniqueness is required.
    #[error("duplicate location id {location} in world {world}")]
    DuplicateLocation {
        /// The world being built.
        world: WorldId,
        /// The duplicated location.
        location: LocationId,
    },

    /// A region name is not part of the world layout.
    #[error("region {region:?} not found in world {world}")]
    RegionNotFound {
        /// The world that was searched.
        world: WorldId,
        /// The unknown region name.
        region: String,
    },

    /// Placement data was applied to a world with a different id.
    #[error("placement data for world {placement} applied to world {world}")]
    WorldMismatch {
        /// The world receiving the placement.
        world: WorldId,
        /// The world the placement was extracted from.
        placement: WorldId,
    },

    /// Placement data does not cover every location of the layout.
    #[error("placement data for world {world} has no entry for location {location}")]
    IncompletePlacement {
        /// The world being regenerated.
        world: WorldId,
        /// The location without an assignment.
        location: LocationId,
    },

    /// A world id appears more than once in a seed.
    #[error("world {0} appears more than once in the seed")]
    DuplicateWorld(WorldId),

    /// Patch materials could not be serialized.
    #[error("failed to serialize patch for world {world}: {source}")]
    PatchSerialization {
        /// The world whose patch failed.
        world: WorldId,
        /// The underlying serializer error.
        source: serde_json::Error,
    },
}
