//! World model, placement data and validation hashing for multiworld seeds.
//!
//! # Modules
//!
//! - [`error`] -- Error types for world construction and re-derivation.
//! - [`location`] -- [`Location`] and the [`PlacedItem`] it holds.
//! - [`world`] -- [`World`]: one player's generated instance, its default
//!   progress snapshot and placement extraction.
//! - [`placement`] -- [`PlacementData`] broadcast from leader to followers.
//! - [`hash`] -- FNV-1a based validation hash over a set of worlds.
//! - [`seed`] -- [`SeedData`]: worlds plus per-world patch materials.
//! - [`layout`] -- Built-in 28-location layout every world starts from.

pub mod error;
pub mod hash;
pub mod layout;
pub mod location;
pub mod placement;
pub mod seed;
pub mod world;

// Re-export primary types at crate root.
pub use error::WorldError;
pub use hash::{fnv1a, validation_hash};
pub use layout::build_world;
pub use location::{Location, PlacedItem};
pub use placement::PlacementData;
pub use seed::SeedData;
pub use world::World;
