//! Shared type definitions for multiworld sessions.
//!
//! This crate is the single source of truth for the data exchanged between
//! the world model, the seed generator, the reconciler and the relay.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe identifiers (UUID-backed session ids, integer
//!   world and location ids)
//! - [`enums`] -- Item, boss and reward enumerations plus session status
//! - [`state`] -- [`PlayerWorldState`] snapshots and the [`TrackerState`] shape
//! - [`player`] -- [`PlayerRecord`] and [`GenerationConfig`]

pub mod enums;
pub mod ids;
pub mod player;
pub mod state;

// Re-export all public types at crate root for convenience.
pub use enums::{BossType, GameStatus, ItemCategory, ItemType, PlayerStatus, RewardType};
pub use ids::{GameId, LocationId, PlayerId, WorldId};
pub use player::{GenerationConfig, PlayerRecord};
pub use state::{BossRecord, ItemRecord, LocationRecord, PlayerWorldState, TrackerState};
