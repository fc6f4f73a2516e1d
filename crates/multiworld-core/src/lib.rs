//! Seed agreement, player-state reconciliation and sync for multiworld
//! sessions.
//!
//! A leader generates the seed, followers re-derive it from broadcast
//! placement data and confirm the validation hash. During play each client
//! pushes its merged progress snapshot and reconciles every remote snapshot
//! into local effects.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `multiworld.yaml`.
//! - [`solver`] -- [`PlacementSolver`] seam around the randomizer.
//! - [`shuffle`] -- [`ShuffleSolver`], a deterministic reference solver.
//! - [`generator`] -- Retrying seed generation, regeneration and hash checks.
//! - [`lifecycle`] -- [`GameSession`] state machine and player roster.
//! - [`effects`] -- [`Effect`] and [`Reconciliation`] results.
//! - [`snapshot`] -- Outbound snapshot construction and inbound diffing.
//! - [`reconcile`] -- [`Reconciler`]: remote update to local effects.
//! - [`tracker`] -- [`TrackerStore`] seam and [`InMemoryTracker`].
//! - [`relay`] -- [`Relay`] seam, relay events and [`ChannelRelay`].
//! - [`sync`] -- [`SyncLoop`] periodic push task.
//! - [`service`] -- [`MultiplayerService`] facade tying it all together.
//!
//! [`PlacementSolver`]: solver::PlacementSolver
//! [`ShuffleSolver`]: shuffle::ShuffleSolver
//! [`GameSession`]: lifecycle::GameSession
//! [`Effect`]: effects::Effect
//! [`Reconciliation`]: effects::Reconciliation
//! [`Reconciler`]: reconcile::Reconciler
//! [`TrackerStore`]: tracker::TrackerStore
//! [`InMemoryTracker`]: tracker::InMemoryTracker
//! [`Relay`]: relay::Relay
//! [`ChannelRelay`]: relay::ChannelRelay
//! [`SyncLoop`]: sync::SyncLoop
//! [`MultiplayerService`]: service::MultiplayerService

pub mod config;
pub mod effects;
pub mod generator;
pub mod lifecycle;
pub mod reconcile;
pub mod relay;
pub mod service;
pub mod shuffle;
pub mod snapshot;
pub mod solver;
pub mod sync;
pub mod tracker;
