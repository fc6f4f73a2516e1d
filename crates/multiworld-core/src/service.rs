//! Multiplayer service facade.
//!
//! [`MultiplayerService`] owns one [`GameSession`] for the local player and
//! wires together seed generation, the tracker, the relay and the sync loop.
//!
//! # Concurrency
//!
//! All session mutations go through one async mutex, so inbound updates for
//! the same player are applied in receive order. Tracker-mutating effects
//! are applied as one batch while that mutex is held, and the sync loop
//! reads the tracker under the same mutex, so a half-applied grant is never
//! pushed back out. No lock is held across relay I/O.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use multiworld_types::{GameStatus, PlayerId, PlayerRecord, PlayerStatus, WorldId};
use multiworld_world::{PlacementData, SeedData, World, validation_hash};
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinError;
use tracing::{debug, error, info, trace, warn};

use crate::config::MultiworldConfig;
use crate::effects::{Effect, Reconciliation};
use crate::generator::{GenerationError, SeedGenerator};
use crate::lifecycle::{GameSession, LifecycleError};
use crate::reconcile::Reconciler;
use crate::relay::{Relay, RelayError, RelayEvent};
use crate::snapshot::merge_for_world;
use crate::solver::PlacementSolver;
use crate::sync::SyncLoop;
use crate::tracker::TrackerStore;

/// Capacity of the effect broadcast channel.
const EFFECT_CHANNEL_CAPACITY: usize = 256;

/// Errors surfaced by the service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// A lifecycle rule was violated.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Generation or regeneration failed.
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// The relay refused a message.
    #[error(transparent)]
    Relay(#[from] RelayError),

    /// The blocking generation task panicked or was cancelled.
    #[error("generation task failed: {0}")]
    Task(#[from] JoinError),
}

struct Inner {
    generator: SeedGenerator,
    relay: Arc<dyn Relay>,
    tracker: Arc<dyn TrackerStore>,
    session: Mutex<GameSession>,
    local_player: PlayerId,
    sync: SyncLoop,
    effects: broadcast::Sender<Reconciliation>,
    connected: AtomicBool,
    auto_tracking: AtomicBool,
}

/// The local client's view of a multiplayer session.
pub struct MultiplayerService {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for MultiplayerService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiplayerService")
            .field("local_player", &self.inner.local_player)
            .field("sync", &self.inner.sync)
            .finish_non_exhaustive()
    }
}

impl MultiplayerService {
    /// Create a service for `local_player` in `session`.
    ///
    /// The relay is assumed connected; auto-tracking is assumed not started.
    pub fn new(
        config: &MultiworldConfig,
        session: GameSession,
        local_player: PlayerId,
        solver: Arc<dyn PlacementSolver>,
        relay: Arc<dyn Relay>,
        tracker: Arc<dyn TrackerStore>,
    ) -> Self {
        let (effects, _) = broadcast::channel(EFFECT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                generator: SeedGenerator::new(solver, config.generation.max_attempts),
                relay,
                tracker,
                session: Mutex::new(session),
                local_player,
                sync: SyncLoop::new(Duration::from_secs(config.sync.interval_secs)),
                effects,
                connected: AtomicBool::new(true),
                auto_tracking: AtomicBool::new(false),
            }),
        }
    }

    /// Subscribe to reconciliation results.
    pub fn subscribe(&self) -> broadcast::Receiver<Reconciliation> {
        self.inner.effects.subscribe()
    }

    /// The local player's id.
    pub fn local_player(&self) -> PlayerId {
        self.inner.local_player
    }

    /// Copy of the local player's record.
    pub async fn local_record(&self) -> Option<PlayerRecord> {
        self.inner.session.lock().await.player(self.inner.local_player).cloned()
    }

    /// Copy of the session.
    pub async fn session(&self) -> GameSession {
        self.inner.session.lock().await.clone()
    }

    /// Whether the sync loop is running.
    pub fn is_syncing(&self) -> bool {
        self.inner.sync.is_running()
    }

    // -----------------------------------------------------------------------
    // Seed generation
    // -----------------------------------------------------------------------

    /// Generate the seed as session admin.
    ///
    /// Runs the solver on the blocking pool. On failure the session rolls
    /// back to `Created`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Lifecycle`] if the local player may not
    /// generate, or [`ServiceError::Generation`] if every attempt failed.
    pub async fn generate_seed(&self, seed: &str) -> Result<SeedData, ServiceError> {
        let configs = self.inner.session.lock().await.begin_generation(self.inner.local_player)?;
        let generator = self.inner.generator.clone();
        let seed = seed.to_owned();
        let result = tokio::task::spawn_blocking(move || generator.generate(configs, &seed)).await;
        self.finish_generation(result, None).await
    }

    /// Re-derive the leader's seed from broadcast placement data and verify
    /// it against the leader's validation hash.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Generation`] with
    /// [`GenerationError::DesyncDetected`] if the hashes differ, and the
    /// same errors as [`generate_seed`](Self::generate_seed) otherwise.
    pub async fn regenerate_seed(
        &self,
        seed: &str,
        placement: Vec<PlacementData>,
        expected_hash: &str,
    ) -> Result<SeedData, ServiceError> {
        let configs = self.inner.session.lock().await.adopt_generation(self.inner.local_player)?;
        let generator = self.inner.generator.clone();
        let seed = seed.to_owned();
        let result =
            tokio::task::spawn_blocking(move || generator.regenerate(&seed, &placement, configs)).await;
        self.finish_generation(result, Some(expected_hash)).await
    }

    async fn finish_generation(
        &self,
        result: Result<Result<SeedData, GenerationError>, JoinError>,
        expected_hash: Option<&str>,
    ) -> Result<SeedData, ServiceError> {
        let outcome = match result {
            Ok(Ok(seed)) => match expected_hash {
                Some(expected) => SeedGenerator::verify_hash(&seed, expected)
                    .map(|()| seed)
                    .map_err(ServiceError::from),
                None => Ok(seed),
            },
            Ok(Err(err)) => Err(ServiceError::from(err)),
            Err(err) => Err(ServiceError::from(err)),
        };

        let mut session = self.inner.session.lock().await;
        match outcome {
            Ok(seed) => {
                let hash = seed.validation_hash();
                if let Err(err) = session.generation_succeeded(&seed, hash) {
                    error!(error = %err, "Generated seed does not fit the session");
                    session.generation_failed()?;
                    return Err(err.into());
                }
                self.inner.tracker.load_seed(&seed);
                Ok(seed)
            }
            Err(err) => {
                error!(error = %err, "Seed generation failed");
                session.generation_failed()?;
                Err(err)
            }
        }
    }

    /// The session's agreed validation hash.
    pub async fn validation_hash(&self) -> Option<String> {
        self.inner.session.lock().await.validation_hash().map(str::to_owned)
    }

    /// Validation hash of an arbitrary set of worlds.
    pub fn get_validation_hash(worlds: &[World]) -> String {
        validation_hash(worlds)
    }

    // -----------------------------------------------------------------------
    // Connection and tracking lifecycle
    // -----------------------------------------------------------------------

    /// The local auto-tracker is running: catch up on every remote player
    /// and start syncing.
    pub async fn on_auto_tracking_started(&self) {
        self.inner.auto_tracking.store(true, Ordering::Release);
        info!("Auto-tracking started");
        self.resync().await;
        if !self.start_sync() {
            self.inner.push().await;
        }
    }

    /// Dispatch one relay event.
    pub async fn handle_relay_event(&self, event: RelayEvent) {
        match event {
            RelayEvent::Connected => self.on_connected(),
            RelayEvent::Disconnected => self.on_disconnected(),
            RelayEvent::Reconnected => self.on_reconnected().await,
            RelayEvent::PlayerStateReceived { record } => {
                self.on_player_state_received(record).await;
            }
            RelayEvent::PlayerDied { world_id } => {
                self.on_player_died(world_id).await;
            }
            RelayEvent::StateRequested => self.inner.push().await,
        }
    }

    /// The relay connected.
    pub fn on_connected(&self) {
        self.inner.connected.store(true, Ordering::Release);
        self.start_sync();
    }

    /// The relay dropped. Stops the sync loop.
    pub fn on_disconnected(&self) {
        self.inner.connected.store(false, Ordering::Release);
        self.inner.sync.stop();
        warn!("Relay disconnected");
    }

    /// The relay came back: catch up and push once.
    pub async fn on_reconnected(&self) {
        self.inner.connected.store(true, Ordering::Release);
        info!("Relay reconnected");
        self.resync().await;
        if !self.start_sync() {
            self.inner.push().await;
        }
    }

    /// Stop syncing and release the session.
    pub fn dispose(&self) {
        self.inner.sync.stop();
        self.inner.connected.store(false, Ordering::Release);
        self.inner.auto_tracking.store(false, Ordering::Release);
        debug!("Multiplayer service disposed");
    }

    fn start_sync(&self) -> bool {
        if !self.inner.connected.load(Ordering::Acquire) || !self.inner.auto_tracking.load(Ordering::Acquire) {
            return false;
        }
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        self.inner.sync.start(move || {
            let weak = Weak::clone(&weak);
            async move {
                if let Some(inner) = weak.upgrade() {
                    inner.push().await;
                }
            }
        })
    }

    // -----------------------------------------------------------------------
    // Inbound updates
    // -----------------------------------------------------------------------

    /// Reconcile a remote player's record, apply the tracker effects and
    /// publish the result. Never fails: anomalies are logged and yield an
    /// empty result.
    pub async fn on_player_state_received(&self, incoming: PlayerRecord) -> Reconciliation {
        let result = {
            let mut session = self.inner.session.lock().await;
            let Some(local_world) = session.player(self.inner.local_player).map(|p| p.world_id) else {
                warn!("Local player missing from session");
                return Reconciliation::empty(incoming.world_id, incoming.player_name);
            };
            if incoming.world_id == local_world {
                debug!(world_id = %local_world, "Ignoring relay echo of local world");
                return Reconciliation::empty(incoming.world_id, incoming.player_name);
            }
            let previous = match session.apply_remote(&incoming) {
                Ok(previous) => previous,
                Err(err) => {
                    warn!(error = %err, "Dropping update");
                    return Reconciliation::empty(incoming.world_id, incoming.player_name);
                }
            };
            let Some(current) = session.player_by_world(incoming.world_id) else {
                return Reconciliation::empty(incoming.world_id, incoming.player_name);
            };
            let reconciler = Reconciler::new(local_world, session.send_items_on_complete, session.death_link);
            let result = reconciler.reconcile(Some(&previous), current, &self.inner.tracker.snapshot());
            self.inner.tracker.apply(&result.tracker_effects());
            result
        };
        self.publish(&result);
        result
    }

    /// A remote player died.
    pub async fn on_player_died(&self, world_id: WorldId) -> Reconciliation {
        let result = {
            let session = self.inner.session.lock().await;
            let Some(local_world) = session.player(self.inner.local_player).map(|p| p.world_id) else {
                return Reconciliation::empty(world_id, String::new());
            };
            let name = session
                .player_by_world(world_id)
                .map(|p| p.player_name.clone())
                .unwrap_or_default();
            Reconciler::new(local_world, session.send_items_on_complete, session.death_link)
                .reconcile_death(world_id, &name)
        };
        self.publish(&result);
        result
    }

    /// Catch up on every remote player as if their records were new.
    ///
    /// Already-cleared records are skipped, so nothing is granted twice.
    /// Items owed by players who left are still delivered, but their
    /// [`Effect::PlayerEndedGame`] is not announced again.
    pub async fn resync(&self) -> Vec<Reconciliation> {
        let results = {
            let session = self.inner.session.lock().await;
            if session.status() != GameStatus::Started {
                return Vec::new();
            }
            let Some(local_world) = session.player(self.inner.local_player).map(|p| p.world_id) else {
                return Vec::new();
            };
            let reconciler = Reconciler::new(local_world, session.send_items_on_complete, session.death_link);
            let mut results = Vec::new();
            for record in session.players().iter().filter(|p| p.world_id != local_world) {
                let mut result = reconciler.reconcile(None, record, &self.inner.tracker.snapshot());
                result
                    .effects
                    .retain(|effect| !matches!(effect, Effect::PlayerEndedGame { .. }));
                self.inner.tracker.apply(&result.tracker_effects());
                if !result.is_empty() {
                    results.push(result);
                }
            }
            results
        };
        info!(players = results.len(), "Resynced remote players");
        for result in &results {
            self.publish(result);
        }
        results
    }

    fn publish(&self, result: &Reconciliation) {
        if result.is_empty() {
            return;
        }
        if self.inner.effects.send(result.clone()).is_err() {
            trace!("No effect subscribers");
        }
    }

    // -----------------------------------------------------------------------
    // Local outcomes
    // -----------------------------------------------------------------------

    /// Push the local state now.
    pub async fn push_now(&self) {
        self.inner.push().await;
    }

    /// Forfeit the local player and tell the relay.
    ///
    /// Returns `false` if the player had already ended their game.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Lifecycle`] for illegal transitions, or
    /// [`ServiceError::Relay`] if the report fails.
    pub async fn forfeit_local_player(&self) -> Result<bool, ServiceError> {
        let (changed, world, status) = {
            let mut session = self.inner.session.lock().await;
            let changed = session.forfeit(self.inner.local_player)?;
            let world = session.player(self.inner.local_player).map(|p| p.world_id);
            (changed, world, session.status())
        };
        self.report_end(changed, world, status, PlayerStatus::Forfeited).await?;
        Ok(changed)
    }

    /// Mark the local player as completed and tell the relay.
    ///
    /// Returns `false` if the player had already ended their game.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Lifecycle`] unless the game has started, or
    /// [`ServiceError::Relay`] if the report fails.
    pub async fn complete_local_player(&self) -> Result<bool, ServiceError> {
        let (changed, world, status) = {
            let mut session = self.inner.session.lock().await;
            let changed = session.complete(self.inner.local_player)?;
            let world = session.player(self.inner.local_player).map(|p| p.world_id);
            (changed, world, session.status())
        };
        self.report_end(changed, world, status, PlayerStatus::Completed).await?;
        Ok(changed)
    }

    async fn report_end(
        &self,
        changed: bool,
        world: Option<WorldId>,
        status: GameStatus,
        outcome: PlayerStatus,
    ) -> Result<(), ServiceError> {
        let Some(world_id) = world.filter(|_| changed && status == GameStatus::Started) else {
            return Ok(());
        };
        self.inner.relay.report_game_ended(world_id, outcome).await?;
        self.inner.push().await;
        Ok(())
    }

    /// Tell the relay the local player died.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Relay`] if the report fails.
    pub async fn report_local_death(&self) -> Result<(), ServiceError> {
        let world = self.inner.session.lock().await.player(self.inner.local_player).map(|p| p.world_id);
        if let Some(world_id) = world {
            self.inner.relay.report_death(world_id).await?;
        }
        Ok(())
    }
}

impl Drop for MultiplayerService {
    fn drop(&mut self) {
        self.inner.sync.stop();
    }
}

impl Inner {
    /// Build the merged outbound state for the local world and send it.
    async fn push(&self) {
        let (world_id, state) = {
            let mut session = self.session.lock().await;
            if !matches!(session.status(), GameStatus::Created | GameStatus::Started) {
                return;
            }
            let Some(record) = session.player(self.local_player) else {
                return;
            };
            let world_id = record.world_id;
            let state = merge_for_world(record, &self.tracker.snapshot());
            if let Err(err) = session.record_outbound(self.local_player, &state) {
                warn!(error = %err, "Could not record outbound state");
            }
            (world_id, state)
        };
        match self.relay.send_player_world_update(world_id, state).await {
            Ok(()) => debug!(world_id = %world_id, "Pushed local state"),
            Err(err) => warn!(world_id = %world_id, error = %err, "Push failed"),
        }
    }
}
