//! Game session state machine.
//!
//! ```text
//! Created --(admin)--> Generating --(success)--> Started
//!    ^                     |
//!    +------(failure)------+
//! ```
//!
//! Per player, `Active` moves to either `Forfeited` or `Completed`. Both are
//! terminal and whichever is set first wins; asking for the other later is a
//! no-op rather than an error.

use chrono::{DateTime, Utc};
use multiworld_types::{
    GameId, GameStatus, GenerationConfig, PlayerId, PlayerRecord, PlayerStatus, PlayerWorldState,
    WorldId,
};
use multiworld_world::SeedData;
use tracing::{info, warn};

/// Errors raised by illegal lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// The operation is not legal in the current status.
    #[error("cannot {operation} while game is {status}")]
    InvalidTransition {
        /// Current status.
        status: GameStatus,
        /// What was attempted.
        operation: &'static str,
    },

    /// Only the admin may do this.
    #[error("player {player} is not the session admin")]
    NotAdmin {
        /// The requesting player.
        player: PlayerId,
    },

    /// No such player in the session.
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),

    /// No player owns this world.
    #[error("no player owns world {0}")]
    UnknownWorld(WorldId),

    /// A player with this name already joined.
    #[error("player name {0:?} is already taken")]
    NameTaken(String),

    /// The player already submitted a config.
    #[error("player {0} already submitted a config")]
    ConfigAlreadySubmitted(PlayerId),

    /// Generation was requested before every player submitted a config.
    #[error("player {0} has not submitted a config")]
    MissingConfig(PlayerId),
}

/// A multiplayer game session.
#[derive(Debug, Clone)]
pub struct GameSession {
    /// Session id.
    pub game_id: GameId,
    status: GameStatus,
    seed: Option<String>,
    validation_hash: Option<String>,
    /// Whether deaths propagate between players.
    pub death_link: bool,
    /// Whether completing players deliver outstanding items.
    pub send_items_on_complete: bool,
    players: Vec<PlayerRecord>,
    created_at: DateTime<Utc>,
}

impl GameSession {
    /// Create a session in `Created` with no players.
    pub fn new(death_link: bool, send_items_on_complete: bool) -> Self {
        Self {
            game_id: GameId::new(),
            status: GameStatus::Created,
            seed: None,
            validation_hash: None,
            death_link,
            send_items_on_complete,
            players: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Current status.
    pub const fn status(&self) -> GameStatus {
        self.status
    }

    /// Seed string, once generation succeeded.
    pub fn seed(&self) -> Option<&str> {
        self.seed.as_deref()
    }

    /// Agreed validation hash, once generation succeeded.
    pub fn validation_hash(&self) -> Option<&str> {
        self.validation_hash.as_deref()
    }

    /// All players in join order.
    pub fn players(&self) -> &[PlayerRecord] {
        &self.players
    }

    /// Look up a player by id.
    pub fn player(&self, id: PlayerId) -> Option<&PlayerRecord> {
        self.players.iter().find(|p| p.player_id == id)
    }

    /// Look up a player by world id.
    pub fn player_by_world(&self, world_id: WorldId) -> Option<&PlayerRecord> {
        self.players.iter().find(|p| p.world_id == world_id)
    }

    fn player_mut(&mut self, id: PlayerId) -> Result<&mut PlayerRecord, LifecycleError> {
        self.players
            .iter_mut()
            .find(|p| p.player_id == id)
            .ok_or(LifecycleError::UnknownPlayer(id))
    }

    fn require(&self, status: GameStatus, operation: &'static str) -> Result<(), LifecycleError> {
        if self.status == status {
            Ok(())
        } else {
            Err(LifecycleError::InvalidTransition {
                status: self.status,
                operation,
            })
        }
    }

    // -----------------------------------------------------------------------
    // Joining
    // -----------------------------------------------------------------------

    /// Add a player. The first player to join becomes admin.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] unless `Created`, or
    /// [`LifecycleError::NameTaken`] for a duplicate name.
    pub fn add_player(&mut self, name: &str, phonetic_name: Option<&str>) -> Result<PlayerId, LifecycleError> {
        self.require(GameStatus::Created, "join")?;
        if self.players.iter().any(|p| p.player_name.eq_ignore_ascii_case(name)) {
            return Err(LifecycleError::NameTaken(name.to_owned()));
        }
        let world_id = WorldId(u32::try_from(self.players.len()).unwrap_or(u32::MAX));
        let mut record = PlayerRecord::new(PlayerId::new(), world_id, name);
        if let Some(phonetic) = phonetic_name {
            phonetic.clone_into(&mut record.phonetic_name);
        }
        record.is_admin = self.players.is_empty();
        let id = record.player_id;
        info!(player = %id, name, admin = record.is_admin, "Player joined");
        self.players.push(record);
        Ok(id)
    }

    /// Record a player's generation config. Configs are submitted once.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::ConfigAlreadySubmitted`] on a second
    /// submission, or [`LifecycleError::InvalidTransition`] unless `Created`.
    pub fn submit_config(&mut self, player: PlayerId, mut config: GenerationConfig) -> Result<(), LifecycleError> {
        self.require(GameStatus::Created, "submit a config")?;
        let record = self.player_mut(player)?;
        if record.config.is_some() {
            return Err(LifecycleError::ConfigAlreadySubmitted(player));
        }
        config.player_name.clone_from(&record.player_name);
        record.config = Some(config);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Generation
    // -----------------------------------------------------------------------

    /// Admin request to start generating. Returns the configs in player
    /// order with world ids assigned sequentially.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotAdmin`], [`LifecycleError::MissingConfig`]
    /// or [`LifecycleError::InvalidTransition`].
    pub fn begin_generation(&mut self, requester: PlayerId) -> Result<Vec<GenerationConfig>, LifecycleError> {
        self.require(GameStatus::Created, "generate")?;
        if !self.player(requester).ok_or(LifecycleError::UnknownPlayer(requester))?.is_admin {
            return Err(LifecycleError::NotAdmin { player: requester });
        }
        self.enter_generating(requester)
    }

    /// Follow the admin into generation after the relay announced it.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::MissingConfig`] or
    /// [`LifecycleError::InvalidTransition`] once `Started`.
    pub fn adopt_generation(&mut self, local: PlayerId) -> Result<Vec<GenerationConfig>, LifecycleError> {
        if self.status == GameStatus::Started {
            return Err(LifecycleError::InvalidTransition {
                status: self.status,
                operation: "regenerate",
            });
        }
        self.enter_generating(local)
    }

    fn enter_generating(&mut self, local: PlayerId) -> Result<Vec<GenerationConfig>, LifecycleError> {
        if let Some(missing) = self.players.iter().find(|p| p.config.is_none()) {
            return Err(LifecycleError::MissingConfig(missing.player_id));
        }
        let mut configs = Vec::with_capacity(self.players.len());
        for (index, player) in self.players.iter_mut().enumerate() {
            player.world_id = WorldId(u32::try_from(index).unwrap_or(u32::MAX));
            if let Some(config) = player.config.as_mut() {
                config.world_id = player.world_id;
                config.is_local = player.player_id == local;
                configs.push(config.clone());
            }
        }
        self.status = GameStatus::Generating;
        info!(game = %self.game_id, players = configs.len(), "Generation started");
        Ok(configs)
    }

    /// Roll back to `Created` after a failed generation.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] unless `Generating`.
    pub fn generation_failed(&mut self) -> Result<(), LifecycleError> {
        self.require(GameStatus::Generating, "roll back generation")?;
        self.status = GameStatus::Created;
        warn!(game = %self.game_id, "Generation failed, session back to Created");
        Ok(())
    }

    /// Move to `Started` and give every player their default state.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] unless `Generating`, or
    /// [`LifecycleError::UnknownWorld`] if a player has no world in `seed`.
    pub fn generation_succeeded(&mut self, seed: &SeedData, hash: String) -> Result<(), LifecycleError> {
        self.require(GameStatus::Generating, "start")?;
        if let Some(player) = self.players.iter().find(|player| seed.world(player.world_id).is_none()) {
            return Err(LifecycleError::UnknownWorld(player.world_id));
        }
        for player in &mut self.players {
            if let Some(world) = seed.world(player.world_id) {
                player.last_known_state = world.default_state(&seed.worlds);
            }
        }
        info!(
            game = %self.game_id,
            hash = %hash,
            lobby_secs = Utc::now().signed_duration_since(self.created_at).num_seconds(),
            "Game started"
        );
        self.seed = Some(seed.seed.clone());
        self.validation_hash = Some(hash);
        self.status = GameStatus::Started;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Per-player end of game
    // -----------------------------------------------------------------------

    /// Forfeit a player.
    ///
    /// Before the game starts this removes the player. Afterwards it sets
    /// the sticky flag; returns `false` if the player already ended. An
    /// admin who forfeits hands admin to the first remaining active player.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::UnknownPlayer`], or
    /// [`LifecycleError::InvalidTransition`] while `Generating`.
    pub fn forfeit(&mut self, player: PlayerId) -> Result<bool, LifecycleError> {
        match self.status {
            GameStatus::Created => {
                let index = self
                    .players
                    .iter()
                    .position(|p| p.player_id == player)
                    .ok_or(LifecycleError::UnknownPlayer(player))?;
                let removed = self.players.remove(index);
                info!(player = %player, "Player left before start");
                if removed.is_admin {
                    self.hand_over_admin();
                }
                Ok(true)
            }
            GameStatus::Generating => Err(LifecycleError::InvalidTransition {
                status: self.status,
                operation: "forfeit",
            }),
            GameStatus::Started => {
                let record = self.player_mut(player)?;
                if record.has_ended() {
                    return Ok(false);
                }
                record.has_forfeited = true;
                let was_admin = record.is_admin;
                if was_admin {
                    record.is_admin = false;
                    self.hand_over_admin();
                }
                info!(player = %player, "Player forfeited");
                Ok(true)
            }
        }
    }

    /// Mark a player as having completed their game. Returns `false` if the
    /// player already ended.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] unless `Started`.
    pub fn complete(&mut self, player: PlayerId) -> Result<bool, LifecycleError> {
        self.require(GameStatus::Started, "complete")?;
        let record = self.player_mut(player)?;
        if record.has_ended() {
            return Ok(false);
        }
        record.has_completed = true;
        info!(player = %player, "Player completed");
        Ok(true)
    }

    fn hand_over_admin(&mut self) {
        if let Some(next) = self.players.iter_mut().find(|p| p.status() == PlayerStatus::Active) {
            next.is_admin = true;
            info!(player = %next.player_id, "Admin handed over");
        }
    }

    // -----------------------------------------------------------------------
    // Remote updates
    // -----------------------------------------------------------------------

    /// Fold a record received from the relay into the session.
    ///
    /// Snapshots merge monotonically and end-of-game flags never revert;
    /// if the stored record already ended, the incoming flags are ignored.
    /// Returns the stored record as it was before the update.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::UnknownWorld`] if no player owns the world.
    pub fn apply_remote(&mut self, incoming: &PlayerRecord) -> Result<PlayerRecord, LifecycleError> {
        let record = self
            .players
            .iter_mut()
            .find(|p| p.world_id == incoming.world_id)
            .ok_or(LifecycleError::UnknownWorld(incoming.world_id))?;
        let previous = record.clone();
        record.last_known_state.merge(&incoming.last_known_state);
        record.is_connected = incoming.is_connected;
        if !record.has_ended() {
            if incoming.has_forfeited {
                record.has_forfeited = true;
            } else if incoming.has_completed {
                record.has_completed = true;
            }
        }
        Ok(previous)
    }

    /// Overwrite a player's last known state with a merged snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::UnknownPlayer`] for an unknown player.
    pub fn record_outbound(
        &mut self,
        player: PlayerId,
        state: &PlayerWorldState,
    ) -> Result<(), LifecycleError> {
        self.player_mut(player)?.last_known_state.merge(state);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use multiworld_types::{ItemType, LocationId};

    use super::*;
    use crate::generator::SeedGenerator;
    use crate::shuffle::ShuffleSolver;

    fn session_with(names: &[&str]) -> (GameSession, Vec<PlayerId>) {
        let mut session = GameSession::new(false, true);
        let ids: Vec<_> = names
            .iter()
            .map(|&name| {
                let id = session.add_player(name, None).unwrap();
                session.submit_config(id, GenerationConfig::new(name)).unwrap();
                id
            })
            .collect();
        (session, ids)
    }

    fn started(names: &[&str]) -> (GameSession, Vec<PlayerId>) {
        let (mut session, ids) = session_with(names);
        let admin = *ids.first().unwrap();
        let configs = session.begin_generation(admin).unwrap();
        let seed = SeedGenerator::new(Arc::new(ShuffleSolver::new()), 3)
            .generate(configs, "s")
            .unwrap();
        let hash = seed.validation_hash();
        session.generation_succeeded(&seed, hash).unwrap();
        (session, ids)
    }

    #[test]
    fn first_player_is_admin_and_names_are_unique() {
        let (mut session, ids) = session_with(&["Alice", "Bob"]);
        assert!(session.player(*ids.first().unwrap()).unwrap().is_admin);
        assert!(!session.player(*ids.get(1).unwrap()).unwrap().is_admin);
        assert!(matches!(session.add_player("alice", None), Err(LifecycleError::NameTaken(_))));
    }

    #[test]
    fn config_is_submitted_once() {
        let (mut session, ids) = session_with(&["Alice"]);
        let result = session.submit_config(*ids.first().unwrap(), GenerationConfig::new("x"));
        assert!(matches!(result, Err(LifecycleError::ConfigAlreadySubmitted(_))));
    }

    #[test]
    fn only_admin_may_generate() {
        let (mut session, ids) = session_with(&["Alice", "Bob"]);
        let result = session.begin_generation(*ids.get(1).unwrap());
        assert!(matches!(result, Err(LifecycleError::NotAdmin { .. })));
        assert_eq!(session.status(), GameStatus::Created);
    }

    #[test]
    fn generation_requires_every_config() {
        let mut session = GameSession::new(false, true);
        let admin = session.add_player("Alice", None).unwrap();
        assert!(matches!(
            session.begin_generation(admin),
            Err(LifecycleError::MissingConfig(id)) if id == admin
        ));
    }

    #[test]
    fn failed_generation_rolls_back() {
        let (mut session, ids) = session_with(&["Alice", "Bob"]);
        let configs = session.begin_generation(*ids.first().unwrap()).unwrap();
        assert_eq!(configs.len(), 2);
        assert!(configs.first().unwrap().is_local);
        assert_eq!(configs.get(1).unwrap().world_id, WorldId(1));
        assert_eq!(session.status(), GameStatus::Generating);
        assert!(session.add_player("Carol", None).is_err());
        session.generation_failed().unwrap();
        assert_eq!(session.status(), GameStatus::Created);
        assert!(session.generation_failed().is_err());
    }

    #[test]
    fn successful_generation_starts_with_default_state() {
        let (session, _) = started(&["Alice", "Bob"]);
        assert_eq!(session.status(), GameStatus::Started);
        assert!(session.validation_hash().is_some());
        let bob = session.player_by_world(WorldId(1)).unwrap();
        assert_eq!(bob.last_known_state.locations.len(), 28);
        assert!(bob.last_known_state.items.values().all(|&v| v == 0));
    }

    #[test]
    fn seed_missing_a_world_changes_nothing() {
        let (mut session, ids) = session_with(&["Alice", "Bob"]);
        let mut configs = session.begin_generation(*ids.first().unwrap()).unwrap();
        configs.truncate(1);
        let partial = SeedGenerator::new(Arc::new(ShuffleSolver::new()), 1)
            .generate(configs, "s")
            .unwrap();

        let hash = partial.validation_hash();
        assert!(matches!(
            session.generation_succeeded(&partial, hash),
            Err(LifecycleError::UnknownWorld(world)) if world == WorldId(1)
        ));
        assert_eq!(session.status(), GameStatus::Generating);
        assert!(session.validation_hash().is_none());
        let alice = session.player_by_world(WorldId(0)).unwrap();
        assert!(alice.last_known_state.locations.is_empty());

        session.generation_failed().unwrap();
        assert_eq!(session.status(), GameStatus::Created);
    }

    #[test]
    fn forfeit_before_start_removes_and_hands_over_admin() {
        let (mut session, ids) = session_with(&["Alice", "Bob"]);
        assert!(session.forfeit(*ids.first().unwrap()).unwrap());
        assert_eq!(session.players().len(), 1);
        assert!(session.player(*ids.get(1).unwrap()).unwrap().is_admin);
    }

    #[test]
    fn first_end_flag_wins() {
        let (mut session, ids) = started(&["Alice", "Bob"]);
        let bob = *ids.get(1).unwrap();
        assert!(session.complete(bob).unwrap());
        assert!(!session.forfeit(bob).unwrap());
        let record = session.player(bob).unwrap();
        assert!(record.has_completed && !record.has_forfeited);
    }

    #[test]
    fn admin_forfeit_hands_over_after_start() {
        let (mut session, ids) = started(&["Alice", "Bob"]);
        assert!(session.forfeit(*ids.first().unwrap()).unwrap());
        assert!(session.player(*ids.get(1).unwrap()).unwrap().is_admin);
        assert!(!session.player(*ids.first().unwrap()).unwrap().is_admin);
    }

    #[test]
    fn remote_flags_are_sticky_and_state_monotonic() {
        let (mut session, _) = started(&["Alice", "Bob"]);
        let mut incoming = session.player_by_world(WorldId(1)).unwrap().clone();
        incoming.has_forfeited = true;
        incoming.last_known_state.locations.insert(LocationId(3), true);
        incoming.last_known_state.items.insert(ItemType::Missile, 4);
        let previous = session.apply_remote(&incoming).unwrap();
        assert!(!previous.has_forfeited);

        // Stale replay with flags cleared and lower values.
        let mut stale = incoming.clone();
        stale.has_forfeited = false;
        stale.has_completed = true;
        stale.last_known_state.locations.insert(LocationId(3), false);
        stale.last_known_state.items.insert(ItemType::Missile, 1);
        session.apply_remote(&stale).unwrap();

        let record = session.player_by_world(WorldId(1)).unwrap();
        assert!(record.has_forfeited);
        assert!(!record.has_completed);
        assert!(record.last_known_state.is_location_tracked(LocationId(3)));
        assert_eq!(record.last_known_state.item_value(ItemType::Missile), 4);
    }

    #[test]
    fn unknown_world_rejected() {
        let (mut session, _) = started(&["Alice"]);
        let stranger = PlayerRecord::new(PlayerId::new(), WorldId(7), "Eve");
        assert!(matches!(
            session.apply_remote(&stranger),
            Err(LifecycleError::UnknownWorld(_))
        ));
    }
}
