//! Per-player session records and generation configs.

use serde::{Deserialize, Serialize};

use crate::enums::PlayerStatus;
use crate::ids::{PlayerId, WorldId};
use crate::state::PlayerWorldState;

/// A player's generation settings.
///
/// `settings` is opaque to the multiworld layer and handed to the placement
/// solver untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// World id assigned to this config (sequential, set at generation).
    pub world_id: WorldId,
    /// Display name of the player the config belongs to.
    pub player_name: String,
    /// Whether this is the local (requesting) player's config.
    #[serde(default)]
    pub is_local: bool,
    /// Solver-specific settings.
    #[serde(default)]
    pub settings: serde_json::Value,
}

impl GenerationConfig {
    /// Create a config with default settings and an unassigned world id.
    pub fn new(player_name: impl Into<String>) -> Self {
        Self {
            world_id: WorldId::default(),
            player_name: player_name.into(),
            is_local: false,
            settings: serde_json::Value::Null,
        }
    }
}

/// A player participating in a multiplayer session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    /// Session-scoped player identifier.
    pub player_id: PlayerId,
    /// World id of the player's generated world.
    pub world_id: WorldId,
    /// Display name.
    pub player_name: String,
    /// Pronunciation hint for voice output.
    pub phonetic_name: String,
    /// Whether the player administers the session.
    #[serde(default)]
    pub is_admin: bool,
    /// Whether the player currently has a relay connection.
    #[serde(default)]
    pub is_connected: bool,
    /// Submitted generation config, set once.
    #[serde(default)]
    pub config: Option<GenerationConfig>,
    /// One-way flag: the player gave up.
    #[serde(default)]
    pub has_forfeited: bool,
    /// One-way flag: the player finished their game.
    #[serde(default)]
    pub has_completed: bool,
    /// Last progress snapshot received for (or sent by) the player.
    #[serde(default)]
    pub last_known_state: PlayerWorldState,
}

impl PlayerRecord {
    /// Create a fresh, active, non-admin player record.
    pub fn new(player_id: PlayerId, world_id: WorldId, player_name: impl Into<String>) -> Self {
        let player_name = player_name.into();
        Self {
            player_id,
            world_id,
            phonetic_name: player_name.clone(),
            player_name,
            is_admin: false,
            is_connected: true,
            config: None,
            has_forfeited: false,
            has_completed: false,
            last_known_state: PlayerWorldState::new(),
        }
    }

    /// Derive the player's terminal status from the sticky flags.
    ///
    /// Forfeiture takes precedence if a corrupted record carries both flags.
    pub const fn status(&self) -> PlayerStatus {
        if self.has_forfeited {
            PlayerStatus::Forfeited
        } else if self.has_completed {
            PlayerStatus::Completed
        } else {
            PlayerStatus::Active
        }
    }

    /// Whether the player has left the game, either way.
    pub const fn has_ended(&self) -> bool {
        self.has_forfeited || self.has_completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_is_active() {
        let record = PlayerRecord::new(PlayerId::new(), WorldId(2), "Samus");
        assert_eq!(record.status(), PlayerStatus::Active);
        assert!(!record.has_ended());
        assert_eq!(record.phonetic_name, "Samus");
    }

    #[test]
    fn forfeiture_wins_over_completion() {
        let mut record = PlayerRecord::new(PlayerId::new(), WorldId(0), "Link");
        record.has_completed = true;
        assert_eq!(record.status(), PlayerStatus::Completed);
        record.has_forfeited = true;
        assert_eq!(record.status(), PlayerStatus::Forfeited);
        assert!(record.has_ended());
    }

    #[test]
    fn record_defaults_missing_fields() {
        let json = serde_json::json!({
            "player_id": PlayerId::new(),
            "world_id": 1,
            "player_name": "Zelda",
            "phonetic_name": "Zelda",
        });
        let record: Result<PlayerRecord, _> = serde_json::from_value(json);
        let record = record.ok();
        assert!(record.as_ref().is_some_and(|r| !r.has_forfeited && r.config.is_none()));
        assert!(record.is_some_and(|r| r.last_known_state == PlayerWorldState::new()));
    }
}
