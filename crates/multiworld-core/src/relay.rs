//! Relay seam: outbound messages and inbound events.
//!
//! The relay is an already-authenticated connection that broadcasts player
//! state between clients. Only message shapes matter here; encoding and
//! transport belong to the implementation. [`ChannelRelay`] is an in-process
//! implementation backed by a tokio channel.

use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::{BoxFuture, FutureExt};
use multiworld_types::{PlayerRecord, PlayerStatus, PlayerWorldState, WorldId};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Errors raised when talking to the relay.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The relay is not connected.
    #[error("relay is not connected")]
    NotConnected,

    /// The relay connection closed.
    #[error("relay connection closed")]
    Closed,

    /// The relay rejected a message.
    #[error("relay rejected message: {message}")]
    Rejected {
        /// Reason given by the relay.
        message: String,
    },
}

/// Inbound notifications from the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayEvent {
    /// The connection is up.
    Connected,
    /// The connection dropped.
    Disconnected,
    /// The connection came back after a drop.
    Reconnected,
    /// A player's record changed.
    PlayerStateReceived {
        /// The player's latest record.
        record: PlayerRecord,
    },
    /// A player died.
    PlayerDied {
        /// World of the player.
        world_id: WorldId,
    },
    /// The relay wants the local player's current state.
    StateRequested,
}

/// Outbound messages, as delivered by [`ChannelRelay`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayMessage {
    /// Progress snapshot for a world.
    PlayerWorldUpdate {
        /// The world.
        world_id: WorldId,
        /// Its merged state.
        state: PlayerWorldState,
    },
    /// The local player died.
    Death {
        /// The local world.
        world_id: WorldId,
    },
    /// The local player forfeited or completed.
    GameEnded {
        /// The local world.
        world_id: WorldId,
        /// `Forfeited` or `Completed`.
        outcome: PlayerStatus,
    },
}

/// Outbound side of the relay connection.
pub trait Relay: Send + Sync {
    /// Push a world's progress snapshot.
    fn send_player_world_update(
        &self,
        world_id: WorldId,
        state: PlayerWorldState,
    ) -> BoxFuture<'_, Result<(), RelayError>>;

    /// Report that the local player died.
    fn report_death(&self, world_id: WorldId) -> BoxFuture<'_, Result<(), RelayError>>;

    /// Report that the local player forfeited or completed.
    fn report_game_ended(
        &self,
        world_id: WorldId,
        outcome: PlayerStatus,
    ) -> BoxFuture<'_, Result<(), RelayError>>;
}

/// Relay that forwards every message into an unbounded channel.
#[derive(Debug)]
pub struct ChannelRelay {
    tx: mpsc::UnboundedSender<RelayMessage>,
    connected: AtomicBool,
}

impl ChannelRelay {
    /// Create a connected relay and the receiver for its messages.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RelayMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                connected: AtomicBool::new(true),
            },
            rx,
        )
    }

    /// Simulate the connection going up or down.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
    }

    /// Whether the relay accepts messages.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn send(&self, message: RelayMessage) -> BoxFuture<'_, Result<(), RelayError>> {
        let result = if self.is_connected() {
            self.tx.send(message).or(Err(RelayError::Closed))
        } else {
            Err(RelayError::NotConnected)
        };
        futures::future::ready(result).boxed()
    }
}

impl Relay for ChannelRelay {
    fn send_player_world_update(
        &self,
        world_id: WorldId,
        state: PlayerWorldState,
    ) -> BoxFuture<'_, Result<(), RelayError>> {
        self.send(RelayMessage::PlayerWorldUpdate { world_id, state })
    }

    fn report_death(&self, world_id: WorldId) -> BoxFuture<'_, Result<(), RelayError>> {
        self.send(RelayMessage::Death { world_id })
    }

    fn report_game_ended(
        &self,
        world_id: WorldId,
        outcome: PlayerStatus,
    ) -> BoxFuture<'_, Result<(), RelayError>> {
        self.send(RelayMessage::GameEnded { world_id, outcome })
    }
}
