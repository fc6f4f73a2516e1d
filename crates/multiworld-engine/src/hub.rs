//! In-process relay hub.
//!
//! Plays the part of the relay server for a hot-seat game: it keeps the
//! authoritative record of every player, folds each outbound message into
//! it and fans the resulting event out to every other peer.

use std::collections::BTreeMap;
use std::sync::Arc;

use multiworld_core::relay::{RelayEvent, RelayMessage};
use multiworld_core::service::MultiplayerService;
use multiworld_types::{PlayerRecord, PlayerStatus, WorldId};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, warn};

struct Peer {
    world_id: WorldId,
    service: Arc<MultiplayerService>,
    outbox: UnboundedReceiver<RelayMessage>,
}

/// Relay hub connecting every local client.
pub struct Hub {
    records: BTreeMap<WorldId, PlayerRecord>,
    peers: Vec<Peer>,
}

impl Hub {
    /// Create a hub seeded with the started session's roster.
    pub fn new(roster: &[PlayerRecord]) -> Self {
        Self {
            records: roster.iter().map(|record| (record.world_id, record.clone())).collect(),
            peers: Vec::new(),
        }
    }

    /// Connect a client and the receiving end of its relay.
    pub fn register(
        &mut self,
        world_id: WorldId,
        service: Arc<MultiplayerService>,
        outbox: UnboundedReceiver<RelayMessage>,
    ) {
        self.peers.push(Peer {
            world_id,
            service,
            outbox,
        });
    }

    /// Current record of a player as the hub sees it.
    pub fn record(&self, world_id: WorldId) -> Option<&PlayerRecord> {
        self.records.get(&world_id)
    }

    /// Deliver queued messages until every outbox is empty. Returns the
    /// number of events handed to peers.
    pub async fn pump(&mut self) -> usize {
        let mut delivered = 0_usize;
        loop {
            tokio::task::yield_now().await;
            let mut pending = Vec::new();
            for peer in &mut self.peers {
                while let Ok(message) = peer.outbox.try_recv() {
                    pending.push(message);
                }
            }
            if pending.is_empty() {
                break;
            }
            for message in pending {
                delivered = delivered.saturating_add(self.deliver(message).await);
            }
        }
        delivered
    }

    async fn deliver(&mut self, message: RelayMessage) -> usize {
        let (origin, event) = match message {
            RelayMessage::PlayerWorldUpdate { world_id, state } => {
                let Some(record) = self.records.get_mut(&world_id) else {
                    warn!(world_id = %world_id, "Update for unknown world");
                    return 0;
                };
                record.last_known_state.merge(&state);
                (world_id, RelayEvent::PlayerStateReceived { record: record.clone() })
            }
            RelayMessage::Death { world_id } => (world_id, RelayEvent::PlayerDied { world_id }),
            RelayMessage::GameEnded { world_id, outcome } => {
                let Some(record) = self.records.get_mut(&world_id) else {
                    warn!(world_id = %world_id, "Game end for unknown world");
                    return 0;
                };
                if !record.has_ended() {
                    match outcome {
                        PlayerStatus::Forfeited => record.has_forfeited = true,
                        PlayerStatus::Completed => record.has_completed = true,
                        PlayerStatus::Active => {}
                    }
                }
                (world_id, RelayEvent::PlayerStateReceived { record: record.clone() })
            }
        };

        let mut delivered = 0_usize;
        for peer in self.peers.iter().filter(|peer| peer.world_id != origin) {
            peer.service.handle_relay_event(event.clone()).await;
            delivered = delivered.saturating_add(1);
        }
        debug!(origin = %origin, delivered, "Relayed message");
        delivered
    }
}
