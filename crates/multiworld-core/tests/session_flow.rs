//! End-to-end session flow between a leader and a follower.
//!
//! Each client owns its own service, tracker and in-process relay. Relay
//! traffic is carried between them by hand so every step stays
//! deterministic.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::missing_panics_doc,
    clippy::too_many_lines,
    clippy::indexing_slicing
)]

use std::collections::BTreeMap;
use std::sync::Arc;

use multiworld_core::config::MultiworldConfig;
use multiworld_core::effects::Effect;
use multiworld_core::generator::GenerationError;
use multiworld_core::lifecycle::GameSession;
use multiworld_core::relay::{ChannelRelay, RelayEvent, RelayMessage};
use multiworld_core::service::{MultiplayerService, ServiceError};
use multiworld_core::shuffle::ShuffleSolver;
use multiworld_core::solver::{PlacementSolver, SolverError};
use multiworld_core::tracker::{InMemoryTracker, TrackerStore};
use multiworld_types::{
    GameStatus, GenerationConfig, ItemCategory, ItemType, LocationRecord, PlayerId, PlayerStatus,
    WorldId,
};
use multiworld_world::{PlacementData, SeedData, World};
use tokio::sync::mpsc::UnboundedReceiver;

const SEED: &str = "session-flow";

struct Client {
    service: MultiplayerService,
    tracker: Arc<InMemoryTracker>,
    outbox: UnboundedReceiver<RelayMessage>,
}

/// Solver that loses every world but the first.
struct DroppingSolver;

impl PlacementSolver for DroppingSolver {
    fn generate_worlds(&self, configs: &[GenerationConfig], seed: &str) -> Result<Vec<World>, SolverError> {
        let mut worlds = ShuffleSolver::new().generate_worlds(configs, seed)?;
        worlds.truncate(1);
        Ok(worlds)
    }

    fn generate_worlds_from_placement(
        &self,
        configs: &[GenerationConfig],
        seed: &str,
        placement: &BTreeMap<WorldId, PlacementData>,
    ) -> Result<Vec<World>, SolverError> {
        ShuffleSolver::new().generate_worlds_from_placement(configs, seed, placement)
    }
}

fn lobby() -> (GameSession, PlayerId, PlayerId) {
    lobby_with(false, true)
}

fn lobby_with(death_link: bool, send_items_on_complete: bool) -> (GameSession, PlayerId, PlayerId) {
    let mut session = GameSession::new(death_link, send_items_on_complete);
    let alice = session.add_player("Alice", None).unwrap();
    let bob = session.add_player("Bob", Some("Bobby")).unwrap();
    session.submit_config(alice, GenerationConfig::new("Alice")).unwrap();
    session.submit_config(bob, GenerationConfig::new("Bob")).unwrap();
    (session, alice, bob)
}

fn client(session: GameSession, player: PlayerId) -> Client {
    client_with(session, player, Arc::new(ShuffleSolver::new()))
}

fn client_with(session: GameSession, player: PlayerId, solver: Arc<dyn PlacementSolver>) -> Client {
    let (relay, outbox) = ChannelRelay::new();
    let tracker = Arc::new(InMemoryTracker::new());
    let service = MultiplayerService::new(
        &MultiworldConfig::default(),
        session,
        player,
        solver,
        Arc::new(relay),
        Arc::clone(&tracker) as Arc<dyn TrackerStore>,
    );
    Client {
        service,
        tracker,
        outbox,
    }
}

/// Leader generates, follower regenerates and verifies.
async fn started() -> (Client, Client) {
    let (leader, follower, _) = started_from(lobby()).await;
    (leader, follower)
}

async fn started_from((session, alice, bob): (GameSession, PlayerId, PlayerId)) -> (Client, Client, SeedData) {
    let leader = client(session.clone(), alice);
    let follower = client(session, bob);

    let seed = leader.service.generate_seed(SEED).await.unwrap();
    let hash = leader.service.validation_hash().await.unwrap();
    follower
        .service
        .regenerate_seed(SEED, seed.placement_data(), &hash)
        .await
        .unwrap();
    (leader, follower, seed)
}

/// A location in `world` holding an item owned by `owner`.
fn foreign_location(tracker: &InMemoryTracker, world: WorldId, owner: WorldId) -> LocationRecord {
    tracker
        .snapshot()
        .locations_in(world)
        .find(|record| record.item_world_id == owner)
        .cloned()
        .expect("shuffled seed places a foreign item")
}

#[tokio::test]
async fn follower_agrees_on_validation_hash() {
    let (leader, follower) = started().await;
    let leader_hash = leader.service.validation_hash().await;
    assert!(leader_hash.is_some());
    assert_eq!(leader_hash, follower.service.validation_hash().await);
    assert_eq!(leader.service.session().await.status(), GameStatus::Started);
    assert_eq!(follower.service.session().await.status(), GameStatus::Started);

    // Both trackers hold every location of both worlds.
    assert_eq!(leader.tracker.snapshot().locations.len(), 56);
    assert_eq!(follower.tracker.snapshot(), leader.tracker.snapshot());
}

#[tokio::test]
async fn cleared_remote_location_grants_item_once() {
    let (mut leader, follower) = started().await;

    // A location in Alice's world holding one of Bob's items.
    let target = foreign_location(&leader.tracker, WorldId(0), WorldId(1));
    assert!(leader.tracker.autotrack_location(WorldId(0), target.location_id));

    leader.service.push_now().await;
    match leader.outbox.recv().await {
        Some(RelayMessage::PlayerWorldUpdate { world_id, state }) => {
            assert_eq!(world_id, WorldId(0));
            assert_eq!(state.locations.get(&target.location_id), Some(&true));
        }
        other => panic!("expected a world update, got {other:?}"),
    }

    let record = leader.service.local_record().await.unwrap();
    let result = follower.service.on_player_state_received(record.clone()).await;
    assert_eq!(
        result.effects,
        vec![
            Effect::GiveItem {
                item: target.item,
                to_world: WorldId(1),
                from_world: WorldId(0),
                location: target.location_id,
            },
            Effect::MarkLocationCleared {
                world_id: WorldId(0),
                location_id: target.location_id,
            },
        ]
    );
    assert_eq!(follower.tracker.received_items().len(), 1);

    // Replaying the same record changes nothing.
    let replay = follower.service.on_player_state_received(record).await;
    assert!(replay.is_empty());
    assert_eq!(follower.tracker.received_items().len(), 1);
}

#[tokio::test]
async fn forfeit_reveals_every_location_without_filler() {
    let (leader, mut follower) = started().await;
    let mut effects = leader.service.subscribe();

    assert!(follower.service.forfeit_local_player().await.unwrap());
    assert!(!follower.service.forfeit_local_player().await.unwrap());
    assert!(matches!(
        follower.outbox.recv().await,
        Some(RelayMessage::GameEnded {
            world_id: WorldId(1),
            outcome: PlayerStatus::Forfeited
        })
    ));

    let record = follower.service.local_record().await.unwrap();
    assert!(record.has_forfeited);
    let result = leader.service.on_player_state_received(record).await;

    let cleared = result
        .effects
        .iter()
        .filter(|effect| matches!(effect, Effect::MarkLocationCleared { world_id: WorldId(1), .. }))
        .count();
    assert_eq!(cleared, 28);
    for item in result.granted_items() {
        assert!(!item.is_in_category(ItemCategory::IgnoreOnMultiplayerCompletion));
        assert_ne!(item, ItemType::Nothing);
    }
    assert_eq!(
        result.effects.last(),
        Some(&Effect::PlayerEndedGame {
            world_id: WorldId(1),
            outcome: PlayerStatus::Forfeited,
            deliver_items: true,
        })
    );

    let published = effects.recv().await.unwrap();
    assert_eq!(published, result);

    // Later updates from a player who left are ignored.
    let again = follower.service.local_record().await.unwrap();
    assert!(leader.service.on_player_state_received(again).await.is_empty());
}

#[tokio::test]
async fn wrong_hash_rolls_back_to_created() {
    let (session, alice, bob) = lobby();
    let leader = client(session.clone(), alice);
    let follower = client(session, bob);
    let seed = leader.service.generate_seed(SEED).await.unwrap();

    let err = follower
        .service
        .regenerate_seed(SEED, seed.placement_data(), "00000000000000000000000000000000")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Generation(GenerationError::DesyncDetected { .. })
    ));
    let session = follower.service.session().await;
    assert_eq!(session.status(), GameStatus::Created);
    assert!(session.validation_hash().is_none());
}

#[tokio::test]
async fn only_admin_generates() {
    let (session, _alice, bob) = lobby();
    let follower = client(session, bob);
    let err = follower.service.generate_seed(SEED).await.unwrap_err();
    assert!(matches!(err, ServiceError::Lifecycle(_)));
    assert_eq!(follower.service.session().await.status(), GameStatus::Created);
}

#[tokio::test]
async fn sync_follows_connection_state() {
    let (mut leader, _follower) = started().await;
    assert!(!leader.service.is_syncing());

    leader.service.on_auto_tracking_started().await;
    assert!(leader.service.is_syncing());
    assert!(matches!(
        leader.outbox.recv().await,
        Some(RelayMessage::PlayerWorldUpdate { world_id: WorldId(0), .. })
    ));

    leader.service.handle_relay_event(RelayEvent::Disconnected).await;
    assert!(!leader.service.is_syncing());

    leader.service.handle_relay_event(RelayEvent::Reconnected).await;
    assert!(leader.service.is_syncing());

    leader.service.dispose();
    assert!(!leader.service.is_syncing());
}

#[tokio::test]
async fn death_link_is_off_by_default() {
    let (leader, _follower) = started().await;
    let result = leader.service.on_player_died(WorldId(1)).await;
    assert!(result.is_empty());
}

#[tokio::test]
async fn generation_missing_a_world_can_be_retried() {
    let (session, alice, _bob) = lobby();
    let leader = client_with(session, alice, Arc::new(DroppingSolver));

    let err = leader.service.generate_seed(SEED).await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Generation(GenerationError::ExhaustedRetries { .. })
    ));
    let session = leader.service.session().await;
    assert_eq!(session.status(), GameStatus::Created);
    assert!(session.validation_hash().is_none());
    assert!(leader.tracker.snapshot().locations.is_empty());

    // The admin may try again and hits the same generation failure.
    let again = leader.service.generate_seed(SEED).await.unwrap_err();
    assert!(matches!(again, ServiceError::Generation(_)));
    assert_eq!(leader.service.session().await.status(), GameStatus::Created);
}

#[tokio::test]
async fn resync_grants_missed_items_once() {
    let (mut leader, follower, seed) = started_from(lobby()).await;
    let target = foreign_location(&leader.tracker, WorldId(0), WorldId(1));
    assert!(leader.tracker.autotrack_location(WorldId(0), target.location_id));
    leader.service.push_now().await;
    assert!(leader.outbox.recv().await.is_some());
    let record = leader.service.local_record().await.unwrap();
    follower.service.on_player_state_received(record).await;

    // Bob's client restarts with a fresh tracker and its last session.
    let bob = follower.service.local_player();
    let mut rejoined = client(follower.service.session().await, bob);
    rejoined.tracker.load_seed(&seed);
    let mut effects = rejoined.service.subscribe();

    let results = rejoined.service.resync().await;
    assert_eq!(results.len(), 1);
    let caught_up = results.first().unwrap();
    assert_eq!(caught_up.world_id, WorldId(0));
    assert_eq!(caught_up.granted_items().collect::<Vec<_>>(), vec![target.item]);
    assert_eq!(rejoined.tracker.received_items().len(), 1);
    assert_eq!(&effects.recv().await.unwrap(), caught_up);

    // Reconnecting catches up again without granting anything new.
    rejoined.service.handle_relay_event(RelayEvent::Reconnected).await;
    assert_eq!(rejoined.tracker.received_items().len(), 1);
    assert!(effects.try_recv().is_err());
    assert!(matches!(
        rejoined.outbox.recv().await,
        Some(RelayMessage::PlayerWorldUpdate { world_id: WorldId(1), .. })
    ));
    assert!(rejoined.service.resync().await.is_empty());
}

#[tokio::test]
async fn state_request_pushes_once() {
    let (mut leader, _follower) = started().await;
    leader.service.handle_relay_event(RelayEvent::StateRequested).await;

    match leader.outbox.recv().await {
        Some(RelayMessage::PlayerWorldUpdate { world_id, state }) => {
            assert_eq!(world_id, WorldId(0));
            assert_eq!(state.locations.len(), 28);
        }
        other => panic!("expected a world update, got {other:?}"),
    }
    assert!(leader.outbox.try_recv().is_err());
    assert!(!leader.service.is_syncing());
}

#[tokio::test]
async fn death_link_relays_remote_deaths() {
    let (leader, _follower, _) = started_from(lobby_with(true, true)).await;
    let mut effects = leader.service.subscribe();

    let result = leader.service.on_player_died(WorldId(1)).await;
    assert_eq!(result.effects, vec![Effect::DeathLink { world_id: WorldId(1) }]);
    assert_eq!(result.player_name, "Bob");
    assert_eq!(effects.recv().await.unwrap(), result);

    // A relay echo of our own death does nothing.
    assert!(leader.service.on_player_died(WorldId(0)).await.is_empty());
    assert!(effects.try_recv().is_err());
}

#[tokio::test]
async fn completion_delivers_outstanding_items() {
    let (leader, mut follower) = started().await;

    assert!(follower.service.complete_local_player().await.unwrap());
    assert!(!follower.service.complete_local_player().await.unwrap());
    assert!(!follower.service.forfeit_local_player().await.unwrap());
    assert!(matches!(
        follower.outbox.recv().await,
        Some(RelayMessage::GameEnded {
            world_id: WorldId(1),
            outcome: PlayerStatus::Completed
        })
    ));
    assert!(matches!(
        follower.outbox.recv().await,
        Some(RelayMessage::PlayerWorldUpdate { world_id: WorldId(1), .. })
    ));
    assert!(follower.outbox.try_recv().is_err());

    let record = follower.service.local_record().await.unwrap();
    assert!(record.has_completed);
    assert!(!record.has_forfeited);
    let result = leader.service.on_player_state_received(record).await;
    let cleared = result
        .effects
        .iter()
        .filter(|effect| matches!(effect, Effect::MarkLocationCleared { world_id: WorldId(1), .. }))
        .count();
    assert_eq!(cleared, 28);
    assert_eq!(
        leader.tracker.received_items().len(),
        result.granted_items().count()
    );
    assert_eq!(
        result.effects.last(),
        Some(&Effect::PlayerEndedGame {
            world_id: WorldId(1),
            outcome: PlayerStatus::Completed,
            deliver_items: true,
        })
    );
}

#[tokio::test]
async fn completion_without_delivery_reveals_nothing() {
    let (leader, follower, _) = started_from(lobby_with(false, false)).await;
    assert!(follower.service.complete_local_player().await.unwrap());

    let record = follower.service.local_record().await.unwrap();
    let result = leader.service.on_player_state_received(record).await;
    assert!(!result
        .effects
        .iter()
        .any(|effect| matches!(effect, Effect::GiveItem { .. } | Effect::MarkLocationCleared { .. })));
    assert_eq!(
        result.effects.last(),
        Some(&Effect::PlayerEndedGame {
            world_id: WorldId(1),
            outcome: PlayerStatus::Completed,
            deliver_items: false,
        })
    );
    assert!(leader.tracker.received_items().is_empty());
}

#[tokio::test]
async fn completion_requires_a_started_game() {
    let (session, alice, _bob) = lobby();
    let leader = client(session, alice);
    let err = leader.service.complete_local_player().await.unwrap_err();
    assert!(matches!(err, ServiceError::Lifecycle(_)));
}

#[tokio::test]
async fn reconnect_does_not_repeat_game_end() {
    let (leader, follower) = started().await;
    assert!(follower.service.forfeit_local_player().await.unwrap());
    let record = follower.service.local_record().await.unwrap();
    let first = leader.service.on_player_state_received(record).await;
    assert!(first
        .effects
        .iter()
        .any(|effect| matches!(effect, Effect::PlayerEndedGame { .. })));

    let mut effects = leader.service.subscribe();
    leader.service.handle_relay_event(RelayEvent::Reconnected).await;
    assert!(effects.try_recv().is_err());
    assert!(leader.service.resync().await.is_empty());
}
