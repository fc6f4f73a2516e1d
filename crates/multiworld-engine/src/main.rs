//! Hot-seat multiworld host.
//!
//! Runs every configured player as a separate client inside one process,
//! connected through an in-process relay hub. Useful for exercising seed
//! agreement and cross-world item delivery without a relay server.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `MULTIWORLD_CONFIG` or `multiworld.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Open the lobby and submit every player's config
//! 4. The first player generates; everyone else regenerates and verifies
//! 5. Connect all clients to the hub and start auto-tracking
//! 6. Play a few scripted turns, then end every player's game
//! 7. Log what each player received

mod error;
mod hub;

use std::path::PathBuf;
use std::sync::Arc;

use multiworld_core::config::{LogFormat, LoggingConfig, MultiworldConfig};
use multiworld_core::lifecycle::GameSession;
use multiworld_core::relay::ChannelRelay;
use multiworld_core::service::MultiplayerService;
use multiworld_core::shuffle::ShuffleSolver;
use multiworld_core::solver::PlacementSolver;
use multiworld_core::tracker::{InMemoryTracker, TrackerStore};
use multiworld_types::{GenerationConfig, LocationId, PlayerRecord, WorldId};
use multiworld_world::fnv1a;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::hub::Hub;

/// Locations each player clears before the game ends.
const TURNS: usize = 6;

struct Client {
    name: String,
    world_id: WorldId,
    service: Arc<MultiplayerService>,
    tracker: Arc<InMemoryTracker>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (config, source) = load_config()?;
    init_logging(&config.logging);
    match source {
        Some(path) => info!(path = %path.display(), "Configuration loaded"),
        None => warn!("Config file not found, using defaults"),
    }
    info!(
        seed = config.game.seed,
        players = config.game.players.len(),
        relay_url = config.relay.url,
        "multiworld-engine starting"
    );

    run(&config).await?;
    info!("multiworld-engine shutdown complete");
    Ok(())
}

#[allow(clippy::too_many_lines)]
async fn run(config: &MultiworldConfig) -> Result<(), EngineError> {
    // Lobby.
    let mut session = GameSession::new(config.session.death_link, config.session.send_items_on_complete);
    for player in &config.game.players {
        let id = session.add_player(&player.name, player.phonetic_name.as_deref())?;
        let mut generation = GenerationConfig::new(player.name.as_str());
        generation.settings = player.settings.clone();
        session.submit_config(id, generation)?;
    }
    if session.players().is_empty() {
        return Err(EngineError::NoPlayers);
    }

    let solver: Arc<dyn PlacementSolver> = Arc::new(ShuffleSolver::new());
    let mut clients = Vec::new();
    let mut outboxes: Vec<UnboundedReceiver<_>> = Vec::new();
    for record in session.players() {
        let (relay, outbox) = ChannelRelay::new();
        let tracker = Arc::new(InMemoryTracker::new());
        let service = MultiplayerService::new(
            config,
            session.clone(),
            record.player_id,
            Arc::clone(&solver),
            Arc::new(relay),
            Arc::clone(&tracker) as Arc<dyn TrackerStore>,
        );
        clients.push(Client {
            name: record.player_name.clone(),
            world_id: record.world_id,
            service: Arc::new(service),
            tracker,
        });
        outboxes.push(outbox);
    }

    // Seed agreement.
    let Some((leader, followers)) = clients.split_first() else {
        return Err(EngineError::NoPlayers);
    };
    let seed = leader.service.generate_seed(&config.game.seed).await?;
    let hash = seed.validation_hash();
    info!(leader = leader.name, hash, "Seed generated");
    for follower in followers {
        follower
            .service
            .regenerate_seed(&config.game.seed, seed.placement_data(), &hash)
            .await?;
        info!(player = follower.name, "Seed verified");
    }

    // Connect everyone.
    let roster = leader.service.session().await.players().to_vec();
    let mut hub = Hub::new(&roster);
    for (client, outbox) in clients.iter().zip(outboxes) {
        hub.register(client.world_id, Arc::clone(&client.service), outbox);
    }
    for client in &clients {
        client.service.on_auto_tracking_started().await;
    }
    hub.pump().await;

    // Each player clears locations of their own world in a seeded order.
    let mut rng = StdRng::seed_from_u64(u64::from(fnv1a(&config.game.seed)));
    let plans: Vec<Vec<LocationId>> = clients
        .iter()
        .map(|client| {
            let mut ids: Vec<LocationId> = client
                .tracker
                .snapshot()
                .locations_in(client.world_id)
                .map(|record| record.location_id)
                .collect();
            ids.shuffle(&mut rng);
            ids
        })
        .collect();
    for turn in 0..TURNS {
        for (client, plan) in clients.iter().zip(&plans) {
            if let Some(&location) = plan.get(turn) {
                client.tracker.autotrack_location(client.world_id, location);
                client.service.push_now().await;
            }
        }
        let delivered = hub.pump().await;
        info!(turn, delivered, "Turn played");
    }

    // The last player gives up, everyone else finishes.
    if let Some((last, rest)) = clients.split_last() {
        if !rest.is_empty() {
            last.service.forfeit_local_player().await?;
            hub.pump().await;
        }
        for client in rest {
            client.service.complete_local_player().await?;
            hub.pump().await;
        }
    }

    for client in &clients {
        let received = client.tracker.received_items();
        info!(
            player = client.name,
            world_id = %client.world_id,
            status = ?hub.record(client.world_id).map(PlayerRecord::status),
            received = received.len(),
            items = ?received.iter().map(|r| r.item).collect::<Vec<_>>(),
            "Items received"
        );
        client.service.dispose();
    }
    Ok(())
}

/// Load configuration from `MULTIWORLD_CONFIG`, falling back to
/// `multiworld.yaml` in the working directory, then to defaults.
///
/// Returns the path the configuration was read from, if any.
fn load_config() -> Result<(MultiworldConfig, Option<PathBuf>), EngineError> {
    let path = std::env::var_os("MULTIWORLD_CONFIG").map_or_else(|| PathBuf::from("multiworld.yaml"), PathBuf::from);
    if path.exists() {
        let config = MultiworldConfig::from_file(&path)?;
        Ok((config, Some(path)))
    } else {
        Ok((MultiworldConfig::parse("")?, None))
    }
}

fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    match config.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Plain => builder.init(),
    }
}
