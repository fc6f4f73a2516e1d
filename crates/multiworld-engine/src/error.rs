//! Error types for the engine binary.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: multiworld_core::config::ConfigError,
    },

    /// A session rule was violated while setting up the lobby.
    #[error("lobby error: {source}")]
    Lobby {
        /// The underlying lifecycle error.
        #[from]
        source: multiworld_core::lifecycle::LifecycleError,
    },

    /// Generation, regeneration or a relay report failed.
    #[error("session error: {source}")]
    Service {
        /// The underlying service error.
        #[from]
        source: multiworld_core::service::ServiceError,
    },

    /// The configuration lists no players.
    #[error("no players configured under game.players")]
    NoPlayers,
}
