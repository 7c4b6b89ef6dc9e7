//! Error types for the game core, sync and relay.

/// Spawning a target failed. Never fatal: the session skips the spawn.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SpawnError {
    #[error("no overlap-free placement after {attempts} attempts")]
    PlacementExhausted { attempts: u32 },

    #[error("live target limit {limit} reached")]
    PoolFull { limit: usize },
}

/// Construction of the game failed and it cannot run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StartupError {
    #[error("no target templates available")]
    NoTemplates,

    #[error("no spawn paths available")]
    NoPaths,

    #[error("invalid game configuration: {0}")]
    InvalidConfig(String),
}

/// An outbound sync message could not be queued.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SyncError {
    #[error("reliable score channel is full")]
    ScoreQueueFull,

    #[error("sync channel closed")]
    ChannelClosed,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LeaderboardError {
    #[error("player identity is empty")]
    EmptyIdentity,

    #[error("leaderboard unavailable: {0}")]
    Unavailable(String),
}

/// Relay server errors
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("invalid relay configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to bind: {0}")]
    Bind(#[source] std::io::Error),

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}
