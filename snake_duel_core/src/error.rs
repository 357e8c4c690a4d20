use crate::{PlayerId, map::GridError};

/// Errors surfaced by the simulation core.
///
/// Collisions and a missing apple are ordinary outcomes reported through
/// [`Step`](crate::Step), never errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DuelError {
    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    #[error("Invalid action {value} for {player}: expected 0 (up), 1 (right), 2 (down) or 3 (left)")]
    InvalidAction { player: PlayerId, value: i64 },

    #[error("Invalid snapshot: {reason}")]
    InvalidSnapshot { reason: String },

    #[error(transparent)]
    Grid(#[from] GridError),
}
