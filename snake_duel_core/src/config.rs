use serde::{Deserialize, Serialize};

use crate::DuelError;

/// Board size and reward table, fixed for the lifetime of a `SnakeDuel`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DuelConfig {
    /// Side length of the square board. Must be at least 2.
    pub board_size: usize,
    /// Paid to each snake every tick it survives.
    pub survival_reward: f32,
    /// Added to the survival reward on the tick a snake eats the apple.
    pub resource_bonus: f32,
    /// Paid to the survivor when exactly one snake dies.
    pub win_reward: f32,
    /// Paid to every snake that dies.
    pub loss_reward: f32,
}

impl Default for DuelConfig {
    fn default() -> Self {
        DuelConfig {
            board_size: 10,
            survival_reward: 0.01,
            resource_bonus: 0.5,
            win_reward: 1.0,
            loss_reward: -1.0,
        }
    }
}

impl DuelConfig {
    pub fn with_board_size(board_size: usize) -> Self {
        DuelConfig {
            board_size,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), DuelError> {
        if self.board_size < 2 {
            return Err(DuelError::InvalidConfiguration {
                reason: format!("board_size must be at least 2, got {}", self.board_size),
            });
        }
        let rewards = [
            ("survival_reward", self.survival_reward),
            ("resource_bonus", self.resource_bonus),
            ("win_reward", self.win_reward),
            ("loss_reward", self.loss_reward),
        ];
        for (name, value) in rewards {
            if !value.is_finite() {
                return Err(DuelError::InvalidConfiguration {
                    reason: format!("{name} must be finite, got {value}"),
                });
            }
        }
        Ok(())
    }
}
