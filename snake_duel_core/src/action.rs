use serde::{Deserialize, Serialize};

use crate::{DuelError, PlayerId, Position};

/// A move for one snake on one tick.
///
/// The discriminants are the wire encoding: 0 up, 1 right, 2 down, 3 left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Up = 0,
    Right = 1,
    Down = 2,
    Left = 3,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Up, Action::Right, Action::Down, Action::Left];

    /// Unit displacement as `(d_row, d_col)`.
    pub fn delta(self) -> (isize, isize) {
        match self {
            Action::Up => (-1, 0),
            Action::Right => (0, 1),
            Action::Down => (1, 0),
            Action::Left => (0, -1),
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Decodes the integer encoding, attributing a bad value to `player`.
    pub fn decode(player: PlayerId, value: i64) -> Result<Action, DuelError> {
        match value {
            0 => Ok(Action::Up),
            1 => Ok(Action::Right),
            2 => Ok(Action::Down),
            3 => Ok(Action::Left),
            _ => Err(DuelError::InvalidAction { player, value }),
        }
    }

    /// The action pointing the other way (same axis, opposite sign).
    pub fn reversed(self) -> Action {
        match self {
            Action::Up => Action::Down,
            Action::Right => Action::Left,
            Action::Down => Action::Up,
            Action::Left => Action::Right,
        }
    }

    /// Cell reached by moving one step from `from`, or `None` if it would
    /// leave the board through the top or left edge.
    pub fn apply(self, from: Position) -> Option<Position> {
        let (d_row, d_col) = self.delta();
        from.offset(d_row, d_col)
    }

    /// The action that moves `from` onto the adjacent cell `to`, if any.
    pub fn between(from: Position, to: Position) -> Option<Action> {
        Action::ALL
            .into_iter()
            .find(|action| action.apply(from) == Some(to))
    }
}
