use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

pub mod action;
pub mod config;
pub mod environment;
pub mod error;
pub mod map;
pub mod observation;
pub mod policy;

pub use action::Action;
pub use config::DuelConfig;
pub use environment::{Info, Outcome, SnakeDuel, Step};
pub use error::DuelError;
pub use observation::{Cell, Observation};

/// Represents a cell coordinate on the board. Rows grow downward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub const fn new(row: usize, col: usize) -> Self {
        Position { row, col }
    }

    /// Applies a signed displacement, returning `None` if either coordinate
    /// would become negative. The upper bound is the board's business.
    pub fn offset(self, d_row: isize, d_col: isize) -> Option<Position> {
        Some(Position {
            row: self.row.checked_add_signed(d_row)?,
            col: self.col.checked_add_signed(d_col)?,
        })
    }
}

/// Identifies one of the two competing snakes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PlayerId {
    One,
    Two,
}

impl PlayerId {
    pub const ALL: [PlayerId; 2] = [PlayerId::One, PlayerId::Two];

    /// The stable numeric id (1 or 2), also the player's observation code.
    pub fn number(self) -> u8 {
        match self {
            PlayerId::One => 1,
            PlayerId::Two => 2,
        }
    }

    pub fn opponent(self) -> PlayerId {
        match self {
            PlayerId::One => PlayerId::Two,
            PlayerId::Two => PlayerId::One,
        }
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "player {}", self.number())
    }
}

/// A value for each player, indexable by `PlayerId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PerPlayer<T> {
    pub one: T,
    pub two: T,
}

impl<T> PerPlayer<T> {
    pub fn new(one: T, two: T) -> Self {
        PerPlayer { one, two }
    }

    pub fn splat(value: T) -> Self
    where
        T: Clone,
    {
        PerPlayer {
            one: value.clone(),
            two: value,
        }
    }

    pub fn map<U, F>(self, mut f: F) -> PerPlayer<U>
    where
        F: FnMut(PlayerId, T) -> U,
    {
        PerPlayer {
            one: f(PlayerId::One, self.one),
            two: f(PlayerId::Two, self.two),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlayerId, &T)> {
        [(PlayerId::One, &self.one), (PlayerId::Two, &self.two)].into_iter()
    }
}

impl<T> Index<PlayerId> for PerPlayer<T> {
    type Output = T;

    fn index(&self, player: PlayerId) -> &T {
        match player {
            PlayerId::One => &self.one,
            PlayerId::Two => &self.two,
        }
    }
}

impl<T> IndexMut<PlayerId> for PerPlayer<T> {
    fn index_mut(&mut self, player: PlayerId) -> &mut T {
        match player {
            PlayerId::One => &mut self.one,
            PlayerId::Two => &mut self.two,
        }
    }
}

/// One action per player for a single tick.
pub type Actions = PerPlayer<Action>;
