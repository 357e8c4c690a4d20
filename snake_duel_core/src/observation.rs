use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{PlayerId, Position, map::Grid};

/// Contents of one board cell as seen by policies and renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Cell {
    #[default]
    Empty,
    Player1,
    Player2,
    Apple,
}

impl Cell {
    /// Numeric code: 0 empty, 1 player 1, 2 player 2, 3 apple.
    pub fn code(self) -> u8 {
        match self {
            Cell::Empty => 0,
            Cell::Player1 => 1,
            Cell::Player2 => 2,
            Cell::Apple => 3,
        }
    }

    pub fn of_player(player: PlayerId) -> Cell {
        match player {
            PlayerId::One => Cell::Player1,
            PlayerId::Two => Cell::Player2,
        }
    }

    pub fn owner(self) -> Option<PlayerId> {
        match self {
            Cell::Player1 => Some(PlayerId::One),
            Cell::Player2 => Some(PlayerId::Two),
            _ => None,
        }
    }

    fn symbol(self) -> char {
        match self {
            Cell::Empty => '.',
            Cell::Player1 => 'S',
            Cell::Player2 => 'O',
            Cell::Apple => 'A',
        }
    }
}

/// Full-board snapshot handed to action sources and renderers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    grid: Grid<Cell>,
}

impl Observation {
    pub(crate) fn new(grid: Grid<Cell>) -> Self {
        Observation { grid }
    }

    pub fn size(&self) -> usize {
        self.grid.size()
    }

    /// `None` outside the board.
    pub fn cell(&self, position: Position) -> Option<Cell> {
        self.grid.get(position).copied()
    }

    pub fn grid(&self) -> &Grid<Cell> {
        &self.grid
    }

    /// The board as rows of numeric cell codes.
    pub fn to_codes(&self) -> Vec<Vec<u8>> {
        self.grid
            .rows()
            .map(|row| row.iter().map(|cell| cell.code()).collect())
            .collect()
    }

    pub fn apple(&self) -> Option<Position> {
        self.grid
            .enumerate()
            .find_map(|(position, cell)| (*cell == Cell::Apple).then_some(position))
    }

    pub fn cells_of(&self, player: PlayerId) -> impl Iterator<Item = Position> + '_ {
        let wanted = Cell::of_player(player);
        self.grid
            .enumerate()
            .filter_map(move |(position, cell)| (*cell == wanted).then_some(position))
    }
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.grid.rows() {
            for cell in row {
                write!(f, "{}", cell.symbol())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
