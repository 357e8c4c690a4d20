use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::Position;

/// Represents errors that can occur within the grid operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("Cell ({row}, {col}) is out of bounds for a {size}x{size} board")]
    OutOfBounds { row: usize, col: usize, size: usize },
}

/// A generic square grid.
///
/// Stores elements of type `T` in a flat vector using row-major order and is
/// addressed by `(row, col)`, row 0 being the top of the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid<T> {
    size: usize,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Creates a `size` x `size` grid filled with default values.
    ///
    /// # Panics
    ///
    /// Panics if `size * size` overflows `usize`.
    pub fn new(size: usize) -> Self
    where
        T: Default + Clone,
    {
        let len = size.checked_mul(size).expect("Grid size overflow");
        Grid {
            size,
            cells: vec![T::default(); len],
        }
    }

    /// Creates a grid filled by a generator called with each cell position.
    ///
    /// # Panics
    ///
    /// Panics if `size * size` overflows `usize`.
    pub fn from_generator<F>(size: usize, mut f: F) -> Self
    where
        F: FnMut(Position) -> T,
    {
        let len = size.checked_mul(size).expect("Grid size overflow");
        let mut cells = Vec::with_capacity(len);
        for row in 0..size {
            for col in 0..size {
                cells.push(f(Position { row, col }));
            }
        }
        Grid { size, cells }
    }

    /// Side length of the board.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    fn position_to_index(&self, position: Position) -> Option<usize> {
        if self.contains(position) {
            Some(position.row * self.size + position.col)
        } else {
            None
        }
    }

    #[inline]
    fn index_to_position(&self, index: usize) -> Position {
        Position {
            row: index / self.size,
            col: index % self.size,
        }
    }

    /// Checks if the position lies on the board.
    #[inline]
    pub fn contains(&self, position: Position) -> bool {
        position.row < self.size && position.col < self.size
    }

    /// Returns `None` if the position is out of bounds.
    pub fn get(&self, position: Position) -> Option<&T> {
        let index = self.position_to_index(position)?;
        self.cells.get(index)
    }

    /// Sets the value of the cell at the given position.
    pub fn set(&mut self, position: Position, value: T) -> Result<(), GridError> {
        let index = self
            .position_to_index(position)
            .ok_or(GridError::OutOfBounds {
                row: position.row,
                col: position.col,
                size: self.size,
            })?;
        self.cells[index] = value;
        Ok(())
    }

    /// Iterates over `(position, &cell)` pairs in row-major order.
    pub fn enumerate(&self) -> impl Iterator<Item = (Position, &T)> {
        self.cells
            .iter()
            .enumerate()
            .map(move |(index, cell)| (self.index_to_position(index), cell))
    }

    /// Iterates over the rows of the grid, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[T]> {
        // chunks(0) panics, and an empty board has no rows anyway
        self.cells.chunks(self.size.max(1))
    }
}

impl<T> Index<Position> for Grid<T> {
    type Output = T;

    #[inline]
    fn index(&self, position: Position) -> &Self::Output {
        match self.position_to_index(position) {
            Some(idx) => &self.cells[idx],
            None => panic!(
                "Grid index ({}, {}) out of bounds for a {}x{} board",
                position.row, position.col, self.size, self.size
            ),
        }
    }
}

impl<T> IndexMut<Position> for Grid<T> {
    #[inline]
    fn index_mut(&mut self, position: Position) -> &mut Self::Output {
        let size = self.size;
        match self.position_to_index(position) {
            Some(idx) => &mut self.cells[idx],
            None => panic!(
                "Grid index ({}, {}) out of bounds for a {}x{} board",
                position.row, position.col, size, size
            ),
        }
    }
}
