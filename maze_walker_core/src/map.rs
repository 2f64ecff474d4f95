use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::Coordinate;

/// Represents errors that can occur within the grid operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("Coordinates {coordinate} are out of bounds for grid size ({width}, {height})")]
    OutOfBounds {
        coordinate: Coordinate,
        width: usize,
        height: usize,
    },
}

/// A generic 2D grid structure of fixed size.
///
/// Stores elements of type `T` in a flat vector using row-major order, so the
/// cell at `(x, y)` is row `y`, column `x`. Lookups take signed [`Coordinate`]s;
/// anything negative or past the edge is simply out of bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Creates a new grid with the specified dimensions, filled with default values.
    ///
    /// # Panics
    ///
    /// Panics if `width * height` overflows `usize`.
    pub fn new(width: usize, height: usize) -> Self
    where
        T: Default + Clone,
    {
        let size = width.checked_mul(height).expect("Grid size overflow");
        Grid {
            width,
            height,
            cells: vec![T::default(); size],
        }
    }

    /// Returns the width of the grid.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the height of the grid.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Converts a coordinate to a flat vector index.
    ///
    /// Returns `None` if the coordinate is out of bounds.
    #[inline]
    fn index_of(&self, coordinate: Coordinate) -> Option<usize> {
        let x = usize::try_from(coordinate.x).ok()?;
        let y = usize::try_from(coordinate.y).ok()?;
        if x < self.width && y < self.height {
            Some(y * self.width + x)
        } else {
            None
        }
    }

    #[inline]
    fn coordinate_of(&self, index: usize) -> Coordinate {
        // Grid dimensions come from `usize` but every in-bounds cell of a
        // level fits comfortably in `i32`.
        Coordinate::new((index % self.width) as i32, (index / self.width) as i32)
    }

    /// Checks if the given coordinate lies within `[0, width) × [0, height)`.
    #[inline]
    pub fn contains(&self, coordinate: Coordinate) -> bool {
        self.index_of(coordinate).is_some()
    }

    /// Builds the out-of-bounds error for `coordinate`.
    pub fn out_of_bounds(&self, coordinate: Coordinate) -> GridError {
        GridError::OutOfBounds {
            coordinate,
            width: self.width,
            height: self.height,
        }
    }

    /// Gets an immutable reference to the cell at the given coordinate.
    pub fn get(&self, coordinate: Coordinate) -> Option<&T> {
        self.index_of(coordinate).map(|index| &self.cells[index])
    }

    /// Returns an iterator that yields `(Coordinate, &T)` for each cell in row-major order.
    pub fn enumerate(&self) -> impl Iterator<Item = (Coordinate, &T)> {
        self.cells
            .iter()
            .enumerate()
            .map(move |(index, cell)| (self.coordinate_of(index), cell))
    }

    /// Returns an iterator over the rows of the grid, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[T]> {
        // `chunks` rejects a zero chunk size; a zero-width grid has no cells anyway.
        self.cells.chunks(self.width.max(1))
    }
}

impl<T> Index<Coordinate> for Grid<T> {
    type Output = T;

    #[inline]
    fn index(&self, coordinate: Coordinate) -> &Self::Output {
        match self.index_of(coordinate) {
            Some(idx) => &self.cells[idx],
            None => panic!(
                "Grid index {} out of bounds for grid size ({}, {})",
                coordinate, self.width, self.height
            ),
        }
    }
}

impl<T> IndexMut<Coordinate> for Grid<T> {
    #[inline]
    fn index_mut(&mut self, coordinate: Coordinate) -> &mut Self::Output {
        let width = self.width;
        let height = self.height;
        match self.index_of(coordinate) {
            Some(idx) => &mut self.cells[idx],
            None => panic!(
                "Grid index {} out of bounds for grid size ({}, {})",
                coordinate, width, height
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_and_far_coordinates_are_out_of_bounds() {
        let grid: Grid<u8> = Grid::new(3, 2);
        assert!(grid.contains(Coordinate::new(0, 0)));
        assert!(grid.contains(Coordinate::new(2, 1)));
        assert!(!grid.contains(Coordinate::new(-1, 0)));
        assert!(!grid.contains(Coordinate::new(0, -1)));
        assert!(!grid.contains(Coordinate::new(3, 0)));
        assert!(!grid.contains(Coordinate::new(0, 2)));
    }

    #[test]
    fn out_of_bounds_error_names_the_grid() {
        let mut grid: Grid<u8> = Grid::new(2, 2);
        assert_eq!(grid.get(Coordinate::new(5, 0)), None);
        assert_eq!(
            grid.out_of_bounds(Coordinate::new(5, 0)),
            GridError::OutOfBounds {
                coordinate: Coordinate::new(5, 0),
                width: 2,
                height: 2,
            }
        );
        grid[Coordinate::new(1, 1)] = 7;
        assert_eq!(grid.get(Coordinate::new(1, 1)), Some(&7));
    }

    #[test]
    fn enumerate_is_row_major() {
        let mut grid: Grid<u8> = Grid::new(2, 2);
        grid[Coordinate::new(1, 0)] = 1;
        grid[Coordinate::new(0, 1)] = 2;
        let cells: Vec<_> = grid.enumerate().map(|(c, v)| (c, *v)).collect();
        assert_eq!(
            cells,
            vec![
                (Coordinate::new(0, 0), 0),
                (Coordinate::new(1, 0), 1),
                (Coordinate::new(0, 1), 2),
                (Coordinate::new(1, 1), 0),
            ]
        );
        let rows: Vec<&[u8]> = grid.rows().collect();
        assert_eq!(rows, vec![&[0, 1][..], &[2, 0][..]]);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn indexing_outside_panics() {
        let grid: Grid<u8> = Grid::new(1, 1);
        let _ = grid[Coordinate::new(1, 0)];
    }
}
