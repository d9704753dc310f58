//! Row-major 2-D grid with an explicit size, origin top left.

use crate::error::{BitmapError, Result};
use crate::palette::Color;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Matrix<T> {
    width: usize,
    height: usize,
    cells: Vec<T>,
}

/// Palette indices after tile reassembly
pub type IndexMatrix = Matrix<u32>;

/// Colours after palette lookup
pub type ColorMatrix = Matrix<Color>;

impl<T> Matrix<T> {
    /// Build from rows that must all have the same length
    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        let mut cells = Vec::with_capacity(width * height);
        for (y, row) in rows.into_iter().enumerate() {
            if row.len() != width {
                return Err(BitmapError::IncompleteMatrix {
                    x: row.len().min(width),
                    y,
                    width,
                    height,
                });
            }
            cells.extend(row);
        }
        Ok(Matrix {
            width,
            height,
            cells,
        })
    }

    pub(crate) fn from_cells(width: usize, height: usize, cells: Vec<T>) -> Self {
        debug_assert_eq!(cells.len(), width * height);
        Matrix {
            width,
            height,
            cells,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// `(width, height)`
    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.cells.get(y * self.width + x)
    }

    /// All cells in row-major order
    pub fn cells(&self) -> &[T] {
        &self.cells
    }

    pub fn rows(&self) -> impl Iterator<Item = &[T]> + '_ {
        (0..self.height).map(move |y| &self.cells[y * self.width..(y + 1) * self.width])
    }

    /// Cells with their `(x, y)` coordinates
    pub fn enumerate(&self) -> impl Iterator<Item = (usize, usize, &T)> + '_ {
        let width = self.width;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, cell)| (i % width, i / width, cell))
    }

    /// Map every cell, stopping at the first failure
    pub fn try_map<U, E, F>(&self, mut f: F) -> std::result::Result<Matrix<U>, E>
    where
        F: FnMut(usize, usize, &T) -> std::result::Result<U, E>,
    {
        let cells = self
            .enumerate()
            .map(|(x, y, cell)| f(x, y, cell))
            .collect::<std::result::Result<Vec<U>, E>>()?;
        Ok(Matrix::from_cells(self.width, self.height, cells))
    }
}

impl<T: Clone> Matrix<T> {
    pub fn to_rows(&self) -> Vec<Vec<T>> {
        self.rows().map(<[T]>::to_vec).collect()
    }
}
