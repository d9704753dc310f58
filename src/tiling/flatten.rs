use log::debug;

use super::TileNode;
use crate::error::{BitmapError, Result};
use crate::matrix::{IndexMatrix, Matrix};

/// Absolute top-left coordinate of the tile being walked
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Offset {
    pub x: usize,
    pub y: usize,
}

impl Offset {
    fn shifted(self, dx: usize, dy: usize) -> Self {
        Offset {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Bounding size of a walked subtree
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Extent {
    width: usize,
    height: usize,
}

/// Sparse output; rows appear as the walk first reaches them
#[derive(Default)]
struct Canvas {
    rows: Vec<Vec<Option<u32>>>,
}

impl Canvas {
    fn place(&mut self, at: Offset, index: u32) {
        if self.rows.len() <= at.y {
            self.rows.resize_with(at.y + 1, Vec::new);
        }
        let row = &mut self.rows[at.y];
        if row.len() <= at.x {
            row.resize(at.x + 1, None);
        }
        row[at.x] = Some(index);
    }

    fn cell(&self, x: usize, y: usize) -> Option<u32> {
        self.rows.get(y).and_then(|row| row.get(x)).copied().flatten()
    }
}

fn walk(node: &TileNode, origin: Offset, canvas: &mut Canvas) -> Extent {
    match node {
        TileNode::Leaf(index) => {
            canvas.place(origin, *index);
            Extent {
                width: 1,
                height: 1,
            }
        }
        TileNode::Grid(rows) => {
            let mut width = 0;
            let mut local_y = 0;
            for row in rows {
                let mut local_x = 0;
                let mut row_height = 0;
                for cell in row {
                    let child = walk(cell, origin.shifted(local_x, local_y), canvas);
                    local_x += child.width;
                    row_height = row_height.max(child.height);
                }
                width = width.max(local_x);
                local_y += row_height;
            }
            Extent {
                width,
                height: local_y,
            }
        }
    }
}

/// Write every leaf of `root` at its absolute position.
///
/// Each cell advances the row cursor by its own width and each row advances by its tallest cell,
/// so tiles of different sizes compose. The result spans the largest extent seen, and every cell
/// inside it has to be covered.
pub fn flatten(root: &TileNode) -> Result<IndexMatrix> {
    let mut canvas = Canvas::default();
    let Extent { width, height } = walk(root, Offset::default(), &mut canvas);

    let mut cells = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let index = canvas.cell(x, y).ok_or(BitmapError::IncompleteMatrix {
                x,
                y,
                width,
                height,
            })?;
            cells.push(index);
        }
    }

    debug!("flattened tile tree into {}x{} matrix", width, height);
    Ok(Matrix::from_cells(width, height, cells))
}
