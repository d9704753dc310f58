//! # Tile Reassembly
//!
//! Tiled formats never store pixels in raster order. An 8x8 tile is stored row after row, tiles
//! are stored one after another, and a sprite sheet lays those tiles out in some larger grid.
//!
//! Reassembly happens in two steps:
//! - [`group`] applies each [`TilingRule`] in declaration order to build a tree of
//!   [`TileNode`]s. The first rule groups decoded pixels, every later rule groups the tiles
//!   produced by the one before it.
//! - [`flatten`] walks the tree and writes every leaf at its absolute coordinate.

use std::fmt;

use serde::Serialize;

use crate::error::{BitmapError, Result};
use crate::matrix::IndexMatrix;

mod flatten;
mod group;

pub use flatten::{flatten, Offset};
pub use group::group;

/// Direction an axis rule extends along
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::X => write!(f, "x"),
            Axis::Y => write!(f, "y"),
        }
    }
}

/// Rectangular slot grid: the unit at position `i` of a run goes wherever the template holds `i`
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct TileTemplate {
    width: usize,
    height: usize,
    slots: Vec<usize>,
}

impl TileTemplate {
    /// Every slot index in `0..width*height` must appear exactly once
    pub fn new(rows: Vec<Vec<usize>>) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        if width == 0 {
            return Err(BitmapError::MalformedTileLevels(
                "tile template is empty".to_string(),
            ));
        }
        if let Some(y) = rows.iter().position(|row| row.len() != width) {
            return Err(BitmapError::MalformedTileLevels(format!(
                "tile template row {} has {} slots, expected {}",
                y,
                rows[y].len(),
                width
            )));
        }

        let slots: Vec<usize> = rows.into_iter().flatten().collect();
        let mut seen = vec![false; slots.len()];
        for &slot in &slots {
            match seen.get_mut(slot) {
                None => {
                    return Err(BitmapError::MalformedTileLevels(format!(
                        "tile template slot {} is out of range for a {}x{} template",
                        slot, width, height
                    )))
                }
                Some(taken) => {
                    if *taken {
                        return Err(BitmapError::MalformedTileLevels(format!(
                            "tile template uses slot {} twice",
                            slot
                        )));
                    }
                    *taken = true;
                }
            }
        }

        Ok(TileTemplate {
            width,
            height,
            slots,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Units consumed per tile
    pub fn group_size(&self) -> usize {
        self.width * self.height
    }

    pub fn rows(&self) -> impl Iterator<Item = &[usize]> + '_ {
        self.slots.chunks(self.width)
    }
}

/// One level of the tiling hierarchy
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TilingRule {
    /// Lay every remaining unit out in rows (`Y`) or interleaved rows (`X`) of `thickness`
    Axis { axis: Axis, thickness: usize },
    /// Place each run of `group_size` units into a copy of the template
    Matrix(TileTemplate),
}

impl TilingRule {
    pub fn axis(axis: Axis, thickness: usize) -> Result<Self> {
        if thickness == 0 {
            return Err(BitmapError::MalformedTileLevels(format!(
                "{} axis rule needs a positive thickness",
                axis
            )));
        }
        Ok(TilingRule::Axis { axis, thickness })
    }

    pub fn matrix(rows: Vec<Vec<usize>>) -> Result<Self> {
        TileTemplate::new(rows).map(TilingRule::Matrix)
    }

    /// Units per produced tile, `None` when the rule takes everything that is left
    pub fn group_size(&self) -> Option<usize> {
        match self {
            TilingRule::Axis { .. } => None,
            TilingRule::Matrix(template) => Some(template.group_size()),
        }
    }
}

/// Ordered tiling rules, pixel level first
pub type TileLevels = Vec<TilingRule>;

/// A palette index, or a grid of nested tiles
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TileNode {
    Leaf(u32),
    Grid(Vec<Vec<TileNode>>),
}

impl TileNode {
    /// Grid of leaves, mostly for building expectations
    pub fn leaves(rows: &[&[u32]]) -> Self {
        TileNode::Grid(
            rows.iter()
                .map(|row| row.iter().map(|&i| TileNode::Leaf(i)).collect())
                .collect(),
        )
    }
}

/// Group `units` by `levels` and flatten the result into an index matrix
pub fn reassemble(units: &[u32], levels: &[TilingRule]) -> Result<IndexMatrix> {
    let leaves = units.iter().map(|&index| TileNode::Leaf(index)).collect();
    let root = group(leaves, levels)?;
    flatten(&root)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_must_be_a_permutation() {
        assert!(TileTemplate::new(vec![vec![0, 1], vec![3, 2]]).is_ok());
        assert!(matches!(
            TileTemplate::new(vec![vec![0, 1], vec![1, 2]]),
            Err(BitmapError::MalformedTileLevels(_))
        ));
        assert!(matches!(
            TileTemplate::new(vec![vec![0, 4]]),
            Err(BitmapError::MalformedTileLevels(_))
        ));
        assert!(matches!(
            TileTemplate::new(vec![vec![0, 1], vec![2]]),
            Err(BitmapError::MalformedTileLevels(_))
        ));
        assert!(TileTemplate::new(Vec::new()).is_err());
    }

    #[test]
    fn zero_thickness_is_rejected() {
        assert!(matches!(
            TilingRule::axis(Axis::Y, 0),
            Err(BitmapError::MalformedTileLevels(_))
        ));
    }

    #[test]
    fn reassembles_8x8_tiles_into_a_sheet() {
        // Four 2x2 "tiles" stored one after another, laid out two per row
        let units: Vec<u32> = (0..16).collect();
        let levels = vec![
            TilingRule::matrix(vec![vec![0, 1], vec![2, 3]]).unwrap(),
            TilingRule::axis(Axis::Y, 2).unwrap(),
        ];
        let matrix = reassemble(&units, &levels).unwrap();
        assert_eq!(matrix.size(), (4, 4));
        assert_eq!(
            matrix.to_rows(),
            vec![
                vec![0, 1, 4, 5],
                vec![2, 3, 6, 7],
                vec![8, 9, 12, 13],
                vec![10, 11, 14, 15],
            ]
        );
    }

    #[test]
    fn well_sized_input_leaves_no_holes() {
        let levels = vec![
            TilingRule::matrix(vec![vec![0, 1, 2, 3]]).unwrap(),
            TilingRule::matrix(vec![vec![0], vec![1]]).unwrap(),
            TilingRule::matrix(vec![vec![0, 1], vec![2, 3]]).unwrap(),
            TilingRule::axis(Axis::X, 3).unwrap(),
        ];
        // 4 * 2 * 4 units per tile, six tiles
        let units: Vec<u32> = (0..32 * 6).collect();
        let matrix = reassemble(&units, &levels).unwrap();
        assert_eq!(matrix.size(), (4 * 2 * 2, 2 * 2 * 3));
        let mut seen: Vec<u32> = matrix.cells().to_vec();
        seen.sort_unstable();
        assert_eq!(seen, units);
    }

    #[test]
    fn short_axis_row_is_incomplete() {
        let levels = vec![TilingRule::axis(Axis::Y, 4).unwrap()];
        let err = reassemble(&[1, 2, 3, 4, 5, 6], &levels).unwrap_err();
        assert!(matches!(
            err,
            BitmapError::IncompleteMatrix { x: 2, y: 1, width: 4, height: 2 }
        ));
    }
}
