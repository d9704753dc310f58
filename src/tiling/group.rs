use log::debug;

use super::{Axis, TileNode, TileTemplate, TilingRule};
use crate::error::{BitmapError, Result};

/// Apply every level to `units` and return the single tile that results.
///
/// Axis rules always produce exactly one tile. Matrix rules produce one tile per run of
/// `group_size` units, so the last level has to bring the count down to one.
pub fn group(units: Vec<TileNode>, levels: &[TilingRule]) -> Result<TileNode> {
    if levels.is_empty() {
        return Err(BitmapError::MalformedTileLevels(
            "no tile levels declared".to_string(),
        ));
    }

    let mut nodes = units;
    for (depth, rule) in levels.iter().enumerate() {
        let count = nodes.len();
        nodes = apply_level(nodes, rule, depth)?;
        debug!("tile level {}: {} units -> {} tiles", depth, count, nodes.len());
    }

    if nodes.len() != 1 {
        return Err(BitmapError::MalformedTileLevels(format!(
            "tile levels leave {} top-level tiles, the last level must produce exactly one",
            nodes.len()
        )));
    }
    nodes
        .pop()
        .ok_or_else(|| BitmapError::MalformedTileLevels("no top-level tile".to_string()))
}

fn apply_level(units: Vec<TileNode>, rule: &TilingRule, depth: usize) -> Result<Vec<TileNode>> {
    match rule {
        TilingRule::Axis { axis, thickness } => {
            tile_on_axis(units, *axis, *thickness, depth).map(|tile| vec![tile])
        }
        TilingRule::Matrix(template) => tile_to_matrix(units, template, depth),
    }
}

fn tile_on_axis(
    units: Vec<TileNode>,
    axis: Axis,
    thickness: usize,
    depth: usize,
) -> Result<TileNode> {
    if thickness == 0 {
        return Err(BitmapError::MalformedTileLevels(format!(
            "level {}: {} axis rule needs a positive thickness",
            depth, axis
        )));
    }

    let rows = match axis {
        Axis::Y => {
            let mut rows: Vec<Vec<TileNode>> = vec![Vec::new(); units.len().div_ceil(thickness)];
            for (k, unit) in units.into_iter().enumerate() {
                rows[k / thickness].push(unit);
            }
            rows
        }
        Axis::X => {
            let mut rows: Vec<Vec<TileNode>> = vec![Vec::new(); thickness];
            for (k, unit) in units.into_iter().enumerate() {
                rows[k % thickness].push(unit);
            }
            rows
        }
    };
    Ok(TileNode::Grid(rows))
}

fn tile_to_matrix(
    units: Vec<TileNode>,
    template: &TileTemplate,
    depth: usize,
) -> Result<Vec<TileNode>> {
    let size = template.group_size();
    if units.len() % size != 0 {
        return Err(BitmapError::MalformedTileLevels(format!(
            "level {}: {} units do not divide into {}x{} tiles of {}",
            depth,
            units.len(),
            template.width(),
            template.height(),
            size
        )));
    }

    let mut tiles = Vec::with_capacity(units.len() / size);
    let mut remaining = units.into_iter();
    while remaining.len() > 0 {
        let mut run: Vec<Option<TileNode>> = remaining.by_ref().take(size).map(Some).collect();
        let mut rows = Vec::with_capacity(template.height());
        for slots in template.rows() {
            let mut row = Vec::with_capacity(slots.len());
            for &slot in slots {
                // Templates are permutations, so every slot is filled exactly once
                let unit = run[slot].take().ok_or_else(|| {
                    BitmapError::MalformedTileLevels(format!(
                        "level {}: slot {} filled twice",
                        depth, slot
                    ))
                })?;
                row.push(unit);
            }
            rows.push(row);
        }
        tiles.push(TileNode::Grid(rows));
    }
    Ok(tiles)
}
