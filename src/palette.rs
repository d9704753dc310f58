//! # Palette
//!
//! Maps palette indices to colours. Palettes are sparse: a format may only define the indices it
//! actually uses, and looking up an undefined one is an error rather than a silent default.

use std::collections::BTreeMap;
use std::fmt;

use log::debug;
use serde::Serialize;

use crate::error::{BitmapError, Result};
use crate::matrix::{ColorMatrix, IndexMatrix};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum Color {
    Rgb([u8; 3]),
    Rgba([u8; 4]),
}

impl Color {
    /// A colour from 3 or 4 channel values
    pub fn from_channels(channels: &[u8]) -> Option<Self> {
        match *channels {
            [r, g, b] => Some(Color::Rgb([r, g, b])),
            [r, g, b, a] => Some(Color::Rgba([r, g, b, a])),
            _ => None,
        }
    }

    pub fn channels(&self) -> &[u8] {
        match self {
            Color::Rgb(c) => c,
            Color::Rgba(c) => c,
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels().len()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let channels: Vec<String> = self.channels().iter().map(u8::to_string).collect();
        f.write_str(&channels.join(", "))
    }
}

/// Sparse index -> colour table. All colours share one channel count.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Palette {
    entries: BTreeMap<u32, Color>,
}

impl Palette {
    pub fn new() -> Self {
        Palette::default()
    }

    /// Later entries for the same index replace earlier ones
    pub fn from_entries<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (u32, Color)>,
    {
        let mut palette = Palette::new();
        for (index, color) in entries {
            palette.insert(index, color)?;
        }
        Ok(palette)
    }

    /// Fails if `color` has a different channel count from the colours already present
    pub fn insert(&mut self, index: u32, color: Color) -> Result<Option<Color>> {
        if let Some(expected) = self.channel_count() {
            if color.channel_count() != expected {
                return Err(BitmapError::InvalidConfig(format!(
                    "palette index {} has {} channels, palette uses {}",
                    index,
                    color.channel_count(),
                    expected
                )));
            }
        }
        Ok(self.entries.insert(index, color))
    }

    pub fn get(&self, index: u32) -> Option<&Color> {
        self.entries.get(&index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending index order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &Color)> + '_ {
        self.entries.iter().map(|(&index, color)| (index, color))
    }

    /// `None` for an empty palette
    pub fn channel_count(&self) -> Option<usize> {
        self.entries.values().next().map(Color::channel_count)
    }
}

/// Replace every index in `matrix` with its palette colour
pub fn colorize(matrix: &IndexMatrix, palette: &Palette) -> Result<ColorMatrix> {
    let colors = matrix.try_map(|x, y, &index| {
        palette
            .get(index)
            .copied()
            .ok_or(BitmapError::UnknownPaletteIndex { index, x, y })
    })?;
    debug!(
        "colorized {}x{} matrix with {} palette entries",
        colors.width(),
        colors.height(),
        palette.len()
    );
    Ok(colors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::Matrix;

    fn grey_palette(count: u32) -> Palette {
        Palette::from_entries((0..count).map(|i| {
            let v = (i * 85) as u8;
            (i, Color::Rgb([v, v, v]))
        }))
        .unwrap()
    }

    #[test]
    fn colorizes_every_cell() {
        let matrix = Matrix::from_rows(vec![vec![0, 1], vec![3, 2]]).unwrap();
        let colors = colorize(&matrix, &grey_palette(4)).unwrap();
        assert_eq!(colors.size(), (2, 2));
        assert_eq!(colors.get(0, 1), Some(&Color::Rgb([255, 255, 255])));
        assert_eq!(colors.get(1, 0), Some(&Color::Rgb([85, 85, 85])));
    }

    #[test]
    fn palette_gap_is_an_error() {
        let matrix = Matrix::from_rows(vec![vec![0, 1], vec![7, 2]]).unwrap();
        let err = colorize(&matrix, &grey_palette(4)).unwrap_err();
        assert!(matches!(
            err,
            BitmapError::UnknownPaletteIndex { index: 7, x: 0, y: 1 }
        ));
    }

    #[test]
    fn sparse_palette_is_fine_when_gaps_are_unused() {
        let palette = Palette::from_entries([
            (0, Color::Rgba([0, 0, 0, 0])),
            (15, Color::Rgba([255, 0, 0, 255])),
        ])
        .unwrap();
        let matrix = Matrix::from_rows(vec![vec![15, 0]]).unwrap();
        let colors = colorize(&matrix, &palette).unwrap();
        assert_eq!(colors.cells()[0], Color::Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn mixed_channel_counts_are_rejected() {
        let err = Palette::from_entries([
            (0, Color::Rgb([0, 0, 0])),
            (1, Color::Rgba([0, 0, 0, 255])),
        ])
        .unwrap_err();
        assert!(matches!(err, BitmapError::InvalidConfig(_)));
    }

    #[test]
    fn colors_parse_from_three_or_four_channels() {
        assert_eq!(Color::from_channels(&[1, 2, 3]), Some(Color::Rgb([1, 2, 3])));
        assert_eq!(
            Color::from_channels(&[1, 2, 3, 4]),
            Some(Color::Rgba([1, 2, 3, 4]))
        );
        assert_eq!(Color::from_channels(&[1, 2]), None);
        assert_eq!(Color::Rgba([1, 2, 3, 4]).to_string(), "1, 2, 3, 4");
    }
}
