//! # Bitmap Model
//!
//! Holds the raw ROM bytes, the current [`Config`] and the output of every pipeline stage.
//! Changing the config only reruns the stages that depend on the changed fields.

use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Instant;

use log::debug;

use crate::bitplane::{decode, PixelPlaneLayout};
use crate::config;
use crate::error::{BitmapError, Result};
use crate::matrix::{ColorMatrix, IndexMatrix};
use crate::palette::{colorize, Palette};
use crate::tiling::{reassemble, TileLevels};

/// Pipeline stages in run order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Decode,
    Reassemble,
    Colorize,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Decode => write!(f, "decode"),
            Stage::Reassemble => write!(f, "reassemble"),
            Stage::Colorize => write!(f, "colorize"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigField {
    PixelFormat,
    TileLevels,
    Palette,
}

impl ConfigField {
    /// Section name used in config files
    pub fn name(self) -> &'static str {
        match self {
            ConfigField::PixelFormat => "pixel format",
            ConfigField::TileLevels => "tile levels",
            ConfigField::Palette => "palette",
        }
    }

    /// Case-insensitive lookup by section name
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "pixel format" => Ok(ConfigField::PixelFormat),
            "tile levels" => Ok(ConfigField::TileLevels),
            "palette" => Ok(ConfigField::Palette),
            other => Err(BitmapError::InvalidConfig(format!(
                "unknown config field '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for ConfigField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Earliest stage each config field invalidates
pub const DEPENDENCIES: &[(ConfigField, Stage)] = &[
    (ConfigField::PixelFormat, Stage::Decode),
    (ConfigField::TileLevels, Stage::Reassemble),
    (ConfigField::Palette, Stage::Colorize),
];

pub fn invalidated_stage(field: ConfigField) -> Result<Stage> {
    DEPENDENCIES
        .iter()
        .find(|(f, _)| *f == field)
        .map(|&(_, stage)| stage)
        .ok_or_else(|| {
            BitmapError::InvalidConfig(format!("no dependency declared for '{}'", field))
        })
}

/// Everything needed to turn raw bytes into colours
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub pixel_format: PixelPlaneLayout,
    pub tile_levels: TileLevels,
    pub palette: Palette,
}

/// Partial config; `None` fields are left as they are
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigDelta {
    pub pixel_format: Option<PixelPlaneLayout>,
    pub tile_levels: Option<TileLevels>,
    pub palette: Option<Palette>,
}

impl ConfigDelta {
    pub fn with_pixel_format(mut self, layout: PixelPlaneLayout) -> Self {
        self.pixel_format = Some(layout);
        self
    }

    pub fn with_tile_levels(mut self, levels: TileLevels) -> Self {
        self.tile_levels = Some(levels);
        self
    }

    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = Some(palette);
        self
    }

    /// Fields this delta sets
    pub fn fields(&self) -> Vec<ConfigField> {
        let mut fields = Vec::new();
        if self.pixel_format.is_some() {
            fields.push(ConfigField::PixelFormat);
        }
        if self.tile_levels.is_some() {
            fields.push(ConfigField::TileLevels);
        }
        if self.palette.is_some() {
            fields.push(ConfigField::Palette);
        }
        fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }
}

impl From<Config> for ConfigDelta {
    fn from(config: Config) -> Self {
        ConfigDelta {
            pixel_format: Some(config.pixel_format),
            tile_levels: Some(config.tile_levels),
            palette: Some(config.palette),
        }
    }
}

fn earliest(current: Option<Stage>, field: ConfigField) -> Result<Option<Stage>> {
    let stage = invalidated_stage(field)?;
    Ok(Some(current.map_or(stage, |c| c.min(stage))))
}

#[derive(Debug, Clone)]
pub struct BitmapModel {
    raw: Vec<u8>,
    config: Config,
    palette_indexes: Vec<u32>,
    matrix: IndexMatrix,
    color_matrix: ColorMatrix,
}

impl BitmapModel {
    /// Run every stage once over `raw`
    pub fn new(raw: Vec<u8>, config: Config) -> Result<Self> {
        let started = Instant::now();
        let palette_indexes = decode(&raw, &config.pixel_format)?;
        let matrix = reassemble(&palette_indexes, &config.tile_levels)?;
        let color_matrix = colorize(&matrix, &config.palette)?;
        debug!(
            "built {}x{} bitmap from {} bytes in {:?}",
            matrix.width(),
            matrix.height(),
            raw.len(),
            started.elapsed()
        );

        Ok(BitmapModel {
            raw,
            config,
            palette_indexes,
            matrix,
            color_matrix,
        })
    }

    /// Read a ROM file and decode it
    pub fn open<P: AsRef<Path>>(path: P, config: Config) -> Result<Self> {
        let raw = fs::read(path.as_ref())?;
        debug!("read {} bytes from {}", raw.len(), path.as_ref().display());
        Self::new(raw, config)
    }

    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Decoded indices in bit-stream order
    pub fn palette_indexes(&self) -> &[u32] {
        &self.palette_indexes
    }

    pub fn matrix(&self) -> &IndexMatrix {
        &self.matrix
    }

    pub fn color_matrix(&self) -> &ColorMatrix {
        &self.color_matrix
    }

    /// `(width, height)` of the decoded image
    pub fn size(&self) -> (usize, usize) {
        self.matrix.size()
    }

    /// Merge `delta` into the config and rerun what it invalidates.
    ///
    /// Returns the earliest stage that was rerun, or `None` if nothing changed. On error the
    /// model keeps its previous config and outputs.
    pub fn update_config(&mut self, delta: ConfigDelta) -> Result<Option<Stage>> {
        let mut next = self.config.clone();
        let mut rerun_from = None;

        if let Some(layout) = delta.pixel_format {
            if layout != next.pixel_format {
                next.pixel_format = layout;
                rerun_from = earliest(rerun_from, ConfigField::PixelFormat)?;
            }
        }
        if let Some(levels) = delta.tile_levels {
            if levels != next.tile_levels {
                next.tile_levels = levels;
                rerun_from = earliest(rerun_from, ConfigField::TileLevels)?;
            }
        }
        if let Some(palette) = delta.palette {
            if palette != next.palette {
                next.palette = palette;
                rerun_from = earliest(rerun_from, ConfigField::Palette)?;
            }
        }

        let Some(stage) = rerun_from else {
            debug!("config update changed nothing");
            return Ok(None);
        };
        debug!("config update reruns from {}", stage);

        let palette_indexes = match stage {
            Stage::Decode => Some(decode(&self.raw, &next.pixel_format)?),
            _ => None,
        };
        let indexes = palette_indexes.as_deref().unwrap_or(&self.palette_indexes);

        let matrix = match stage {
            Stage::Decode | Stage::Reassemble => Some(reassemble(indexes, &next.tile_levels)?),
            Stage::Colorize => None,
        };
        let color_matrix = colorize(matrix.as_ref().unwrap_or(&self.matrix), &next.palette)?;

        self.config = next;
        if let Some(palette_indexes) = palette_indexes {
            self.palette_indexes = palette_indexes;
        }
        if let Some(matrix) = matrix {
            self.matrix = matrix;
        }
        self.color_matrix = color_matrix;

        Ok(Some(stage))
    }

    /// Replace one field from its config-file section text, e.g. `("palette", "0: 0, 0, 0")`
    pub fn set_field(&mut self, name: &str, section: &str) -> Result<Option<Stage>> {
        let field = ConfigField::from_name(name)?;
        let delta = config::parse_section(field, section)?;
        self.update_config(delta)
    }
}
