//! Decode tiled bitplane graphics from raw ROM data.
//!
//! The pipeline runs in three stages, each cached by [`BitmapModel`]:
//! 1. [`bitplane::decode`] turns bytes into palette indices using a [`PixelPlaneLayout`]
//! 2. [`tiling::reassemble`] arranges those indices into a 2-D [`IndexMatrix`]
//! 3. [`palette::colorize`] maps every index to a [`Color`]
//!
//! Decode settings live in plain-text config files, see [`config`].

pub mod bitmap;
pub mod bitplane;
pub mod config;
pub mod error;
pub mod matrix;
pub mod palette;
pub mod render;
pub mod tiling;

pub use bitmap::{BitmapModel, Config, ConfigDelta, ConfigField, Stage};
pub use bitplane::{ChannelId, PixelPlaneLayout, PlaneBit};
pub use error::{BitmapError, Result};
pub use matrix::{ColorMatrix, IndexMatrix, Matrix};
pub use palette::{Color, Palette};
pub use tiling::{Axis, TileLevels, TileTemplate, TilingRule};
