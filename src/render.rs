//! # Rendering
//!
//! Turns a colour matrix into an image file, optionally squeezed with oxipng, plus a JSON
//! sidecar describing how it was decoded.

use std::fmt;
use std::fs::{self, File};
use std::hash::{Hash, Hasher};
use std::io;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageError, ImageFormat, Rgba, RgbaImage};
use log::{debug, warn};
use oxipng::{InFile, OutFile};
use serde::Serialize;
use twox_hash::XxHash64;

use crate::bitmap::BitmapModel;
use crate::bitplane::PixelPlaneLayout;
use crate::error::BitmapError;
use crate::matrix::{ColorMatrix, IndexMatrix};
use crate::palette::Color;
use crate::tiling::TileLevels;

#[derive(Debug)]
pub enum ExportError {
    Io(io::Error),
    Image(ImageError),
    Json(serde_json::Error),
    Bitmap(BitmapError),
}

impl From<io::Error> for ExportError {
    fn from(err: io::Error) -> Self {
        ExportError::Io(err)
    }
}
impl From<ImageError> for ExportError {
    fn from(err: ImageError) -> Self {
        ExportError::Image(err)
    }
}
impl From<serde_json::Error> for ExportError {
    fn from(err: serde_json::Error) -> Self {
        ExportError::Json(err)
    }
}
impl From<BitmapError> for ExportError {
    fn from(err: BitmapError) -> Self {
        ExportError::Bitmap(err)
    }
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::Io(err) => write!(f, "I/O error: {}", err),
            ExportError::Image(err) => write!(f, "Image error: {}", err),
            ExportError::Json(err) => write!(f, "JSON error: {}", err),
            ExportError::Bitmap(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::Io(err) => Some(err),
            ExportError::Image(err) => Some(err),
            ExportError::Json(err) => Some(err),
            ExportError::Bitmap(err) => Some(err),
        }
    }
}

/// How the fourth colour channel becomes alpha
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AlphaMode {
    /// Channel value is used as is
    #[default]
    Linear,
    /// 0 is transparent, anything else fully opaque
    Binary,
}

fn rgba(color: &Color, mode: AlphaMode) -> Rgba<u8> {
    match *color {
        Color::Rgb([r, g, b]) => Rgba([r, g, b, 255]),
        Color::Rgba([r, g, b, a]) => {
            let alpha = match mode {
                AlphaMode::Linear => a,
                AlphaMode::Binary if a == 0 => 0,
                AlphaMode::Binary => 255,
            };
            Rgba([r, g, b, alpha])
        }
    }
}

pub fn to_rgba_image(matrix: &ColorMatrix, mode: AlphaMode) -> RgbaImage {
    let mut image = RgbaImage::new(matrix.width() as u32, matrix.height() as u32);
    for (x, y, color) in matrix.enumerate() {
        image.put_pixel(x as u32, y as u32, rgba(color, mode));
    }
    image
}

/// Save `image` in the format its extension names, PNG when the extension is unknown.
///
/// PNG output goes through oxipng when `optimise` is set. A failed optimisation keeps the
/// unoptimised file.
pub fn save_image(image: &RgbaImage, path: &Path, optimise: bool) -> Result<(), ExportError> {
    let format = ImageFormat::from_path(path).unwrap_or(ImageFormat::Png);

    match format {
        ImageFormat::Png if optimise => save_optimised_png(image, path),
        // JPEG has no alpha channel
        ImageFormat::Jpeg => {
            DynamicImage::ImageRgba8(image.clone())
                .into_rgb8()
                .save_with_format(path, format)?;
            Ok(())
        }
        _ => {
            image.save_with_format(path, format)?;
            Ok(())
        }
    }
}

fn save_optimised_png(image: &RgbaImage, path: &Path) -> Result<(), ExportError> {
    let temp_path = path.with_extension("temp.png");
    image.save_with_format(&temp_path, ImageFormat::Png)?;

    let mut options = oxipng::Options::from_preset(2);
    options.bit_depth_reduction = true;

    match oxipng::optimize(
        &InFile::Path(temp_path.clone()),
        &OutFile::Path(Some(path.to_path_buf())),
        &options,
    ) {
        Ok(_) => {
            if let Err(e) = fs::remove_file(&temp_path) {
                warn!("failed to remove {}: {}", temp_path.display(), e);
            }
            debug!("optimised {}", path.display());
        }
        Err(e) => {
            fs::rename(&temp_path, path)?;
            warn!(
                "oxipng optimisation failed for {}: {}. File saved unoptimised.",
                path.display(),
                e
            );
        }
    }
    Ok(())
}

/// xxHash64 of the matrix shape and indices, as 16 hex digits
pub fn index_hash(matrix: &IndexMatrix) -> String {
    let mut hasher = XxHash64::default();
    matrix.size().hash(&mut hasher);
    matrix.cells().hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// Sidecar describing a rendered bitmap
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExportMetadata {
    pub width: usize,
    pub height: usize,
    /// Colour channels per palette entry, 0 for an empty palette
    pub channels: usize,
    pub palette_entries: usize,
    pub index_hash: String,
    pub pixel_format: PixelPlaneLayout,
    pub tile_levels: TileLevels,
}

impl ExportMetadata {
    pub fn from_model(model: &BitmapModel) -> Self {
        let (width, height) = model.size();
        let config = model.config();
        ExportMetadata {
            width,
            height,
            channels: config.palette.channel_count().unwrap_or(0),
            palette_entries: config.palette.len(),
            index_hash: index_hash(model.matrix()),
            pixel_format: config.pixel_format.clone(),
            tile_levels: config.tile_levels.clone(),
        }
    }
}

/// `<image path>.json`
pub fn metadata_path(image_path: &Path) -> PathBuf {
    let mut name = image_path.as_os_str().to_os_string();
    name.push(".json");
    PathBuf::from(name)
}

pub fn save_metadata(metadata: &ExportMetadata, path: &Path) -> Result<(), ExportError> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, metadata)?;
    Ok(())
}
