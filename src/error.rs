//! Error type shared by the decode pipeline and the config reader.

use std::fmt;
use std::io;

use crate::bitmap::Stage;

/// Error type for bitmap decoding and configuration
#[derive(Debug)]
pub enum BitmapError {
    /// Empty or degenerate pixel-plane layout
    InvalidLayout(String),
    /// A tiling rule cannot be applied to the units it was given
    MalformedTileLevels(String),
    /// Flattening left a hole in the bounding rectangle
    IncompleteMatrix { x: usize, y: usize, width: usize, height: usize },
    /// A decoded index has no palette entry
    UnknownPaletteIndex { index: u32, x: usize, y: usize },
    /// Config field with no dependency mapping, or an inconsistent value
    InvalidConfig(String),
    /// Config text that could not be parsed
    Syntax {
        section: String,
        line: usize,
        message: String,
    },
    /// I/O error
    Io(io::Error),
}

impl BitmapError {
    /// The pipeline stage this error belongs to, if any
    pub fn stage(&self) -> Option<Stage> {
        match self {
            BitmapError::InvalidLayout(_) => Some(Stage::Decode),
            BitmapError::MalformedTileLevels(_) | BitmapError::IncompleteMatrix { .. } => {
                Some(Stage::Reassemble)
            }
            BitmapError::UnknownPaletteIndex { .. } => Some(Stage::Colorize),
            _ => None,
        }
    }
}

impl From<io::Error> for BitmapError {
    fn from(err: io::Error) -> Self {
        BitmapError::Io(err)
    }
}

impl fmt::Display for BitmapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BitmapError::InvalidLayout(msg) => write!(f, "Invalid pixel layout: {}", msg),
            BitmapError::MalformedTileLevels(msg) => write!(f, "Malformed tile levels: {}", msg),
            BitmapError::IncompleteMatrix {
                x,
                y,
                width,
                height,
            } => write!(
                f,
                "Incomplete matrix: no unit at ({}, {}) in {}x{} bounds",
                x, y, width, height
            ),
            BitmapError::UnknownPaletteIndex { index, x, y } => write!(
                f,
                "Unknown palette index {} at ({}, {})",
                index, x, y
            ),
            BitmapError::InvalidConfig(msg) => write!(f, "Invalid config: {}", msg),
            BitmapError::Syntax {
                section,
                line,
                message,
            } => write!(f, "Config syntax error in '{}' line {}: {}", section, line, message),
            BitmapError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for BitmapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BitmapError::Io(err) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, BitmapError>;
