use std::fs;
use std::path::Path;

use log::debug;

use crate::bitmap::Config;
use crate::bitplane::PixelPlaneLayout;
use crate::error::Result;
use crate::palette::Palette;
use crate::tiling::{TileTemplate, TilingRule};

fn palette_to_string(palette: &Palette) -> String {
    palette
        .iter()
        .map(|(index, color)| format!("{}: {}", index, color))
        .collect::<Vec<_>>()
        .join("\n")
}

fn pixel_format_to_string(layout: &PixelPlaneLayout) -> String {
    layout
        .bits()
        .iter()
        .map(|bit| format!("{}{}", bit.channel, bit.weight))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Slot indices right-aligned to the widest entry
fn template_to_string(template: &TileTemplate) -> String {
    let widest = template
        .rows()
        .flatten()
        .map(|slot| slot.to_string().len())
        .max()
        .unwrap_or(1);
    template
        .rows()
        .map(|row| {
            row.iter()
                .map(|slot| format!("{:>width$}", slot, width = widest))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn tile_levels_to_string(levels: &[TilingRule]) -> String {
    levels
        .iter()
        .map(|rule| match rule {
            TilingRule::Axis { axis, thickness } => format!("{} {}", axis, thickness),
            TilingRule::Matrix(template) => template_to_string(template),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Render `config` in the format [`super::parse_config`] reads.
///
/// Channel names have to be purely alphabetic to survive a round trip.
pub fn config_to_string(config: &Config) -> String {
    let sections = [
        ("Palette", palette_to_string(&config.palette)),
        ("Pixel format", pixel_format_to_string(&config.pixel_format)),
        ("Tile levels", tile_levels_to_string(&config.tile_levels)),
    ];

    let mut out = String::new();
    for (title, body) in sections {
        out.push_str(&format!("- {} -\n\n", title));
        if !body.is_empty() {
            out.push_str(&body);
            out.push_str("\n\n");
        }
    }
    out.pop();
    out
}

pub fn save_config<P: AsRef<Path>>(config: &Config, path: P) -> Result<()> {
    fs::write(path.as_ref(), config_to_string(config))?;
    debug!("saved config to {}", path.as_ref().display());
    Ok(())
}
