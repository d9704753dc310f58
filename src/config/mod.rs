//! # Config Files
//!
//! Plain-text decode settings, one section per [`ConfigField`]:
//!
//! ```text
//! - Palette -
//! 0: 255, 255, 255
//! 1: 0, 0, 0        // comments run to the end of the line
//!
//! - Pixel format -
//! a1 b1 c1 d1 e1 f1 g1 h1
//!
//! - Tile levels -
//! y 8
//! ```
//!
//! Tile levels are separated by blank lines. A level containing letters is an axis rule,
//! anything else is a matrix of slot indices.

use std::fs;
use std::path::Path;

use log::debug;
use regex::Regex;

use crate::bitmap::{Config, ConfigDelta, ConfigField};
use crate::bitplane::PixelPlaneLayout;
use crate::error::{BitmapError, Result};
use crate::palette::{Color, Palette};
use crate::tiling::{Axis, TileLevels, TilingRule};

mod writer;

pub use writer::{config_to_string, save_config};

const HEADER_PATTERN: &str = r"^[ \t]*-[ \t]*(.*?)[ \t]*-[ \t]*(?://.*)?$";
const PALETTE_PATTERN: &str = r"^(\d+)\s*:\s*(.*)$";
const PIXEL_FORMAT_PATTERN: &str = r"^(?:[A-Za-z]+[0-9]+\s*)+$";
const PIXEL_TOKEN_PATTERN: &str = r"([A-Za-z]+)([0-9]+)";
const AXIS_PATTERN: &str = r"^([A-Za-z]+)\s*([0-9]+)$";

/// A comment-stripped line and its 1-based number in the source text
#[derive(Clone, Copy, Debug)]
struct Line<'a> {
    number: usize,
    text: &'a str,
}

struct Section<'a> {
    name: String,
    header_line: usize,
    lines: Vec<Line<'a>>,
}

fn pattern(source: &str) -> Result<Regex> {
    Regex::new(source)
        .map_err(|e| BitmapError::InvalidConfig(format!("building pattern {}: {}", source, e)))
}

fn syntax(section: &str, line: usize, message: impl Into<String>) -> BitmapError {
    BitmapError::Syntax {
        section: section.to_string(),
        line,
        message: message.into(),
    }
}

fn strip_comment(line: &str) -> &str {
    line.find("//").map_or(line, |i| &line[..i]).trim()
}

fn body_lines(text: &str) -> Vec<Line<'_>> {
    text.lines()
        .enumerate()
        .map(|(i, raw)| Line {
            number: i + 1,
            text: strip_comment(raw),
        })
        .collect()
}

fn split_sections(text: &str) -> Result<Vec<Section<'_>>> {
    let header = pattern(HEADER_PATTERN)?;
    let mut sections: Vec<Section> = Vec::new();

    for (i, raw) in text.lines().enumerate() {
        let number = i + 1;
        if let Some(caps) = header.captures(raw) {
            sections.push(Section {
                name: caps[1].to_lowercase(),
                header_line: number,
                lines: Vec::new(),
            });
            continue;
        }

        let line = strip_comment(raw);
        match sections.last_mut() {
            Some(section) => section.lines.push(Line { number, text: line }),
            None if line.is_empty() => {}
            None => {
                return Err(syntax(
                    "",
                    number,
                    "content before the first section header",
                ))
            }
        }
    }

    Ok(sections)
}

fn parse_palette(section: &str, lines: &[Line]) -> Result<Palette> {
    let entry = pattern(PALETTE_PATTERN)?;
    let mut palette = Palette::new();

    for line in lines.iter().filter(|l| !l.text.is_empty()) {
        let caps = entry
            .captures(line.text)
            .ok_or_else(|| syntax(section, line.number, "expected 'index: r, g, b[, a]'"))?;
        let index: u32 = caps[1]
            .parse()
            .map_err(|_| syntax(section, line.number, format!("bad palette index '{}'", &caps[1])))?;

        let channels = caps[2]
            .split(',')
            .map(|c| {
                c.trim().parse::<u8>().map_err(|_| {
                    syntax(
                        section,
                        line.number,
                        format!("colour channel '{}' is not in 0-255", c.trim()),
                    )
                })
            })
            .collect::<Result<Vec<u8>>>()?;
        let color = Color::from_channels(&channels).ok_or_else(|| {
            syntax(
                section,
                line.number,
                format!("colour has {} channels, expected 3 or 4", channels.len()),
            )
        })?;

        palette.insert(index, color)?;
    }

    Ok(palette)
}

fn parse_pixel_format(section: &str, lines: &[Line]) -> Result<PixelPlaneLayout> {
    let whole = pattern(PIXEL_FORMAT_PATTERN)?;
    let token = pattern(PIXEL_TOKEN_PATTERN)?;
    let mut pairs = Vec::new();

    for line in lines.iter().filter(|l| !l.text.is_empty()) {
        if !whole.is_match(line.text) {
            return Err(syntax(
                section,
                line.number,
                "expected channel/weight tokens like 'a1 b1 a2 b2'",
            ));
        }
        for caps in token.captures_iter(line.text) {
            let weight: u32 = caps[2].parse().map_err(|_| {
                syntax(section, line.number, format!("bit weight '{}' is too large", &caps[2]))
            })?;
            pairs.push((caps[1].to_string(), weight));
        }
    }

    Ok(PixelPlaneLayout::from_pairs(pairs))
}

fn parse_axis_rule(section: &str, axis_re: &Regex, block: &[Line]) -> Result<TilingRule> {
    let line = block[0];
    if block.len() > 1 {
        return Err(syntax(
            section,
            block[1].number,
            "an axis rule takes a single line",
        ));
    }
    let caps = axis_re
        .captures(line.text)
        .ok_or_else(|| syntax(section, line.number, "expected an axis rule like 'x 8'"))?;
    let axis = match caps[1].to_lowercase().as_str() {
        "x" => Axis::X,
        "y" => Axis::Y,
        other => {
            return Err(syntax(
                section,
                line.number,
                format!("unknown axis '{}'", other),
            ))
        }
    };
    let thickness: usize = caps[2]
        .parse()
        .map_err(|_| syntax(section, line.number, format!("bad thickness '{}'", &caps[2])))?;
    TilingRule::axis(axis, thickness)
}

fn parse_matrix_rule(section: &str, block: &[Line]) -> Result<TilingRule> {
    let mut rows = Vec::with_capacity(block.len());
    for line in block {
        let row = line
            .text
            .split_whitespace()
            .map(|slot| {
                slot.parse::<usize>().map_err(|_| {
                    syntax(section, line.number, format!("bad slot index '{}'", slot))
                })
            })
            .collect::<Result<Vec<usize>>>()?;
        rows.push(row);
    }

    let width = rows[0].len();
    if let Some((line, row)) = block.iter().zip(&rows).find(|(_, row)| row.len() != width) {
        return Err(syntax(
            section,
            line.number,
            format!("matrix row has {} entries, expected {}", row.len(), width),
        ));
    }
    TilingRule::matrix(rows)
}

fn parse_tile_levels(section: &str, lines: &[Line]) -> Result<TileLevels> {
    let axis_re = pattern(AXIS_PATTERN)?;
    let mut levels = Vec::new();

    for block in lines.split(|l| l.text.is_empty()).filter(|b| !b.is_empty()) {
        let rule = if block[0].text.chars().any(|c| c.is_ascii_alphabetic()) {
            parse_axis_rule(section, &axis_re, block)?
        } else {
            parse_matrix_rule(section, block)?
        };
        levels.push(rule);
    }

    Ok(levels)
}

fn apply_section(delta: &mut ConfigDelta, field: ConfigField, lines: &[Line]) -> Result<()> {
    let section = field.name();
    match field {
        ConfigField::Palette => delta.palette = Some(parse_palette(section, lines)?),
        ConfigField::PixelFormat => {
            delta.pixel_format = Some(parse_pixel_format(section, lines)?)
        }
        ConfigField::TileLevels => delta.tile_levels = Some(parse_tile_levels(section, lines)?),
    }
    Ok(())
}

/// Parse the body of a single section, without its header
pub fn parse_section(field: ConfigField, body: &str) -> Result<ConfigDelta> {
    let mut delta = ConfigDelta::default();
    apply_section(&mut delta, field, &body_lines(body))?;
    Ok(delta)
}

/// Parse whichever sections `text` contains
pub fn parse_delta(text: &str) -> Result<ConfigDelta> {
    let mut delta = ConfigDelta::default();
    let mut seen = Vec::new();

    for section in split_sections(text)? {
        let field = ConfigField::from_name(&section.name)?;
        if seen.contains(&field) {
            return Err(BitmapError::InvalidConfig(format!(
                "section '{}' declared twice (line {})",
                field, section.header_line
            )));
        }
        seen.push(field);
        apply_section(&mut delta, field, &section.lines)?;
        debug!("parsed config section '{}'", field);
    }

    Ok(delta)
}

/// Parse a complete config; all three sections are required
pub fn parse_config(text: &str) -> Result<Config> {
    let delta = parse_delta(text)?;
    let missing = |field: ConfigField| {
        BitmapError::InvalidConfig(format!("config has no '{}' section", field))
    };
    Ok(Config {
        palette: delta.palette.ok_or_else(|| missing(ConfigField::Palette))?,
        pixel_format: delta
            .pixel_format
            .ok_or_else(|| missing(ConfigField::PixelFormat))?,
        tile_levels: delta
            .tile_levels
            .ok_or_else(|| missing(ConfigField::TileLevels))?,
    })
}

pub fn read_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let text = fs::read_to_string(path.as_ref())?;
    debug!("reading config from {}", path.as_ref().display());
    parse_config(&text)
}
