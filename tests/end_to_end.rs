use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use image::Rgba;
use tempfile::tempdir;

use bitpix::config::{read_config, save_config};
use bitpix::render::{
    metadata_path, save_image, save_metadata, to_rgba_image, AlphaMode, ExportMetadata,
};
use bitpix::{BitmapModel, Color, ConfigDelta, Palette, Stage};

/// Game Boy 2bpp: 8x8 tiles, two planes per row, tiles laid out two per row
fn game_boy_config() -> String {
    let tile: Vec<String> = (0..8)
        .map(|y| {
            (0..8)
                .map(|x| format!("{:2}", y * 8 + x))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect();

    format!(
        "- Palette -\n\
         0: 224, 248, 208\n\
         1: 136, 192, 112\n\
         2: 52, 104, 86\n\
         3: 8, 24, 32\n\
         \n\
         - Pixel format -   // low plane then high plane\n\
         a1 b1 c1 d1 e1 f1 g1 h1 a2 b2 c2 d2 e2 f2 g2 h2\n\
         \n\
         - Tile levels -\n\
         {}\n\
         \n\
         y 2\n",
        tile.join("\n")
    )
}

/// Tile 0 is solid colour 3; tile 1 has a colour 1 top row over colour 0
fn game_boy_rom() -> Vec<u8> {
    let mut rom = Vec::new();
    for _ in 0..8 {
        rom.extend_from_slice(&[0xFF, 0xFF]);
    }
    rom.extend_from_slice(&[0xFF, 0x00]);
    for _ in 0..7 {
        rom.extend_from_slice(&[0x00, 0x00]);
    }
    rom
}

fn write_inputs(dir: &Path) -> (PathBuf, PathBuf) {
    let rom_path = dir.join("tiles.bin");
    let config_path = dir.join("gb.cfg");
    fs::write(&rom_path, game_boy_rom()).unwrap();
    fs::write(&config_path, game_boy_config()).unwrap();
    (rom_path, config_path)
}

#[test]
fn decodes_rom_to_png_and_metadata() {
    let dir = tempdir().unwrap();
    let (rom_path, config_path) = write_inputs(dir.path());

    let config = read_config(&config_path).unwrap();
    let model = BitmapModel::open(&rom_path, config).unwrap();
    assert_eq!(model.size(), (16, 8));

    let output = dir.path().join("sheet.png");
    let image = to_rgba_image(model.color_matrix(), AlphaMode::Linear);
    save_image(&image, &output, true).unwrap();

    let png = image::open(&output).unwrap().to_rgba8();
    assert_eq!(png.dimensions(), (16, 8));
    assert_eq!(png.get_pixel(0, 0), &Rgba([8, 24, 32, 255]));
    assert_eq!(png.get_pixel(7, 7), &Rgba([8, 24, 32, 255]));
    assert_eq!(png.get_pixel(8, 0), &Rgba([136, 192, 112, 255]));
    assert_eq!(png.get_pixel(15, 1), &Rgba([224, 248, 208, 255]));

    let meta_path = metadata_path(&output);
    save_metadata(&ExportMetadata::from_model(&model), &meta_path).unwrap();
    let meta: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&meta_path).unwrap()).unwrap();
    assert_eq!(meta["width"], 16);
    assert_eq!(meta["height"], 8);
    assert_eq!(meta["channels"], 3);
    assert_eq!(meta["palette_entries"], 4);
    assert_eq!(meta["index_hash"].as_str().unwrap().len(), 16);
    assert_eq!(meta["tile_levels"][1]["kind"], "axis");
    assert_eq!(meta["tile_levels"][1]["axis"], "y");
}

#[test]
fn palette_swap_only_recolours() {
    let dir = tempdir().unwrap();
    let (rom_path, config_path) = write_inputs(dir.path());
    let mut model = BitmapModel::open(&rom_path, read_config(&config_path).unwrap()).unwrap();
    let hash = ExportMetadata::from_model(&model).index_hash;

    let greys = Palette::from_entries((0..4).map(|i| (i, Color::Rgb([i as u8 * 80; 3])))).unwrap();
    let stage = model
        .update_config(ConfigDelta::default().with_palette(greys))
        .unwrap();

    assert_eq!(stage, Some(Stage::Colorize));
    assert_eq!(ExportMetadata::from_model(&model).index_hash, hash);
    assert_eq!(model.color_matrix().get(0, 0), Some(&Color::Rgb([240; 3])));
}

#[test]
fn normalised_config_decodes_identically() {
    let dir = tempdir().unwrap();
    let (rom_path, config_path) = write_inputs(dir.path());
    let config = read_config(&config_path).unwrap();

    let dumped = dir.path().join("normalised.cfg");
    save_config(&config, &dumped).unwrap();
    let reread = read_config(&dumped).unwrap();
    assert_eq!(reread, config);

    let a = BitmapModel::open(&rom_path, config).unwrap();
    let b = BitmapModel::open(&rom_path, reread).unwrap();
    assert_eq!(a.color_matrix(), b.color_matrix());
}

#[test]
fn cli_writes_image_and_sidecars() {
    let dir = tempdir().unwrap();
    let (rom_path, config_path) = write_inputs(dir.path());
    let output = dir.path().join("out.png");
    let dumped = dir.path().join("dump.cfg");

    let status = Command::new(env!("CARGO_BIN_EXE_bitpix"))
        .arg(&rom_path)
        .arg(&output)
        .arg("--config")
        .arg(&config_path)
        .arg("--metadata")
        .arg("--no-optimise")
        .arg("--dump-config")
        .arg(&dumped)
        .status()
        .unwrap();

    assert!(status.success());
    assert!(output.exists());
    assert!(metadata_path(&output).exists());
    assert!(dumped.exists());
}

#[test]
fn cli_reports_bad_config_and_fails() {
    let dir = tempdir().unwrap();
    let (rom_path, _) = write_inputs(dir.path());
    let config_path = dir.path().join("broken.cfg");
    fs::write(&config_path, "- Palette -\n0: 0, 0, 0\n").unwrap();

    let result = Command::new(env!("CARGO_BIN_EXE_bitpix"))
        .arg(&rom_path)
        .arg(dir.path().join("out.png"))
        .arg("-c")
        .arg(&config_path)
        .output()
        .unwrap();

    assert_eq!(result.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("Invalid config"), "stderr was: {}", stderr);
}
