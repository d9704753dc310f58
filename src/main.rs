use std::path::PathBuf;
use std::process;
use std::time::Instant;

use clap::Parser;

use bitpix::config::{read_config, save_config};
use bitpix::render::{
    metadata_path, save_image, save_metadata, to_rgba_image, AlphaMode, ExportError,
    ExportMetadata,
};
use bitpix::BitmapModel;

#[derive(Parser)]
#[command(name = "bitpix", version, about = "Decode tiled bitplane graphics from ROM data")]
struct Args {
    /// Raw ROM data to decode
    input: PathBuf,

    /// Image to write; the extension picks the format (PNG if unknown)
    output: PathBuf,

    /// Decode settings: palette, pixel format and tile levels
    #[arg(short, long, default_value = "config.cfg")]
    config: PathBuf,

    /// Treat palette alpha as on/off instead of a gradient
    #[arg(long)]
    binary_alpha: bool,

    /// Skip oxipng on PNG output
    #[arg(long)]
    no_optimise: bool,

    /// Also write <OUTPUT>.json describing the decode
    #[arg(long)]
    metadata: bool,

    /// Write the parsed config back out in normalised form
    #[arg(long, value_name = "PATH")]
    dump_config: Option<PathBuf>,
}

fn run(args: &Args) -> Result<(), ExportError> {
    let started = Instant::now();

    println!("Reading config from {}", args.config.display());
    let config = read_config(&args.config)?;

    println!("Decoding {}", args.input.display());
    let model = BitmapModel::open(&args.input, config)?;
    let (width, height) = model.size();
    println!(
        "  {} bytes -> {} indexes -> {}x{} pixels",
        model.raw_bytes().len(),
        model.palette_indexes().len(),
        width,
        height
    );

    let mode = if args.binary_alpha {
        AlphaMode::Binary
    } else {
        AlphaMode::Linear
    };
    let image = to_rgba_image(model.color_matrix(), mode);
    save_image(&image, &args.output, !args.no_optimise)?;
    println!("Saved {}", args.output.display());

    if args.metadata {
        let path = metadata_path(&args.output);
        save_metadata(&ExportMetadata::from_model(&model), &path)?;
        println!("Saved {}", path.display());
    }

    if let Some(path) = &args.dump_config {
        save_config(model.config(), path)?;
        println!("Saved {}", path.display());
    }

    println!("Done in {:.2?}", started.elapsed());
    Ok(())
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
