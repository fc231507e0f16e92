//! `relief`: decode terrain files and render slope/aspect textures.
//!
//! ```bash
//! relief formats
//! relief info N47W123.hgt
//! relief decode survey.laz -o survey.json
//! relief surface ortho.png --world ortho.pgw --mode aspect -o aspect.png
//! ```

mod config;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use config::ReliefConfig;
use relief_formats::registry::{self, FormatId};
use relief_formats::{decode_owned, DecodeOptions, DecodeReport, DecodeRequest};
use relief_grid::CrsHint;
use relief_surface::{derive_surface_with, SurfaceMode};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "relief", version, about = "Terrain decoding and surface rendering")]
struct Cli {
    /// YAML file with `decode` and `surface` option sections
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging for the relief crates
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every registered format
    Formats,
    /// Decode a file and print a summary
    Info {
        /// Input terrain file
        input: PathBuf,
        /// World file for image inputs (found next to the image if omitted)
        #[arg(long)]
        world: Option<PathBuf>,
    },
    /// Decode a file and write the grid as JSON
    Decode {
        /// Input terrain file
        input: PathBuf,
        /// World file for image inputs
        #[arg(long)]
        world: Option<PathBuf>,
        /// Output JSON file
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Render a slope or aspect texture as PNG
    Surface {
        /// Input terrain file
        input: PathBuf,
        /// World file for image inputs
        #[arg(long)]
        world: Option<PathBuf>,
        /// Surface property: slope or aspect
        #[arg(short, long, default_value = "slope")]
        mode: SurfaceMode,
        /// Longer side of the texture in pixels
        #[arg(short, long, default_value = "512")]
        resolution: usize,
        /// Output PNG file
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "info,relief_grid=debug,relief_formats=debug,relief_surface=debug,relief=debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = ReliefConfig::load(cli.config.as_deref())?;
    debug!("Using {:?}", config);

    match cli.command {
        Commands::Formats => {
            print_formats();
        }
        Commands::Info { input, world } => {
            let report = decode_file(&input, world.as_deref(), config.decode)?;
            print_info(&input, &report);
        }
        Commands::Decode {
            input,
            world,
            output,
        } => {
            let report = decode_file(&input, world.as_deref(), config.decode)?;
            let json = serde_json::to_vec(&report.grid).context("Failed to serialize grid")?;
            std::fs::write(&output, json)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            info!(
                "Wrote {}x{} grid to {}",
                report.grid.width(),
                report.grid.height(),
                output.display()
            );
        }
        Commands::Surface {
            input,
            world,
            mode,
            resolution,
            output,
        } => {
            let report = decode_file(&input, world.as_deref(), config.decode)?;
            if report.grid.is_surrogate() {
                info!("Grid comes from image luminance; the texture shows brightness, not terrain");
            }
            let texture = derive_surface_with(&report.grid, resolution, mode, &config.surface)?;
            let image = image::RgbaImage::from_raw(
                texture.width as u32,
                texture.height as u32,
                texture.rgba,
            )
            .ok_or_else(|| anyhow!("Texture buffer does not match its dimensions"))?;
            image
                .save(&output)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            info!(
                "Wrote {} texture {}x{} to {}",
                mode,
                texture.width,
                texture.height,
                output.display()
            );
        }
    }

    Ok(())
}

/// Read the input (and its world file) and decode it on a worker thread
/// that owns the buffer.
fn decode_file(input: &Path, world: Option<&Path>, options: DecodeOptions) -> Result<DecodeReport> {
    let filename = input
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_owned)
        .ok_or_else(|| anyhow!("{} has no usable file name", input.display()))?;

    let buffer =
        std::fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;

    let companion_path = match world {
        Some(path) => Some(path.to_path_buf()),
        None => find_world_file(input, &filename),
    };
    let companion = match companion_path {
        Some(path) => {
            debug!("Using world file {}", path.display());
            Some(
                std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read world file {}", path.display()))?,
            )
        }
        None => None,
    };

    let request = DecodeRequest {
        filename,
        buffer,
        companion,
    };
    let worker = std::thread::Builder::new()
        .name("decode".to_string())
        .spawn(move || decode_owned(request, &options))
        .context("Failed to start decode thread")?;

    let report = worker
        .join()
        .map_err(|_| anyhow!("Decode thread panicked"))?
        .with_context(|| format!("Failed to decode {}", input.display()))?;

    for warning in &report.warnings {
        debug!("Recovery: {}", warning);
    }
    Ok(report)
}

/// Sidecar world file next to an image, if one exists.
fn find_world_file(input: &Path, filename: &str) -> Option<PathBuf> {
    let is_image = registry::classify(filename).is_some_and(|d| d.id == FormatId::ImageWorldFile);
    if !is_image {
        return None;
    }
    registry::world_file_extensions(filename)
        .iter()
        .map(|ext| ext.trim_start_matches('.'))
        .flat_map(|ext| [ext.to_string(), ext.to_ascii_uppercase()])
        .map(|ext| input.with_extension(ext))
        .find(|candidate| candidate.is_file())
}

fn print_formats() {
    for descriptor in registry::descriptors() {
        let status = if descriptor.supported { "yes" } else { "no" };
        println!(
            "{:<16} {:<28} {:<3} {}",
            descriptor.id,
            descriptor.display_name,
            status,
            descriptor.extensions.join(" ")
        );
        if !descriptor.guidance.is_empty() {
            println!("{:<16} {}", "", descriptor.guidance);
        }
    }
}

fn print_info(input: &Path, report: &DecodeReport) {
    let grid = &report.grid;
    let origin = grid.origin();
    let pixel = grid.pixel_size();
    let (min_x, min_y, max_x, max_y) = grid.bounds();

    println!("File:        {}", input.display());
    println!("Format:      {}", report.format);
    println!("Size:        {} x {}", grid.width(), grid.height());
    println!("Origin:      ({}, {})", origin.x, origin.y);
    println!("Pixel size:  ({}, {})", pixel.x, pixel.y);
    println!("Bounds:      [{}, {}] - [{}, {}]", min_x, min_y, max_x, max_y);
    let crs = match grid.crs_hint() {
        Some(CrsHint::Geographic) => "geographic".to_string(),
        Some(CrsHint::Utm { zone: Some(zone) }) => format!("UTM zone {}", zone),
        Some(CrsHint::Utm { zone: None }) => "UTM".to_string(),
        None => "unknown".to_string(),
    };
    println!("CRS hint:    {}", crs);
    if let Some(no_data) = grid.no_data_value() {
        println!("No-data:     {}", no_data);
    }
    match grid.stats() {
        Some(stats) => println!(
            "Elevation:   min {:.2}  max {:.2}  mean {:.2}  ({} valid cells)",
            stats.min, stats.max, stats.mean, stats.valid_count
        ),
        None => println!("Elevation:   no valid cells"),
    }
    if grid.is_surrogate() {
        println!("Values:      image luminance (surrogate, not heights)");
    }
    for warning in &report.warnings {
        println!("Recovered:   {}", warning);
    }
}
