//! Tessella CLI - tiled raster inspection and resampling

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

use tessella_core::io::{open_tiff, write_tiff, TiffOptions};
use tessella_core::iterator::PixelIterator;
use tessella_core::raster::StatisticsAccumulator;
use tessella_core::TiledImage;
use tessella_interpolation::{
    rescale, Interpolation, InterpolationMethod, InterpolationParams, ResampleParams,
};

#[derive(Parser)]
#[command(name = "tessella")]
#[command(author, version, about = "Tiled raster cursors and interpolation", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show layout and georeferencing of a TIFF
    Info {
        /// Input file
        input: PathBuf,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Per-band statistics, computed tile by tile
    Stats {
        /// Input file
        input: PathBuf,
    },

    /// Interpolate every band at a fractional pixel position
    Sample {
        /// Input file
        input: PathBuf,
        /// Column (pixel centers at integers)
        #[arg(short, allow_negative_numbers = true)]
        x: f64,
        /// Row (pixel centers at integers)
        #[arg(short, allow_negative_numbers = true)]
        y: f64,
        /// Interpolation method: nearest, bilinear, bicubic, lanczos
        #[arg(short, long, default_value = "bilinear")]
        method: String,
    },

    /// Rescale an image onto a denser or coarser grid
    Resample {
        /// Input file
        input: PathBuf,
        /// Output file
        output: PathBuf,
        /// Scale factor applied to both axes
        #[arg(short, long, default_value = "2.0")]
        scale: f64,
        /// Interpolation method: nearest, bilinear, bicubic, lanczos
        #[arg(short, long, default_value = "bilinear")]
        method: String,
        /// Output tile edge in pixels
        #[arg(long, default_value = "256")]
        tile_size: usize,
        /// Value written where the source has no coverage
        #[arg(long, default_value = "0.0")]
        fill: f64,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install log subscriber")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_image(path: &PathBuf) -> Result<TiledImage> {
    let pb = spinner("Opening image...");
    let image = open_tiff(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    pb.finish_and_clear();
    info!(
        "Input: {} x {}, {} band(s), {}",
        image.width(),
        image.height(),
        image.bands(),
        image.sample_type()
    );
    Ok(image)
}

fn parse_method(s: &str) -> Result<InterpolationMethod> {
    s.parse::<InterpolationMethod>()
        .context("Unknown interpolation method")
}

fn done(name: &str, path: &PathBuf, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { input, json } => {
            let image = read_image(&input)?;
            let layout = image.layout();
            let transform = image.transform();

            if json {
                let doc = serde_json::json!({
                    "file": input.display().to_string(),
                    "layout": layout,
                    "tiles": layout.tile_count(),
                    "transform": transform,
                });
                println!("{}", serde_json::to_string_pretty(&doc)?);
                return Ok(());
            }

            let (min_x, min_y, max_x, max_y) = transform.bounds(image.width(), image.height());
            println!("File: {}", input.display());
            println!("Bounds: {}", layout.bounds);
            println!("Bands: {} ({})", layout.bands, layout.sample_type);
            println!("Interleave: {:?}", layout.interleave);
            println!(
                "Tiles: {} x {} of {} x {} ({} total)",
                layout.tiles_across(),
                layout.tiles_down(),
                layout.tile_width,
                layout.tile_height,
                layout.tile_count()
            );
            println!("Cell size: {}", transform.cell_size());
            println!(
                "World bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                min_x, min_y, max_x, max_y
            );
        }

        // ── Stats ────────────────────────────────────────────────────
        Commands::Stats { input } => {
            let mut image = read_image(&input)?;
            let layout = *image.layout();
            let start = Instant::now();

            let pb = ProgressBar::new(layout.tile_count() as u64);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{bar:40.cyan/blue} {pos}/{len} tiles {msg}")
            {
                pb.set_style(style);
            }

            let mut acc = StatisticsAccumulator::new(layout.bands);
            for tile in layout.tile_indices() {
                let Some(area) = layout.tile_bounds(tile) else {
                    continue;
                };
                let visited = {
                    let mut cursor = PixelIterator::with_area(&image, area)
                        .with_context(|| format!("Failed to read tile {}", tile))?;
                    acc.consume(&mut cursor)?
                };
                // Only one decoded tile stays resident at a time
                image.evict_tile(tile)?;
                debug!("Tile {}: {} samples", tile, visited);
                pb.inc(1);
            }
            pb.finish_and_clear();

            println!("File: {}", input.display());
            for (band, stats) in acc.finish().iter().enumerate() {
                println!("\nBand {}:", band);
                if let Some(min) = stats.min {
                    println!("  Min: {:.4}", min);
                }
                if let Some(max) = stats.max {
                    println!("  Max: {:.4}", max);
                }
                if let Some(mean) = stats.mean {
                    println!("  Mean: {:.4}", mean);
                }
                println!("  Valid samples: {}", stats.valid_count);
                if stats.nan_count > 0 {
                    println!("  NaN samples: {}", stats.nan_count);
                }
            }
            println!("\n  Processing time: {:.2?}", start.elapsed());
        }

        // ── Sample ───────────────────────────────────────────────────
        Commands::Sample {
            input,
            x,
            y,
            method,
        } => {
            let method = parse_method(&method)?;
            let image = read_image(&input)?;
            let cursor = PixelIterator::new(&image)?;
            let mut interp = Interpolation::new(cursor, InterpolationParams::new(method))?;

            let mut values = vec![0.0; image.bands()];
            interp
                .interpolate_pixel(x, y, &mut values)
                .with_context(|| format!("Cannot sample at ({}, {})", x, y))?;

            println!("{} at ({}, {}):", method, x, y);
            for (band, value) in values.iter().enumerate() {
                println!("  Band {}: {}", band, value);
            }
        }

        // ── Resample ─────────────────────────────────────────────────
        Commands::Resample {
            input,
            output,
            scale,
            method,
            tile_size,
            fill,
        } => {
            let params = ResampleParams {
                interpolation: InterpolationParams::new(parse_method(&method)?),
                fill_value: fill,
            };
            let image = read_image(&input)?;

            let start = Instant::now();
            let pb = spinner("Resampling...");
            let result = rescale(&image, scale, scale, tile_size, &params)
                .context("Failed to resample")?;
            pb.finish_and_clear();
            let elapsed = start.elapsed();
            info!("Output: {} x {}", result.width(), result.height());

            let pb = spinner("Writing output...");
            write_tiff(&result, &output, &TiffOptions::default())
                .context("Failed to write output")?;
            pb.finish_and_clear();
            done("Resampled image", &output, elapsed);
        }
    }

    Ok(())
}
