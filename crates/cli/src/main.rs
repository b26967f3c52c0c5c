//! Proxima CLI - multi-criteria proximity analysis over georeferenced rasters

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use proxima_cloud::blocking::{load_catalog, BlockingFetcher};
use proxima_cloud::{FetchOptions, SourceRef};
use proxima_colormap::Palette;
use proxima_core::io::{read_dataset, Compression, GeoTiffOptions, DEFAULT_TILE_SIZE};
use proxima_engine::{
    EngineOptions, LayerKind, LayerRegistry, LayerSelection, ProximityEngine, ProximityOutput,
};

/// Layer listing endpoint used when no catalog is given
const DEFAULT_CATALOG: &str =
    "https://a55kqhh6wf.execute-api.us-east-1.amazonaws.com/default/rasterList";

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "proxima")]
#[command(author, version, about = "Multi-criteria proximity analysis over georeferenced rasters", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the layers of a catalog with their display palette
    Layers {
        #[command(flatten)]
        source: CatalogArgs,
    },
    /// Combine selected layers into one normalized proximity surface
    Analyze {
        #[command(flatten)]
        source: CatalogArgs,
        /// Layer as NAME[:DECAY[:WEIGHT]] (repeatable; decay defaults to 0.01, weight to 1)
        #[arg(short, long = "layer", required = true)]
        layers: Vec<String>,
        /// Output GeoTIFF file
        #[arg(short, long)]
        output: PathBuf,
        /// Tile compression: deflate, lzw or none
        #[arg(long, default_value = "deflate")]
        compression: String,
        /// Tile edge in pixels (multiple of 16)
        #[arg(long, default_value_t = DEFAULT_TILE_SIZE)]
        tile_size: u32,
        /// Nodata sentinel recorded in the output
        #[arg(long, default_value = "-9999", allow_hyphen_values = true)]
        nodata: f64,
        /// Name given to the output layer
        #[arg(long)]
        name: Option<String>,
    },
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
}

#[derive(clap::Args)]
struct CatalogArgs {
    /// Catalog endpoint URL or local JSON file
    #[arg(short, long, env = "PROXIMA_CATALOG", default_value = DEFAULT_CATALOG)]
    catalog: String,
    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,
    /// Retries on timeouts and connection failures
    #[arg(long, default_value_t = 3)]
    retries: u32,
}

impl CatalogArgs {
    fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            request_timeout: Duration::from_secs(self.timeout),
            max_retries: self.retries,
        }
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;
    Ok(())
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn load_registry(args: &CatalogArgs) -> Result<LayerRegistry> {
    let pb = spinner("Loading layer catalog...");
    let location = SourceRef::parse(&args.catalog);
    let catalog = load_catalog(&location, args.fetch_options());
    pb.finish_and_clear();
    let catalog = catalog.with_context(|| format!("Failed to load catalog from {}", location))?;
    info!("Catalog: {} layer(s)", catalog.len());
    Ok(LayerRegistry::from_catalog(&catalog))
}

fn parse_selections(layers: &[String]) -> Result<Vec<LayerSelection>> {
    layers
        .iter()
        .map(|s| {
            s.parse::<LayerSelection>()
                .with_context(|| format!("Invalid layer selection '{}'", s))
        })
        .collect()
}

fn swatch_hex(palette: Palette) -> String {
    palette
        .swatch(5)
        .iter()
        .map(|c| c.to_hex())
        .collect::<Vec<_>>()
        .join(" ")
}

fn done(output: &ProximityOutput, path: &PathBuf, elapsed: Duration) {
    println!("{} saved to: {}", output.display.name, path.display());
    println!(
        "  {} x {} | {} | tile {} | nodata {}",
        output.output.width(),
        output.output.height(),
        output.output.compression(),
        output.output.tile_size(),
        output
            .display
            .nodata
            .map(|v| v.to_string())
            .unwrap_or_else(|| "none".to_string())
    );
    println!("  Palette: {}", output.display.palette);
    for layer in &output.stats.layers {
        println!(
            "  {:<24} k={:<8} w={:<6} features={}",
            layer.name, layer.params.decay, layer.params.weight, layer.feature_cells
        );
    }
    println!(
        "  Weighted sum range: [{:.6}, {:.6}]{}",
        output.stats.raw_min,
        output.stats.raw_max,
        if output.stats.degenerate {
            " (constant, output is all zero)"
        } else {
            ""
        }
    );
    println!("  Processing time: {:.2?}", elapsed);
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        // ── Layers ───────────────────────────────────────────────────
        Commands::Layers { source } => {
            let registry = load_registry(&source)?;
            if registry.is_empty() {
                println!("Catalog {} lists no layers", source.catalog);
                return Ok(());
            }
            for layer in registry.list_layers() {
                let kind = match layer.kind() {
                    LayerKind::Raster => "raster",
                    LayerKind::PointTable => "points",
                };
                println!(
                    "{:<24} {:<7} {:<10} {}",
                    layer.label(),
                    kind,
                    layer.palette().name(),
                    layer.source()
                );
                if cli.verbose {
                    println!("  {}", swatch_hex(layer.palette()));
                }
            }
        }

        // ── Analyze ──────────────────────────────────────────────────
        Commands::Analyze {
            source,
            layers,
            output,
            compression,
            tile_size,
            nodata,
            name,
        } => {
            let compression: Compression = compression
                .parse()
                .context("Invalid --compression")?;
            let geotiff = GeoTiffOptions {
                compression,
                tile_size,
                nodata: Some(nodata),
            };
            geotiff.validate().context("Invalid output options")?;

            let selections = parse_selections(&layers)?;
            let registry = load_registry(&source)?;
            let fetcher = BlockingFetcher::new(source.fetch_options())
                .context("Failed to start the HTTP client")?;
            let engine = ProximityEngine::new(
                fetcher,
                EngineOptions {
                    geotiff,
                    output_name: name,
                },
            );

            let start = Instant::now();
            let pb = spinner("Computing proximity surface...");
            let result = engine.run(&registry, &selections);
            pb.finish_and_clear();
            let result = result.context("Proximity analysis failed")?;
            let elapsed = start.elapsed();

            let pb = spinner("Writing output...");
            let written = result.output.write_to(&output);
            pb.finish_and_clear();
            written.with_context(|| format!("Failed to write {}", output.display()))?;
            done(&result, &output, elapsed);
        }

        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { input } => {
            let pb = spinner("Reading raster...");
            let dataset = read_dataset(&input);
            pb.finish_and_clear();
            let dataset = dataset.context("Failed to read raster")?;
            let band = dataset.band(0).context("Failed to read band 1")?;
            let stats = band.statistics();

            println!("File: {}", input.display());
            println!(
                "Dimensions: {} x {} ({} cells), {} band(s) of {}",
                dataset.width(),
                dataset.height(),
                band.len(),
                dataset.band_count(),
                dataset.dtype()
            );
            match dataset.transform() {
                Some(gt) => {
                    println!("Origin: ({:.6}, {:.6})", gt.origin_x, gt.origin_y);
                    println!("Pixel size: ({}, {})", gt.pixel_width, gt.pixel_height);
                }
                None => println!("Transform: none"),
            }
            if let Some((min_x, min_y, max_x, max_y)) = band.bounds() {
                println!(
                    "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                    min_x, min_y, max_x, max_y
                );
            }
            match dataset.crs() {
                Some(crs) => println!("CRS: {}", crs),
                None => println!("CRS: none"),
            }
            if let Some(nodata) = dataset.nodata() {
                println!("NoData: {}", nodata);
            }
            println!("\nStatistics (band 1):");
            if let Some(min) = stats.min {
                println!("  Min: {:.4}", min);
            }
            if let Some(max) = stats.max {
                println!("  Max: {:.4}", max);
            }
            if let Some(mean) = stats.mean {
                println!("  Mean: {:.4}", mean);
            }
            println!(
                "  Valid cells: {} ({:.1}%)",
                stats.valid_count,
                100.0 * stats.valid_count as f64 / band.len() as f64
            );
        }
    }

    Ok(())
}
