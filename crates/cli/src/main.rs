//! landsat - composite builder for Landsat scenes

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use landsat_algorithms::cloud::scene_coverage;
use landsat_algorithms::{CompositeKind, NdviMode, NdviOptions, Pipeline, ProcessRequest};
use landsat_core::io::read_geotiff;
use landsat_core::{parse_band_list, BandSet, BoundingBox, Compression, Raster, Settings};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "landsat")]
#[command(author, version, about = "Composite images from Landsat scenes", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a composite from a scene directory or archive
    Process {
        /// Scene directory or compressed archive
        path: PathBuf,
        /// Band combination, e.g. 432 or 10114
        #[arg(short, long, default_value = "432")]
        bands: String,
        /// Pan-sharpen with band 8
        #[arg(short, long, conflicts_with_all = ["ndvi", "ndvigrey"])]
        pansharpen: bool,
        /// NDVI rendered through the colormap
        #[arg(long, conflicts_with = "ndvigrey")]
        ndvi: bool,
        /// NDVI as a single grey band
        #[arg(long)]
        ndvigrey: bool,
        /// Zero NDVI pixels flagged as cloud or cirrus in the QA band
        #[arg(long)]
        cloud_mask: bool,
        /// Clip box in degrees: xmin,ymin,xmax,ymax
        #[arg(long, allow_hyphen_values = true)]
        clip: Option<BoundingBox>,
        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Show what a scene contains
    Info {
        /// Scene directory or compressed archive
        path: PathBuf,
        #[command(flatten)]
        config: ConfigArgs,
    },
}

#[derive(Args)]
struct ConfigArgs {
    /// Root directory for processed images
    #[arg(short, long, env = "LANDSAT_OUTPUT_DIR")]
    output: Option<PathBuf>,
    /// Colormap file for NDVI colour output
    #[arg(long, env = "LANDSAT_COLORMAP")]
    colormap: Option<PathBuf>,
    /// Maximum bands processed at once
    #[arg(long, env = "LANDSAT_MAX_WORKERS")]
    max_workers: Option<usize>,
    /// Extract archives again even if already extracted
    #[arg(long)]
    force_unzip: bool,
    /// Keep clipped band files next to the scene
    #[arg(long)]
    keep_clipped: bool,
    /// Directory for clip scratch files instead of the system temp dir
    #[arg(long, env = "LANDSAT_SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,
    /// GeoTIFF compression: none, lzw or deflate
    #[arg(long, env = "LANDSAT_COMPRESSION")]
    compression: Option<Compression>,
}

impl ConfigArgs {
    fn settings(self) -> Result<Settings> {
        let mut settings = Settings::default();
        if let Some(dir) = self.output {
            settings.output_dir = dir;
        }
        if let Some(n) = self.max_workers {
            settings.max_workers = n;
        }
        settings.colormap_path = self.colormap;
        settings.force_unzip = self.force_unzip;
        settings.keep_clipped = self.keep_clipped;
        settings.scratch_dir = self.scratch_dir;
        if let Some(compression) = self.compression {
            settings.compression = compression;
        }
        settings.validate().context("Invalid configuration")?;
        Ok(settings)
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")
}

fn spinner(msg: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    Ok(pb)
}

fn composite_kind(pansharpen: bool, ndvi: bool, ndvigrey: bool, cloud_mask: bool) -> Result<CompositeKind> {
    if cloud_mask && !(ndvi || ndvigrey) {
        bail!("--cloud-mask only applies to --ndvi or --ndvigrey");
    }
    let kind = if pansharpen {
        CompositeKind::PanSharpen
    } else if ndvi || ndvigrey {
        let mode = if ndvigrey { NdviMode::Grey } else { NdviMode::Colormap };
        CompositeKind::Ndvi(NdviOptions { mode, cloud_mask })
    } else {
        CompositeKind::TrueColor
    };
    Ok(kind)
}

fn print_band(label: &str, path: &Path) -> Result<()> {
    let raster: Raster<u16> =
        read_geotiff(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let (rows, cols) = raster.shape();
    let crs = raster
        .crs()
        .map_or_else(|| "none".to_string(), |c| c.to_string());
    let name = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
    let stats = raster.statistics();

    println!("  {:>3}: {} ({} x {}, {})", label, name, cols, rows, crs);
    if let (Some(min), Some(max)) = (stats.min, stats.max) {
        println!(
            "       values {}..{}, {:.1}% valid",
            min,
            max,
            100.0 * stats.valid_count as f64 / raster.len().max(1) as f64
        );
    }
    Ok(())
}

fn opt(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

// ─── Commands ───────────────────────────────────────────────────────────

fn process(path: PathBuf, request: ProcessRequest, settings: &Settings) -> Result<()> {
    let pipeline = Pipeline::new(settings).context("Invalid configuration")?;

    let pb = spinner(&format!("Processing {}...", path.display()))?;
    let start = Instant::now();
    let result = pipeline.run(&request);
    pb.finish_and_clear();

    let output = result.with_context(|| format!("Failed to process {}", path.display()))?;
    info!("Processing time: {:.2?}", start.elapsed());
    println!("The output is stored at {}", output.display());
    Ok(())
}

fn info_cmd(path: PathBuf, settings: &Settings) -> Result<()> {
    let set = BandSet::open(&path, &[], settings)
        .with_context(|| format!("Failed to open scene {}", path.display()))?;
    let scene = set.scene();

    println!("Scene: {}", scene.id());
    println!("Directory: {}", set.dir().display());
    println!("Satellite: {}", opt(scene.satellite()));
    println!("Path/Row: {}/{}", opt(scene.path()), opt(scene.row()));
    if let Some(date) = &scene.metadata().date_acquired {
        println!("Acquired: {}", date);
    }

    let qa = set.read_qa().context("Failed to read QA band")?;
    let (coverage, source) = scene_coverage(qa.as_ref(), scene.metadata());
    println!("Cloud cover: {:.2}% ({:?})", coverage, source);

    println!("Bands:");
    let bands = set.available_bands().context("Failed to list bands")?;
    for (band, band_path) in &bands {
        print_band(&band.to_string(), band_path)?;
    }
    if let Some(qa_path) = set.qa_path() {
        print_band("QA", qa_path)?;
    }
    if bands.is_empty() {
        println!("  (no band files found)");
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Process {
            path,
            bands,
            pansharpen,
            ndvi,
            ndvigrey,
            cloud_mask,
            clip,
            config,
        } => {
            let settings = config.settings()?;
            let kind = composite_kind(pansharpen, ndvi, ndvigrey, cloud_mask)?;
            let bands = parse_band_list(&bands).context("Invalid band list")?;

            let mut request = ProcessRequest::new(&path, kind).with_bands(bands);
            if let Some(bbox) = clip {
                request = request.with_clip(bbox);
            }
            process(path, request, &settings)
        }
        Commands::Info { path, config } => {
            let settings = config.settings()?;
            info_cmd(path, &settings)
        }
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = setup_logging(cli.verbose).and_then(|_| run(cli)) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
