//! # topods CLI
//!
//! Reduces a land/water PNG mask to a coarser grid while keeping its islands,
//! lakes and coastlines topologically intact.

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use topods::config::{Config, Scheme};
use topods::metrics::pixel_weights;
use topods::pipeline::{correct_digitization_png, downsample_acn_png, downsample_png, PipelineOutput};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Method {
    /// Topology-preserving integer program (boundary loops)
    Ilp,
    /// Integer program keeping each component's Euler characteristic
    Euler,
    /// 2x2 adaptive-crossing-number decimation
    Acn,
    /// Greedy digitization corrector
    Passat,
}

#[derive(Parser)]
#[command(name = "topods")]
#[command(about = "Topology-preserving downsampling of binary land/water rasters")]
#[command(long_about = "Downsamples a PNG mask (land = bright pixels) by big pixels of cellW x cellH:
  topods coast.png 8 8                 # ILP, land weight from config (default 2)
  topods coast.png 8 8 3 1 1 0         # land weight 3, error metrics, component maps
  topods coast.png 8 8 --method euler  # Euler-characteristic formulation
  topods coast.png --method acn        # 2x2 ACN baseline
  topods coast.png 4 4 --method passat # greedy corrector

Outputs are written beside the input as <input>.<W>x<H>.<suffix>.png")]
struct Cli {
    /// Input PNG mask
    input: PathBuf,

    /// Big pixel width
    cell_w: Option<usize>,

    /// Big pixel height
    cell_h: Option<usize>,

    /// Score weight of a land pixel
    land_weight: Option<i64>,

    /// Non-zero to report IoU, Dice, Precision and Recall
    calc_errors: Option<u8>,

    /// Non-zero to save input and output component maps
    save_components: Option<u8>,

    /// Added to the cellW/4 candidate radius
    #[arg(allow_hyphen_values = true)]
    neighborhood_offset: Option<i64>,

    #[arg(long, value_enum, default_value_t = Method::Ilp)]
    method: Method,

    /// JSON config file; positional arguments and flags override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Solver time limit in seconds
    #[arg(long)]
    time_limit: Option<f64>,

    /// Also try shifted grids and keep the best IoU
    #[arg(long)]
    alternative_offsets: bool,

    /// Fill the smallest enclosed lake before downsampling
    #[arg(long)]
    fill_smallest_lake: bool,

    /// Derive land and water weights so that this many land pixels win a big pixel
    #[arg(long)]
    land_threshold: Option<usize>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn build_config(cli: &Cli) -> Result<Config> {
    let mut cfg = match &cli.config {
        Some(path) => Config::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(w) = cli.cell_w {
        cfg.downsample.cell_w = w;
        cfg.corrector.cell_size = w;
    }
    if let Some(h) = cli.cell_h {
        cfg.downsample.cell_h = h;
    }
    if let Some(lw) = cli.land_weight {
        cfg.downsample.land_weight = lw;
    }
    if let Some(flag) = cli.calc_errors {
        cfg.io.calculate_errors = flag != 0;
    }
    if let Some(flag) = cli.save_components {
        cfg.io.save_components = flag != 0;
    }
    if let Some(offset) = cli.neighborhood_offset {
        cfg.downsample.neighborhood_offset = offset;
    }
    if let Some(secs) = cli.time_limit {
        cfg.downsample.time_limit_secs = secs;
    }
    cfg.io.alternative_offsets |= cli.alternative_offsets;
    cfg.io.fill_smallest_lake |= cli.fill_smallest_lake;

    if let Some(threshold) = cli.land_threshold {
        let total = cfg.downsample.cell_w * cfg.downsample.cell_h;
        let Some((land, water)) = pixel_weights(total, threshold) else {
            bail!("no pixel weights for {} land pixels out of {}", threshold, total);
        };
        log::info!("land threshold {}: land weight {}, water weight {}", threshold, land, water);
        cfg.downsample.land_weight = land;
        cfg.downsample.water_weight = water;
    }

    if cli.method == Method::Euler {
        cfg.downsample.scheme = Scheme::Euler;
    }

    cfg.validate()?;
    Ok(cfg)
}

fn report(out: &PipelineOutput) {
    println!(
        "{} ({}x{}, offset {:?})",
        out.output_path.display(),
        out.output.w,
        out.output.h,
        out.offset
    );
    if let Some(m) = &out.metrics {
        println!(
            "IoU {:.4} Dice {:.4} Precision {:.4} Recall {:.4}",
            m.iou, m.dice, m.precision, m.recall
        );
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .target(env_logger::Target::Stderr)
        .init();

    let cfg = build_config(&cli)?;
    log::debug!("config: {:?}", cfg);

    let out = match cli.method {
        Method::Ilp | Method::Euler => downsample_png(&cli.input, &cfg),
        Method::Acn => downsample_acn_png(&cli.input, &cfg),
        Method::Passat => correct_digitization_png(&cli.input, &cfg),
    }
    .with_context(|| format!("{:?} on {}", cli.method, cli.input.display()))?;

    report(&out);
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        log::error!("{e:#}");
        std::process::exit(1);
    }
}
