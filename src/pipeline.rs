//! File-level drivers: load a PNG mask, reduce it, write the result next to
//! the input as `<input>.<W>x<H>.<suffix>.png`.

use crate::acn::downsample_acn;
use crate::config::{Config, Scheme};
use crate::corrector::{correct_digitization, CorrectorOutcome};
use crate::error::PipelineError;
use crate::ilp::MicroLpBackend;
use crate::im::{fill_smallest_lake, LandIm};
use crate::metrics::{error_metrics, ErrorMetrics};
use crate::optimizer::downsample_with;
use crate::optimizer::offsets::downsample_best_offset;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub output_path: PathBuf,
    pub output: LandIm,
    pub metrics: Option<ErrorMetrics>,
    /// Shift applied to the input before downsampling.
    pub offset: (usize, usize),
}

/// `<input>.<new_w>x<new_h>.<suffix>` beside the input file.
pub fn output_path(input: &Path, new_w: usize, new_h: usize, suffix: &str) -> PathBuf {
    let mut name = input.as_os_str().to_os_string();
    name.push(format!(".{}x{}.{}", new_w, new_h, suffix));
    PathBuf::from(name)
}

/// Load the input mask and apply the optional lake filling.
pub fn load_mask(input: &Path, cfg: &Config) -> Result<LandIm, PipelineError> {
    let mut mask = LandIm::load_png(input, cfg.io.png_threshold)?;
    log::info!(
        "loaded {}: {}x{}, {} land pixels",
        input.display(),
        mask.w,
        mask.h,
        mask.count_land()
    );
    if cfg.io.fill_smallest_lake && !fill_smallest_lake(&mut mask) {
        log::info!("{}: no enclosed lake to fill", input.display());
    }
    Ok(mask)
}

fn metrics_if(cfg: &Config, input: &LandIm, output: &LandIm) -> Option<ErrorMetrics> {
    if cfg.io.calculate_errors {
        error_metrics(input, output)
    } else {
        None
    }
}

/// Topology-preserving ILP downsampling of a PNG.
pub fn downsample_png(input: &Path, cfg: &Config) -> Result<PipelineOutput, PipelineError> {
    cfg.validate()?;
    let mask = load_mask(input, cfg)?;
    let ds = &cfg.downsample;

    let (report, offset, metrics) = if cfg.io.alternative_offsets {
        let best = downsample_best_offset(&mask, ds, &MicroLpBackend::default())?;
        (best.report, best.offset, Some(best.metrics))
    } else {
        let report = downsample_with(&mask, ds, &MicroLpBackend::default())?;
        let metrics = metrics_if(cfg, &mask, &report.output);
        (report, (0, 0), metrics)
    };

    let (new_w, new_h) = (report.output.w, report.output.h);
    let suffix = match ds.scheme {
        Scheme::BoundaryLoops => format!("lw{}.png", ds.land_weight),
        Scheme::Euler => format!("euler.lw{}.png", ds.land_weight),
    };
    let path = output_path(input, new_w, new_h, &suffix);
    report.output.save_png(&path)?;
    log::info!("wrote {}", path.display());

    if cfg.io.save_components {
        report
            .input_components
            .save_png(output_path(input, new_w, new_h, "input_components.png"))?;
        report
            .output_components
            .save_png(output_path(input, new_w, new_h, "output_components.png"))?;
    }

    Ok(PipelineOutput {
        output_path: path,
        output: report.output,
        metrics,
        offset,
    })
}

/// 2x2 ACN decimation of a PNG.
pub fn downsample_acn_png(input: &Path, cfg: &Config) -> Result<PipelineOutput, PipelineError> {
    let mask = load_mask(input, cfg)?;
    let output = downsample_acn(&mask)?;
    let path = output_path(input, output.w, output.h, "ACN.png");
    output.save_png(&path)?;
    log::info!("wrote {}", path.display());

    Ok(PipelineOutput {
        metrics: metrics_if(cfg, &mask, &output),
        output_path: path,
        output,
        offset: (0, 0),
    })
}

/// Greedy digitization correction of a PNG.
pub fn correct_digitization_png(input: &Path, cfg: &Config) -> Result<PipelineOutput, PipelineError> {
    cfg.validate()?;
    let mask = load_mask(input, cfg)?;
    let correction = correct_digitization(&mask, &cfg.corrector)?;
    let output = match (correction.outcome, correction.output) {
        (CorrectorOutcome::Failed, _) | (_, None) => {
            return Err(PipelineError::CorrectorFailed {
                iterations: correction.iterations,
            });
        }
        (_, Some(output)) => output,
    };

    let path = output_path(input, output.w, output.h, "Passat.png");
    output.save_png(&path)?;
    log::info!("wrote {}", path.display());

    Ok(PipelineOutput {
        metrics: metrics_if(cfg, &mask, &output),
        output_path: path,
        output,
        offset: (0, 0),
    })
}

// Tests
// -----------------------------------------------------------------------------
