use super::{downsample_with, DownsampleReport};
use crate::config::DownsampleConfig;
use crate::error::DownsampleError;
use crate::ilp::IlpBackend;
use crate::im::LandIm;
use crate::metrics::{error_metrics, ErrorMetrics};

/// Shifts `(dx, dy)` to try, the unshifted grid first. Steps are a quarter
/// cell (at least one pixel) up to half a cell in each direction.
pub fn alternative_offsets(cell_w: usize, cell_h: usize) -> Vec<(usize, usize)> {
    let step_x = (cell_w / 4).max(1);
    let step_y = (cell_h / 4).max(1);
    let mut offsets = vec![(0, 0)];
    for dx in (0..=cell_w / 2).step_by(step_x) {
        for dy in (0..=cell_h / 2).step_by(step_y) {
            if (dx, dy) != (0, 0) {
                offsets.push((dx, dy));
            }
        }
    }
    offsets
}

/// Copy of `mask` moved right by `dx` and down by `dy`; vacated pixels are water.
pub fn shift_mask(mask: &LandIm, dx: usize, dy: usize) -> LandIm {
    let mut out = LandIm::new(mask.w, mask.h);
    for y in dy..mask.h {
        for x in dx..mask.w {
            out.set(x, y, mask.at(x - dx, y - dy));
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq)]
pub struct BestOffset {
    pub offset: (usize, usize),
    pub report: DownsampleReport,
    /// Measured against the shifted input.
    pub metrics: ErrorMetrics,
}

/// Downsample every shifted copy of `mask` and keep the success with the
/// highest IoU; the earlier offset wins ties. Fails with the unshifted
/// attempt's error when no offset succeeds.
pub fn downsample_best_offset(
    mask: &LandIm,
    cfg: &DownsampleConfig,
    backend: &dyn IlpBackend,
) -> Result<BestOffset, DownsampleError> {
    let mut best: Option<BestOffset> = None;
    let mut first_err = None;

    for (dx, dy) in alternative_offsets(cfg.cell_w, cfg.cell_h) {
        let shifted = shift_mask(mask, dx, dy);
        let report = match downsample_with(&shifted, cfg, backend) {
            Ok(report) => report,
            Err(e) => {
                log::debug!("offsets: ({}, {}) failed: {}", dx, dy, e);
                first_err.get_or_insert(e);
                continue;
            }
        };
        let Some(metrics) = error_metrics(&shifted, &report.output) else {
            continue;
        };
        log::debug!("offsets: ({}, {}) IoU {:.4}", dx, dy, metrics.iou);

        if best.as_ref().is_none_or(|b| metrics.iou > b.metrics.iou) {
            best = Some(BestOffset {
                offset: (dx, dy),
                report,
                metrics,
            });
        }
    }

    match best {
        Some(best) => {
            log::info!(
                "offsets: best offset ({}, {}) with IoU {:.4}",
                best.offset.0,
                best.offset.1,
                best.metrics.iou
            );
            Ok(best)
        }
        None => Err(first_err.unwrap_or(DownsampleError::Solver(
            "no offset produced a comparable output".to_string(),
        ))),
    }
}
