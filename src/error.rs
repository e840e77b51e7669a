/// Coarse outcome of a downsampling call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownsampleStatus {
    Success,
    Infeasible,
    OtherFailure,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopologyError {
    /// A pixel referenced by a grid edge was never labeled.
    #[error("pixel ({x}, {y}) has no component label")]
    Unlabeled { x: usize, y: usize },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DownsampleError {
    #[error("raster {w}x{h} is not divisible into {cell_w}x{cell_h} cells")]
    DimensionMismatch {
        w: usize,
        h: usize,
        cell_w: usize,
        cell_h: usize,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Topology(#[from] TopologyError),

    /// The solver proved that no output satisfies the topology constraints.
    #[error("topology constraints are infeasible")]
    Infeasible,

    #[error("solver failed: {0}")]
    Solver(String),

    /// The solver returned an assignment that leaves a big pixel unclaimed.
    #[error("solution leaves big pixel ({x}, {y}) unclaimed")]
    Unclaimed { x: usize, y: usize },
}

impl DownsampleError {
    pub fn status(&self) -> DownsampleStatus {
        match self {
            DownsampleError::Infeasible => DownsampleStatus::Infeasible,
            _ => DownsampleStatus::OtherFailure,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors of the file-level drivers in `pipeline`.
#[cfg(feature = "im-io")]
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Downsample(#[from] DownsampleError),

    #[error("greedy corrector failed after {iterations} iterations")]
    CorrectorFailed { iterations: usize },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_infeasible_maps_to_infeasible_status() {
        assert_eq!(DownsampleError::Infeasible.status(), DownsampleStatus::Infeasible);
        assert_eq!(
            DownsampleError::Solver("boom".to_string()).status(),
            DownsampleStatus::OtherFailure
        );
        let e = DownsampleError::DimensionMismatch {
            w: 9,
            h: 8,
            cell_w: 2,
            cell_h: 2,
        };
        assert_eq!(e.status(), DownsampleStatus::OtherFailure);
        assert_eq!(e.to_string(), "raster 9x8 is not divisible into 2x2 cells");
    }
}
