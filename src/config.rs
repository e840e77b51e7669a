use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How the ILP keeps the topology.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scheme {
    /// Every land/water boundary stays a single closed loop of vertex configurations.
    #[default]
    BoundaryLoops,
    /// Every component keeps its Euler characteristic; ocean water is free.
    Euler,
}

/// Settings of the ILP downsampler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownsampleConfig {
    /// Big pixel size in original pixels.
    pub cell_w: usize,
    pub cell_h: usize,
    /// Score weights of a land and a water pixel.
    pub land_weight: i64,
    pub water_weight: i64,
    /// Added to the `cell_w / 4` candidate radius.
    pub neighborhood_offset: i64,
    /// Forbid distinct same-type components from touching.
    pub separation_constraints: bool,
    pub time_limit_secs: f64,
    /// Scales a boundary's reduced length into its potential bound.
    pub big_num_multiplier: f64,
    pub big_num_floor: i64,
    pub scheme: Scheme,
}

impl Default for DownsampleConfig {
    fn default() -> Self {
        Self {
            cell_w: 4,
            cell_h: 4,
            land_weight: 2,
            water_weight: 1,
            neighborhood_offset: 0,
            separation_constraints: true,
            time_limit_secs: 60.0,
            big_num_multiplier: 1.5,
            big_num_floor: 10,
            scheme: Scheme::BoundaryLoops,
        }
    }
}

impl DownsampleConfig {
    pub fn with_cells(cell_w: usize, cell_h: usize) -> Self {
        Self {
            cell_w,
            cell_h,
            ..Self::default()
        }
    }

    /// Euclidean radius (in original pixels) of the candidate neighborhood.
    pub fn neighborhood_radius(&self) -> f64 {
        ((self.cell_w / 4) as i64 + self.neighborhood_offset).max(0) as f64
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cell_w == 0 || self.cell_h == 0 {
            return Err(ConfigError::Invalid("cell size must be positive".to_string()));
        }
        if self.land_weight < 0 || self.water_weight < 0 {
            return Err(ConfigError::Invalid("pixel weights must not be negative".to_string()));
        }
        if !(self.time_limit_secs > 0.0) {
            return Err(ConfigError::Invalid("time_limit_secs must be positive".to_string()));
        }
        if !(self.big_num_multiplier > 0.0) || self.big_num_floor < 1 {
            return Err(ConfigError::Invalid("big-num bounds must be positive".to_string()));
        }
        Ok(())
    }
}

/// Settings of the greedy digitization corrector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectorConfig {
    pub cell_size: usize,
    /// Sigma flips allowed per big pixel before giving up.
    pub max_sigma_flips: usize,
}

impl Default for CorrectorConfig {
    fn default() -> Self {
        Self {
            cell_size: 4,
            max_sigma_flips: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IoConfig {
    /// R, G and B must all reach this value for a pixel to be land.
    pub png_threshold: u8,
    pub save_components: bool,
    pub calculate_errors: bool,
    /// Retry the ILP on shifted copies of the input and keep the best IoU.
    pub alternative_offsets: bool,
    /// Fill the smallest enclosed lake of the input before downsampling.
    pub fill_smallest_lake: bool,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            png_threshold: 26,
            save_components: false,
            calculate_errors: false,
            alternative_offsets: false,
            fill_smallest_lake: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub downsample: DownsampleConfig,
    pub corrector: CorrectorConfig,
    pub io: IoConfig,
}

impl Config {
    pub fn from_json(json_text: &str) -> Result<Config, ConfigError> {
        let config: Config = serde_json::from_str(json_text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.downsample.validate()?;
        if self.corrector.cell_size == 0 {
            return Err(ConfigError::Invalid("corrector cell_size must be positive".to_string()));
        }
        Ok(())
    }
}
