// Dashboard configuration: field names and statistical options

use std::fs;
use std::path::Path;

use log::info;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::spatial::{grid_node_count, Extent, MAX_GRID_NODES};

/// Upper bound for histogram and contour threshold counts.
pub const MAX_THRESHOLDS: usize = 1_000;
/// Upper bound for violin sample points per group.
pub const MAX_KDE_SAMPLES: usize = 10_000;

/// Column names the dashboard aggregates over. Defaults match the cars
/// dataset.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FieldNames {
    #[serde(default = "default_mpg")]
    pub mpg: String,
    #[serde(default = "default_cylinders")]
    pub cylinders: String,
    #[serde(default = "default_origin")]
    pub origin: String,
    #[serde(default = "default_horsepower")]
    pub horsepower: String,
    #[serde(default = "default_displacement")]
    pub displacement: String,
    #[serde(default = "default_acceleration")]
    pub acceleration: String,
    #[serde(default = "default_model_year")]
    pub model_year: String,
}

fn default_mpg() -> String { "MPG".to_string() }
fn default_cylinders() -> String { "Cylinders".to_string() }
fn default_origin() -> String { "Origin".to_string() }
fn default_horsepower() -> String { "Horsepower".to_string() }
fn default_displacement() -> String { "Displacement".to_string() }
fn default_acceleration() -> String { "Acceleration".to_string() }
fn default_model_year() -> String { "Model Year".to_string() }

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            mpg: default_mpg(),
            cylinders: default_cylinders(),
            origin: default_origin(),
            horsepower: default_horsepower(),
            displacement: default_displacement(),
            acceleration: default_acceleration(),
            model_year: default_model_year(),
        }
    }
}

impl FieldNames {
    fn named(&self) -> [(&'static str, &str); 7] {
        [
            ("mpg", &self.mpg),
            ("cylinders", &self.cylinders),
            ("origin", &self.origin),
            ("horsepower", &self.horsepower),
            ("displacement", &self.displacement),
            ("acceleration", &self.acceleration),
            ("model_year", &self.model_year),
        ]
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in self.named() {
            if value.trim().is_empty() {
                return Err(ConfigError::EmptyField(name));
            }
        }
        Ok(())
    }
}

/// Plot frame for the spatial aggregations.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Frame {
    #[serde(default = "default_frame_width")]
    pub width: f64,
    #[serde(default = "default_frame_height")]
    pub height: f64,
}

fn default_frame_width() -> f64 { 320.0 }
fn default_frame_height() -> f64 { 220.0 }

impl Default for Frame {
    fn default() -> Self {
        Self {
            width: default_frame_width(),
            height: default_frame_height(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatOptions {
    /// Approximate number of histogram thresholds.
    #[serde(default = "default_histogram_thresholds")]
    pub histogram_thresholds: usize,
    /// Violin bandwidth as a fraction of each group's range.
    #[serde(default = "default_kde_bandwidth_factor")]
    pub kde_bandwidth_factor: f64,
    #[serde(default = "default_kde_samples")]
    pub kde_samples: usize,
    #[serde(default = "default_hex_radius")]
    pub hex_radius: f64,
    #[serde(default = "default_contour_bandwidth")]
    pub contour_bandwidth: f64,
    #[serde(default = "default_contour_cell_size")]
    pub contour_cell_size: f64,
    #[serde(default = "default_contour_thresholds")]
    pub contour_thresholds: usize,
    #[serde(default)]
    pub frame: Frame,
}

fn default_histogram_thresholds() -> usize { 10 }
fn default_kde_bandwidth_factor() -> f64 { 0.2 }
fn default_kde_samples() -> usize { 100 }
fn default_hex_radius() -> f64 { 15.0 }
fn default_contour_bandwidth() -> f64 { 20.0 }
fn default_contour_cell_size() -> f64 { 4.0 }
fn default_contour_thresholds() -> usize { 20 }

impl Default for StatOptions {
    fn default() -> Self {
        Self {
            histogram_thresholds: default_histogram_thresholds(),
            kde_bandwidth_factor: default_kde_bandwidth_factor(),
            kde_samples: default_kde_samples(),
            hex_radius: default_hex_radius(),
            contour_bandwidth: default_contour_bandwidth(),
            contour_cell_size: default_contour_cell_size(),
            contour_thresholds: default_contour_thresholds(),
            frame: Frame::default(),
        }
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidOption {
            name,
            reason: format!("must be a positive finite number, got {}", value),
        })
    }
}

fn count_in_range(name: &'static str, value: usize, max: usize) -> Result<(), ConfigError> {
    if (1..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidOption {
            name,
            reason: format!("must be between 1 and {}, got {}", max, value),
        })
    }
}

impl StatOptions {
    /// Reject options that are nonsensical or would make an aggregation
    /// allocate without bound. Passing this means aggregating cannot fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        count_in_range("histogram_thresholds", self.histogram_thresholds, MAX_THRESHOLDS)?;
        count_in_range("contour_thresholds", self.contour_thresholds, MAX_THRESHOLDS)?;
        count_in_range("kde_samples", self.kde_samples, MAX_KDE_SAMPLES)?;
        positive("kde_bandwidth_factor", self.kde_bandwidth_factor)?;
        positive("hex_radius", self.hex_radius)?;
        positive("contour_bandwidth", self.contour_bandwidth)?;
        positive("contour_cell_size", self.contour_cell_size)?;
        positive("frame.width", self.frame.width)?;
        positive("frame.height", self.frame.height)?;

        let nodes = grid_node_count(
            Extent::sized(self.frame.width, self.frame.height),
            self.contour_cell_size,
        );
        if nodes > MAX_GRID_NODES as f64 {
            return Err(ConfigError::InvalidOption {
                name: "contour_cell_size",
                reason: format!(
                    "a {}x{} frame at cell size {} needs {} grid nodes, limit is {}",
                    self.frame.width, self.frame.height, self.contour_cell_size, nodes, MAX_GRID_NODES
                ),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub fields: FieldNames,
    #[serde(default)]
    pub stats: StatOptions,
}

impl Config {
    /// Parse and validate a JSON config. Missing keys take their defaults.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load from `path` when given, otherwise the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::from_path(p),
            None => {
                info!("Using default config");
                Ok(Self::default())
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.fields.validate()?;
        self.stats.validate()
    }
}
