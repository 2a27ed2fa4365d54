//! Converter configuration.
//!
//! Handles loading, validating, and merging `recast.toml`. User values are
//! layered over stock defaults, so a config file only needs the keys it
//! wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [limits]
//! max_file_size = 10485760  # Upload ceiling in bytes (10 MiB)
//!
//! [defaults]
//! format = "jpeg"           # jpeg | png | webp | bmp | gif
//! quality = 92              # JPEG/WebP quality (1-100)
//! min_quality = 1           # Lowest quality the CLI will pass through
//!
//! [resize]
//! filter = "lanczos3"       # nearest | triangle | catmull-rom | gaussian | lanczos3
//!
//! [naming]
//! embed_ratio = true        # photo-42pct-reduced.webp instead of photo.webp
//!
//! [processing]
//! max_threads = 4           # Workers for `compare` (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{ConversionParams, OutputFormat, Quality};
use crate::source::DEFAULT_MAX_FILE_SIZE;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Converter configuration loaded from `recast.toml`.
///
/// All fields have sensible defaults. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecastConfig {
    /// Intake limits.
    pub limits: LimitsConfig,
    /// Starting conversion parameters.
    pub defaults: DefaultsConfig,
    /// Resampling used when resize is on.
    pub resize: ResizeConfig,
    /// Artifact naming.
    pub naming: NamingConfig,
    /// Parallelism for multi-format comparisons.
    pub processing: ProcessingConfig,
}

impl RecastConfig {
    /// Reject values outside the ranges the converter can honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_file_size == 0 {
            return Err(ConfigError::Validation(
                "limits.max_file_size must be non-zero".into(),
            ));
        }
        if !(1..=100).contains(&self.defaults.quality) {
            return Err(ConfigError::Validation(
                "defaults.quality must be 1-100".into(),
            ));
        }
        if !(1..=100).contains(&self.defaults.min_quality) {
            return Err(ConfigError::Validation(
                "defaults.min_quality must be 1-100".into(),
            ));
        }
        if self.defaults.min_quality > self.defaults.quality {
            return Err(ConfigError::Validation(
                "defaults.min_quality must not exceed defaults.quality".into(),
            ));
        }
        Ok(())
    }

    /// Conversion parameters a fresh session starts from.
    pub fn default_params(&self) -> ConversionParams {
        ConversionParams {
            format: self.defaults.format,
            quality: self.quality(self.defaults.quality),
            ..ConversionParams::default()
        }
    }

    /// Clamp a requested quality to `[min_quality, 100]`.
    pub fn quality(&self, requested: u32) -> Quality {
        Quality::with_floor(requested, self.defaults.min_quality)
    }
}

/// Intake limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Largest accepted source file, in bytes.
    pub max_file_size: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

/// Starting conversion parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DefaultsConfig {
    pub format: OutputFormat,
    pub quality: u32,
    pub min_quality: u32,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Jpeg,
            quality: Quality::default().value(),
            min_quality: 1,
        }
    }
}

/// Resampling filter names as they appear in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResizeFilter {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    #[default]
    Lanczos3,
}

impl ResizeFilter {
    pub fn filter_type(self) -> FilterType {
        match self {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResizeConfig {
    pub filter: ResizeFilter,
}

/// Artifact naming.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NamingConfig {
    /// Embed the compression ratio in the suggested file name.
    pub embed_ratio: bool,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self { embed_ratio: true }
    }
}

/// Multi-format comparison parallelism.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Parallel encode workers. `None` uses every core; larger values are
    /// clamped to the core count.
    pub max_threads: Option<usize>,
}

/// Worker count for `compare`: all cores by default, otherwise the
/// configured number clamped to `1..=cores`.
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_threads
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Stock defaults as a TOML table: the bottom layer of every load.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(RecastConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config does not serialize: {e}")))
}

/// Layer `overlay` over `base`. Tables merge per key; any other overlay
/// value wins outright. Keys only present in `base` survive.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read `path` as an untyped TOML value, or `None` when there is no file.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Apply the user layer (if any), then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<RecastConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: RecastConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, falling back to stock defaults when the file
/// does not exist.
pub fn load_config(path: &Path) -> Result<RecastConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `recast.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# recast configuration
# ====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# recast reads ./recast.toml unless --config points elsewhere.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Intake limits
# ---------------------------------------------------------------------------
[limits]
# Largest accepted source file in bytes (10 MiB).
max_file_size = 10485760

# ---------------------------------------------------------------------------
# Starting parameters
# ---------------------------------------------------------------------------
[defaults]
# Output format: jpeg, png, webp, bmp or gif.
format = "jpeg"

# JPEG/WebP quality (1 = smallest, 100 = best). PNG, BMP and GIF ignore it.
quality = 92

# Requested qualities below this are raised to it.
min_quality = 1

# ---------------------------------------------------------------------------
# Resizing
# ---------------------------------------------------------------------------
[resize]
# Resampling filter: nearest, triangle, catmull-rom, gaussian or lanczos3.
filter = "lanczos3"

# ---------------------------------------------------------------------------
# Output naming
# ---------------------------------------------------------------------------
[naming]
# Embed the compression ratio: photo-42pct-reduced.webp instead of photo.webp.
embed_ratio = true

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Parallel encode workers for `recast compare`.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_threads = 4
"##
}
