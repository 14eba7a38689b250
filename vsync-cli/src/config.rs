//! Configuration loading and parsing
//!
//! Every setting has a default, so a config file only needs the keys it
//! changes. Command-line flags override file values.

use anyhow::{Context, Result};
use c1_log::MergeConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration (loaded from a TOML file)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub merge: MergeSection,
    #[serde(default)]
    pub footage: FootageConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MergeSection {
    #[serde(flatten)]
    pub library: MergeConfig,
    #[serde(default = "default_merged_output")]
    pub merged_output: PathBuf,
    #[serde(default = "default_mapping_output")]
    pub mapping_output: PathBuf,
}

impl Default for MergeSection {
    fn default() -> Self {
        Self {
            library: MergeConfig::default(),
            merged_output: default_merged_output(),
            mapping_output: default_mapping_output(),
        }
    }
}

fn default_merged_output() -> PathBuf {
    PathBuf::from("output.c1")
}

fn default_mapping_output() -> PathBuf {
    PathBuf::from("output mapping.txt")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FootageConfig {
    /// Encoder executable (name on PATH or a path)
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,
    /// Prober executable (name on PATH or a path)
    #[serde(default = "default_ffprobe")]
    pub ffprobe: String,
    /// Frame rate DVR `.dav` streams are read at
    #[serde(default = "default_source_frame_rate")]
    pub source_frame_rate: u32,
    /// x264 quality used when resampling frame rates
    #[serde(default = "default_crf")]
    pub crf: u32,
    /// Frame rate used when `--fps` is given without a value
    #[serde(default = "default_fps")]
    pub default_fps: f64,
}

impl Default for FootageConfig {
    fn default() -> Self {
        Self {
            ffmpeg: default_ffmpeg(),
            ffprobe: default_ffprobe(),
            source_frame_rate: default_source_frame_rate(),
            crf: default_crf(),
            default_fps: default_fps(),
        }
    }
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe() -> String {
    "ffprobe".to_string()
}

fn default_source_frame_rate() -> u32 {
    30
}

fn default_crf() -> u32 {
    23
}

fn default_fps() -> f64 {
    29.97
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    if config.footage.default_fps <= 0.0 {
        anyhow::bail!("footage.default_fps must be positive in {:?}", path);
    }

    Ok(config)
}
