use crate::domain::errors::AppError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub silence: SilenceConfig,
    pub trim: TrimConfig,
    pub noise: NoiseConfig,
    pub output: OutputConfig,
    pub catalog: CatalogConfig,
}

/// Frame-energy gate used to find non-silent intervals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SilenceConfig {
    pub top_db: f32,
    pub frame_length: usize,
    pub hop_length: usize,
}

impl Default for SilenceConfig {
    fn default() -> Self {
        SilenceConfig { top_db: 60.0, frame_length: 2048, hop_length: 512 }
    }
}

/// Frame-energy gate used to strip leading and trailing silence before
/// time-based splitting. Tuned separately from `SilenceConfig`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrimConfig {
    pub top_db: f32,
    pub frame_length: usize,
    pub hop_length: usize,
}

impl Default for TrimConfig {
    fn default() -> Self {
        TrimConfig { top_db: 60.0, frame_length: 256, hop_length: 64 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    pub n_fft: usize,
    pub hop_length: usize,
    /// Share of quietest frames used to estimate the noise profile.
    pub noise_quantile: f32,
    pub n_std_thresh: f32,
    /// 1.0 silences gated bins entirely, 0.0 leaves them untouched.
    pub prop_decrease: f32,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        NoiseConfig {
            n_fft: 1024,
            hop_length: 256,
            noise_quantile: 0.2,
            n_std_thresh: 1.5,
            prop_decrease: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    #[default]
    Float32,
    Int16,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: SampleFormat,
    pub overwrite: bool,
    /// Resample decoded audio to this rate before processing.
    pub target_sample_rate: Option<u32>,
}

/// Remote recordings catalog queried by `fetch`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub endpoint: String,
    /// Seconds to wait after each download. Must be at least 1.
    pub wait_secs: u64,
    /// Maximum recordings to download per query, 0 for all.
    pub limit: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        CatalogConfig {
            endpoint: "https://www.xeno-canto.org/api/2".to_string(),
            wait_secs: 1,
            limit: 0,
        }
    }
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let config_str = fs::read_to_string(path)?;
        Self::parse(&config_str)
    }

    pub fn parse(config_str: &str) -> Result<Self, AppError> {
        let config: AppConfig = toml::from_str(config_str)?;
        Ok(config)
    }
}
