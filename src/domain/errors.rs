use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Audio processing error: {0}")]
    Audio(#[from] dasp_rs::AudioError),
    #[error("WAV encoding error: {0}")]
    Wav(#[from] hound::Error),
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),
    #[error("Invalid duration limits [{min}, {max}]: bounds must be non-negative and min <= max")]
    InvalidLimits { min: f64, max: f64 },
    #[error("Invalid segment size: {duration_seconds}s at {sample_rate} Hz is less than one sample")]
    InvalidSegmentSize { duration_seconds: f64, sample_rate: u32 },
    #[error("Invalid sample rate: must be positive")]
    InvalidSampleRate,
    #[error("Invalid noise reduction config: {0}")]
    InvalidNoiseConfig(String),
    #[error("Noise reducer changed waveform length from {expected} to {actual} samples")]
    NoiseLengthMismatch { expected: usize, actual: usize },
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Catalog error: {0}")]
    Catalog(String),
    #[error("Invalid wait between downloads: {0:?} is below the one second minimum")]
    InvalidWait(Duration),
}
