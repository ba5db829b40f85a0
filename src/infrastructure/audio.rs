use crate::domain::config::SampleFormat;
use crate::domain::entities::Waveform;
use crate::domain::errors::AppError;
use dasp_rs::audio_io::wav::load;
use dasp_rs::signal_processing::resampling::resample;
use hound::{WavSpec, WavWriter};
use std::path::{Path, PathBuf};
use tracing::debug;

pub trait WaveformSource {
    fn decode(&self, path: &Path) -> Result<Waveform, AppError>;
}

pub trait WaveformSink {
    /// Writes `waveform` to `path`. Returns `false` without touching the file
    /// when it already exists and `overwrite` is not set.
    fn encode(&self, waveform: &Waveform, path: &Path, overwrite: bool) -> Result<bool, AppError>;
}

/// Loads WAV files as mono, optionally resampled to a fixed rate.
#[derive(Debug, Clone, Default)]
pub struct WavFileSource {
    target_sample_rate: Option<u32>,
}

impl WavFileSource {
    pub fn new(target_sample_rate: Option<u32>) -> Self {
        WavFileSource { target_sample_rate }
    }
}

impl WaveformSource for WavFileSource {
    fn decode(&self, path: &Path) -> Result<Waveform, AppError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| AppError::InvalidPath(path.display().to_string()))?;
        let audio_data = load(path_str, None, Some(true), None, None)?;
        let original_rate = audio_data.sample_rate;

        let waveform = match self.target_sample_rate {
            Some(target) if target != original_rate => {
                let resampled = resample(&audio_data.samples, original_rate, target)?;
                Waveform::new(resampled, target)
            }
            _ => Waveform::new(audio_data.samples, original_rate),
        };
        debug!(
            path = %path.display(),
            samples = waveform.len(),
            sample_rate = waveform.sample_rate,
            "decoded"
        );
        Ok(waveform)
    }
}

/// Writes mono WAV files.
#[derive(Debug, Clone, Copy, Default)]
pub struct WavFileSink {
    format: SampleFormat,
}

impl WavFileSink {
    pub fn new(format: SampleFormat) -> Self {
        WavFileSink { format }
    }

    fn spec(&self, sample_rate: u32) -> WavSpec {
        match self.format {
            SampleFormat::Float32 => WavSpec {
                channels: 1,
                sample_rate,
                bits_per_sample: 32,
                sample_format: hound::SampleFormat::Float,
            },
            SampleFormat::Int16 => WavSpec {
                channels: 1,
                sample_rate,
                bits_per_sample: 16,
                sample_format: hound::SampleFormat::Int,
            },
        }
    }
}

impl WaveformSink for WavFileSink {
    fn encode(&self, waveform: &Waveform, path: &Path, overwrite: bool) -> Result<bool, AppError> {
        if waveform.sample_rate == 0 {
            return Err(AppError::InvalidSampleRate);
        }
        if path.is_file() && !overwrite {
            debug!(path = %path.display(), "exists, skipping");
            return Ok(false);
        }

        let mut writer = WavWriter::create(path, self.spec(waveform.sample_rate))?;
        match self.format {
            SampleFormat::Float32 => {
                for &s in &waveform.samples {
                    writer.write_sample(s)?;
                }
            }
            SampleFormat::Int16 => {
                for &s in &waveform.samples {
                    writer.write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
                }
            }
        }
        writer.finalize()?;
        Ok(true)
    }
}

/// `<stem>_<suffix>.wav`, lower-cased, placed in `output_dir` or next to
/// `input` when no directory is given.
pub fn clip_path(input: &Path, suffix: &str, output_dir: Option<&Path>) -> Result<PathBuf, AppError> {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| AppError::InvalidPath(input.display().to_string()))?;
    let file_name = format!("{stem}_{suffix}.wav").to_lowercase();

    let dir = match output_dir {
        Some(dir) => dir,
        None => input.parent().unwrap_or_else(|| Path::new("")),
    };
    Ok(dir.join(file_name))
}
