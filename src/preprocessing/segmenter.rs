use crate::domain::config::AppConfig;
use crate::domain::entities::{Clip, DurationLimits, Interval, Segmentation, SegmentationPolicy, Waveform};
use crate::domain::errors::AppError;
use crate::preprocessing::noise::SpectralGate;
use crate::preprocessing::silence::EnergyGate;
use tracing::debug;

/// Finds the non-silent regions of a buffer, in increasing start order.
pub trait SilenceDetector {
    fn detect_non_silent(&self, samples: &[f32]) -> Vec<Interval>;
}

/// Strips leading and trailing near-silence, returning the kept sub-slice.
pub trait SilenceTrimmer {
    fn trim_silence<'a>(&self, samples: &'a [f32]) -> &'a [f32];
}

/// Returns a denoised copy of `samples`, same length and sample rate.
pub trait NoiseReducer {
    fn denoise(&self, samples: &[f32], sample_rate: u32) -> Result<Vec<f32>, AppError>;
}

pub struct Segmenter<D = EnergyGate, T = EnergyGate, N = SpectralGate> {
    detector: D,
    trimmer: T,
    reducer: N,
}

impl Segmenter<EnergyGate, EnergyGate, SpectralGate> {
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        Ok(Segmenter::new(
            EnergyGate::for_detection(&config.silence),
            EnergyGate::for_trimming(&config.trim),
            SpectralGate::new(config.noise.clone())?,
        ))
    }
}

impl<D, T, N> Segmenter<D, T, N>
where
    D: SilenceDetector,
    T: SilenceTrimmer,
    N: NoiseReducer,
{
    pub fn new(detector: D, trimmer: T, reducer: N) -> Self {
        Segmenter { detector, trimmer, reducer }
    }

    pub fn segment(
        &self,
        waveform: &Waveform,
        policy: &SegmentationPolicy,
    ) -> Result<Segmentation, AppError> {
        match *policy {
            SegmentationPolicy::SilenceBased { limits, remove_noise } => {
                self.split_on_silence(waveform, limits, remove_noise)
            }
            SegmentationPolicy::TimeBased { duration_seconds, trim } => {
                self.split_on_time(waveform, duration_seconds, trim)
            }
        }
    }

    /// Cuts `waveform` around its non-silent regions.
    ///
    /// With `remove_noise`, detection runs on a denoised copy, but clips are
    /// always sliced from the original samples. With `limits`, only clips whose
    /// duration lies inside the inclusive bounds are kept.
    pub fn split_on_silence(
        &self,
        waveform: &Waveform,
        limits: Option<DurationLimits>,
        remove_noise: bool,
    ) -> Result<Segmentation, AppError> {
        if let Some(limits) = &limits {
            limits.validate()?;
        }
        let sample_rate = check_sample_rate(waveform.sample_rate)?;
        if waveform.is_empty() {
            return Ok(Segmentation::empty(sample_rate));
        }

        let intervals = if remove_noise {
            let denoised = self.reduce_noise(waveform)?;
            self.detector.detect_non_silent(&denoised.samples)
        } else {
            self.detector.detect_non_silent(&waveform.samples)
        };

        let len = waveform.len();
        let clips: Vec<Clip> = intervals
            .iter()
            .filter_map(|interval| {
                // clamp so a detector overrunning the buffer cannot panic the slice
                let end = interval.end.min(len);
                let start = interval.start.min(end);
                let bounded = Interval::new(start, end);
                if bounded.is_empty() {
                    return None;
                }
                let keep = limits
                    .as_ref()
                    .is_none_or(|limits| limits.contains(bounded.duration_secs(sample_rate)));
                keep.then(|| Clip::new(start, waveform.samples[start..end].to_vec()))
            })
            .collect();

        debug!(
            intervals = intervals.len(),
            kept = clips.len(),
            remove_noise,
            "split on silence"
        );
        Ok(Segmentation { clips, sample_rate })
    }

    /// Cuts `waveform` into consecutive windows of `duration_seconds`.
    ///
    /// Every window holds exactly `round(duration_seconds * sample_rate)`
    /// samples except the last, which keeps whatever remains. With `trim`,
    /// leading and trailing silence is removed first and clip starts are
    /// relative to the trimmed buffer.
    pub fn split_on_time(
        &self,
        waveform: &Waveform,
        duration_seconds: f64,
        trim: bool,
    ) -> Result<Segmentation, AppError> {
        let sample_rate = check_sample_rate(waveform.sample_rate)?;
        let segment_size = segment_size(duration_seconds, sample_rate)?;

        let samples = if trim {
            self.trimmer.trim_silence(&waveform.samples)
        } else {
            &waveform.samples[..]
        };

        let clips: Vec<Clip> = samples
            .chunks(segment_size)
            .enumerate()
            .map(|(i, chunk)| Clip::new(i * segment_size, chunk.to_vec()))
            .collect();

        debug!(
            segment_size,
            trimmed = waveform.len() - samples.len(),
            clips = clips.len(),
            "split on time"
        );
        Ok(Segmentation { clips, sample_rate })
    }

    pub fn reduce_noise(&self, waveform: &Waveform) -> Result<Waveform, AppError> {
        let sample_rate = check_sample_rate(waveform.sample_rate)?;
        let denoised = self.reducer.denoise(&waveform.samples, sample_rate)?;
        if denoised.len() != waveform.len() {
            return Err(AppError::NoiseLengthMismatch {
                expected: waveform.len(),
                actual: denoised.len(),
            });
        }
        Ok(Waveform::new(denoised, sample_rate))
    }
}

fn check_sample_rate(sample_rate: u32) -> Result<u32, AppError> {
    if sample_rate == 0 {
        Err(AppError::InvalidSampleRate)
    } else {
        Ok(sample_rate)
    }
}

fn segment_size(duration_seconds: f64, sample_rate: u32) -> Result<usize, AppError> {
    let size = (duration_seconds * sample_rate as f64).round();
    if !size.is_finite() || size < 1.0 {
        return Err(AppError::InvalidSegmentSize { duration_seconds, sample_rate });
    }
    Ok(size as usize)
}
