use crate::domain::errors::AppError;

/// Decoded mono audio: samples plus the rate they were recorded at.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Waveform { samples, sample_rate }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        samples_to_secs(self.samples.len(), self.sample_rate)
    }
}

/// Half-open sample range `[start, end)` flagged as non-silent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: usize,
    pub end: usize,
}

impl Interval {
    pub fn new(start: usize, end: usize) -> Self {
        Interval { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn duration_secs(&self, sample_rate: u32) -> f64 {
        samples_to_secs(self.len(), sample_rate)
    }
}

/// A contiguous copy of part of a source waveform.
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    /// Index of the first sample in the waveform the clip was cut from.
    pub start: usize,
    pub samples: Vec<f32>,
}

impl Clip {
    pub fn new(start: usize, samples: Vec<f32>) -> Self {
        Clip { start, samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self, sample_rate: u32) -> f64 {
        samples_to_secs(self.samples.len(), sample_rate)
    }
}

/// Result of one segmentation call: clips in increasing start order and the
/// sample rate they share with their source.
#[derive(Debug, Clone, PartialEq)]
pub struct Segmentation {
    pub clips: Vec<Clip>,
    pub sample_rate: u32,
}

impl Segmentation {
    pub fn empty(sample_rate: u32) -> Self {
        Segmentation { clips: Vec::new(), sample_rate }
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn into_waveforms(self) -> Vec<Waveform> {
        let sample_rate = self.sample_rate;
        self.clips
            .into_iter()
            .map(|clip| Waveform::new(clip.samples, sample_rate))
            .collect()
    }
}

/// Inclusive bounds, in seconds, on the duration of emitted clips.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationLimits {
    pub min_seconds: f64,
    pub max_seconds: f64,
}

impl DurationLimits {
    pub fn new(min_seconds: f64, max_seconds: f64) -> Result<Self, AppError> {
        let limits = DurationLimits { min_seconds, max_seconds };
        limits.validate()?;
        Ok(limits)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let valid = self.min_seconds.is_finite()
            && !self.max_seconds.is_nan()
            && self.min_seconds >= 0.0
            && self.min_seconds <= self.max_seconds;
        if valid {
            Ok(())
        } else {
            Err(AppError::InvalidLimits { min: self.min_seconds, max: self.max_seconds })
        }
    }

    pub fn contains(&self, duration_secs: f64) -> bool {
        self.min_seconds <= duration_secs && duration_secs <= self.max_seconds
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SegmentationPolicy {
    /// Cut around non-silent regions, optionally denoising before detection.
    SilenceBased {
        limits: Option<DurationLimits>,
        remove_noise: bool,
    },
    /// Cut into consecutive fixed-length windows; the last one may be short.
    TimeBased { duration_seconds: f64, trim: bool },
}

impl SegmentationPolicy {
    pub fn silence(limits: Option<DurationLimits>, remove_noise: bool) -> Self {
        SegmentationPolicy::SilenceBased { limits, remove_noise }
    }

    pub fn time(duration_seconds: f64, trim: bool) -> Self {
        SegmentationPolicy::TimeBased { duration_seconds, trim }
    }
}

fn samples_to_secs(samples: usize, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }
    samples as f64 / sample_rate as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_reject_inverted_and_negative_bounds() {
        assert!(DurationLimits::new(0.5, 1.5).is_ok());
        assert!(DurationLimits::new(1.0, 1.0).is_ok());
        assert!(matches!(
            DurationLimits::new(2.0, 1.0),
            Err(AppError::InvalidLimits { .. })
        ));
        assert!(matches!(
            DurationLimits::new(-0.1, 1.0),
            Err(AppError::InvalidLimits { .. })
        ));
        assert!(DurationLimits::new(f64::NAN, 1.0).is_err());
    }

    #[test]
    fn limits_are_inclusive() {
        let limits = DurationLimits::new(0.5, 1.5).unwrap();
        assert!(limits.contains(0.5));
        assert!(limits.contains(1.5));
        assert!(!limits.contains(0.499));
        assert!(!limits.contains(1.501));
    }

    #[test]
    fn durations_follow_sample_rate() {
        let waveform = Waveform::new(vec![0.0; 44100], 22050);
        assert_eq!(waveform.duration_secs(), 2.0);
        assert_eq!(Interval::new(100, 1100).duration_secs(1000), 1.0);
        assert_eq!(Clip::new(0, vec![0.0; 500]).duration_secs(1000), 0.5);
    }

    #[test]
    fn policy_helpers_fill_every_field() {
        let limits = DurationLimits::new(0.5, 1.0).unwrap();
        assert_eq!(
            SegmentationPolicy::silence(Some(limits), false),
            SegmentationPolicy::SilenceBased { limits: Some(limits), remove_noise: false }
        );
        assert_eq!(
            SegmentationPolicy::time(2.0, true),
            SegmentationPolicy::TimeBased { duration_seconds: 2.0, trim: true }
        );
    }

    #[test]
    fn segmentation_converts_to_waveforms() {
        let segmentation = Segmentation {
            clips: vec![Clip::new(0, vec![0.1, 0.2]), Clip::new(2, vec![0.3])],
            sample_rate: 8000,
        };
        let waveforms = segmentation.into_waveforms();
        assert_eq!(waveforms.len(), 2);
        assert_eq!(waveforms[1], Waveform::new(vec![0.3], 8000));
    }
}
