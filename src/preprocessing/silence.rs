use crate::domain::config::{SilenceConfig, TrimConfig};
use crate::domain::entities::Interval;
use crate::preprocessing::segmenter::{SilenceDetector, SilenceTrimmer};

/// Power floor below which a frame counts as digital silence.
const AMIN: f64 = 1e-10;

/// Frame-energy silence gate.
///
/// The signal is cut into centred frames of `frame_length` samples, `hop_length`
/// apart (zero padded by half a frame on both ends). A frame is non-silent when
/// its mean-square power lies within `top_db` decibels of the loudest frame.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyGate {
    top_db: f32,
    frame_length: usize,
    hop_length: usize,
}

impl EnergyGate {
    pub fn new(top_db: f32, frame_length: usize, hop_length: usize) -> Self {
        EnergyGate {
            top_db,
            frame_length: frame_length.max(1),
            hop_length: hop_length.max(1),
        }
    }

    pub fn for_detection(config: &SilenceConfig) -> Self {
        Self::new(config.top_db, config.frame_length, config.hop_length)
    }

    pub fn for_trimming(config: &TrimConfig) -> Self {
        Self::new(config.top_db, config.frame_length, config.hop_length)
    }

    fn frame_powers(&self, samples: &[f32]) -> Vec<f64> {
        let mut prefix = Vec::with_capacity(samples.len() + 1);
        prefix.push(0.0f64);
        let mut acc = 0.0f64;
        for &s in samples {
            acc += (s as f64) * (s as f64);
            prefix.push(acc);
        }

        let half = self.frame_length / 2;
        let n_frames = 1 + samples.len() / self.hop_length;
        (0..n_frames)
            .map(|t| {
                let center = t * self.hop_length;
                let lo = center.saturating_sub(half).min(samples.len());
                let hi = (center + self.frame_length - half).min(samples.len());
                (prefix[hi] - prefix[lo]).max(0.0) / self.frame_length as f64
            })
            .collect()
    }

    /// Per-frame non-silence flags, or `None` when nothing rises above the
    /// power floor.
    fn non_silent_frames(&self, samples: &[f32]) -> Option<Vec<bool>> {
        if samples.is_empty() {
            return None;
        }
        let powers = self.frame_powers(samples);
        let reference = powers.iter().copied().fold(0.0f64, f64::max);
        if reference < AMIN {
            return None;
        }
        let ref_db = 10.0 * reference.log10();
        let threshold = -(self.top_db as f64);
        Some(
            powers
                .iter()
                .map(|&p| 10.0 * p.max(AMIN).log10() - ref_db > threshold)
                .collect(),
        )
    }

    fn frame_to_sample(&self, frame: usize, len: usize) -> usize {
        (frame * self.hop_length).min(len)
    }
}

impl SilenceDetector for EnergyGate {
    fn detect_non_silent(&self, samples: &[f32]) -> Vec<Interval> {
        let Some(flags) = self.non_silent_frames(samples) else {
            return Vec::new();
        };

        let len = samples.len();
        let mut intervals = Vec::new();
        let mut run_start = None;
        for (frame, &loud) in flags.iter().enumerate() {
            match (loud, run_start) {
                (true, None) => run_start = Some(frame),
                (false, Some(first)) => {
                    intervals.push(Interval::new(
                        self.frame_to_sample(first, len),
                        self.frame_to_sample(frame, len),
                    ));
                    run_start = None;
                }
                _ => {}
            }
        }
        if let Some(first) = run_start {
            intervals.push(Interval::new(
                self.frame_to_sample(first, len),
                self.frame_to_sample(flags.len(), len),
            ));
        }

        intervals.retain(|interval| !interval.is_empty());
        intervals
    }
}

impl SilenceTrimmer for EnergyGate {
    fn trim_silence<'a>(&self, samples: &'a [f32]) -> &'a [f32] {
        let Some(flags) = self.non_silent_frames(samples) else {
            return &samples[..0];
        };
        let first = flags.iter().position(|&loud| loud);
        let last = flags.iter().rposition(|&loud| loud);
        match (first, last) {
            (Some(first), Some(last)) => {
                let start = self.frame_to_sample(first, samples.len());
                let end = self.frame_to_sample(last + 1, samples.len());
                &samples[start..end.max(start)]
            }
            _ => &samples[..0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> EnergyGate {
        EnergyGate::new(40.0, 4, 2)
    }

    #[test]
    fn detects_separate_regions() {
        let mut y = vec![0.0f32; 20];
        y.extend(vec![0.8f32; 20]);
        y.extend(vec![0.0f32; 20]);
        y.extend(vec![0.6f32; 10]);
        y.extend(vec![0.0f32; 10]);

        let intervals = gate().detect_non_silent(&y);
        assert_eq!(intervals, vec![Interval::new(20, 42), Interval::new(60, 72)]);
    }

    #[test]
    fn loud_edges_reach_the_buffer_bounds() {
        let mut y = vec![0.5f32; 10];
        y.extend(vec![0.0f32; 20]);
        y.extend(vec![0.5f32; 10]);

        let intervals = gate().detect_non_silent(&y);
        assert_eq!(intervals.first().unwrap().start, 0);
        assert_eq!(intervals.last().unwrap().end, y.len());
    }

    #[test]
    fn digital_silence_has_no_intervals() {
        assert!(gate().detect_non_silent(&[0.0; 100]).is_empty());
        assert!(gate().detect_non_silent(&[]).is_empty());
    }

    #[test]
    fn quiet_regions_fall_under_top_db() {
        let mut y = vec![1e-4f32; 30];
        y.extend(vec![0.9f32; 30]);
        y.extend(vec![1e-4f32; 30]);

        let intervals = gate().detect_non_silent(&y);
        assert_eq!(intervals, vec![Interval::new(30, 62)]);
    }

    #[test]
    fn trim_removes_leading_and_trailing_silence() {
        let mut y = vec![0.0f32; 100];
        y.extend(vec![0.5f32; 50]);
        y.extend(vec![0.0f32; 25]);

        let trimmed = gate().trim_silence(&y);
        assert_eq!(trimmed.len(), 52);
        assert!(trimmed.iter().filter(|&&s| s != 0.0).count() == 50);
    }

    #[test]
    fn trim_of_silence_is_empty() {
        assert!(gate().trim_silence(&[0.0; 64]).is_empty());
        assert!(gate().trim_silence(&[]).is_empty());
    }

    #[test]
    fn trim_keeps_fully_loud_input() {
        let y = vec![0.3f32; 64];
        assert_eq!(gate().trim_silence(&y).len(), 64);
    }
}
