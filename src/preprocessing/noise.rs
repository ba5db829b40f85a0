use crate::domain::config::NoiseConfig;
use crate::domain::errors::AppError;
use crate::preprocessing::segmenter::NoiseReducer;
use num_complex::Complex;
use rustfft::FftPlanner;

/// Stationary spectral gate.
///
/// A per-bin noise profile (mean and standard deviation of the magnitude) is
/// estimated from the quietest frames of the signal itself. Bins that do not
/// rise above `mean + n_std_thresh * std` are attenuated by `prop_decrease`,
/// then the signal is rebuilt by weighted overlap-add.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralGate {
    config: NoiseConfig,
}

impl SpectralGate {
    pub fn new(config: NoiseConfig) -> Result<Self, AppError> {
        if config.n_fft < 2 {
            return Err(AppError::InvalidNoiseConfig(format!(
                "n_fft must be at least 2, got {}",
                config.n_fft
            )));
        }
        // every sample needs a frame where the Hann window is non-zero
        if config.hop_length == 0 || config.hop_length > config.n_fft / 2 {
            return Err(AppError::InvalidNoiseConfig(format!(
                "hop_length must be in 1..={}, got {}",
                config.n_fft / 2,
                config.hop_length
            )));
        }
        if !(config.noise_quantile > 0.0 && config.noise_quantile <= 1.0) {
            return Err(AppError::InvalidNoiseConfig(format!(
                "noise_quantile must be in (0, 1], got {}",
                config.noise_quantile
            )));
        }
        if !(0.0..=1.0).contains(&config.prop_decrease) {
            return Err(AppError::InvalidNoiseConfig(format!(
                "prop_decrease must be in [0, 1], got {}",
                config.prop_decrease
            )));
        }
        if !config.n_std_thresh.is_finite() {
            return Err(AppError::InvalidNoiseConfig("n_std_thresh must be finite".into()));
        }
        Ok(SpectralGate { config })
    }

    /// Non-redundant bins of a real signal's spectrum.
    fn n_bins(&self) -> usize {
        self.config.n_fft / 2 + 1
    }

    fn hann(n_fft: usize) -> Vec<f32> {
        (0..n_fft)
            .map(|i| 0.5 * (1.0 - ((2.0 * std::f32::consts::PI * i as f32) / n_fft as f32).cos()))
            .collect()
    }

    /// Half spectra (`n_fft / 2 + 1` bins) of the centred, windowed frames.
    fn stft(&self, samples: &[f32], window: &[f32]) -> Vec<Vec<Complex<f32>>> {
        let n_fft = self.config.n_fft;
        let hop = self.config.hop_length;
        let n_bins = self.n_bins();
        let n_frames = samples.len().div_ceil(hop) + 1;

        let mut padded = vec![0.0f32; (n_frames - 1) * hop + n_fft];
        padded[n_fft / 2..n_fft / 2 + samples.len()].copy_from_slice(samples);

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(n_fft);
        let mut buffer = vec![Complex::new(0.0f32, 0.0); n_fft];
        (0..n_frames)
            .map(|t| {
                let offset = t * hop;
                for ((b, &s), &w) in buffer.iter_mut().zip(&padded[offset..offset + n_fft]).zip(window) {
                    *b = Complex::new(s * w, 0.0);
                }
                fft.process(&mut buffer);
                buffer[..n_bins].to_vec()
            })
            .collect()
    }

    fn istft(&self, frames: &[Vec<Complex<f32>>], window: &[f32], len: usize) -> Vec<f32> {
        let n_fft = self.config.n_fft;
        let hop = self.config.hop_length;
        let n_bins = self.n_bins();
        let padded_len = frames.len().saturating_sub(1) * hop + n_fft;

        let mut planner = FftPlanner::new();
        let ifft = planner.plan_fft_inverse(n_fft);
        let mut buffer = vec![Complex::new(0.0f32, 0.0); n_fft];
        let mut output = vec![0.0f32; padded_len];
        let mut weights = vec![0.0f32; padded_len];
        for (t, half) in frames.iter().enumerate() {
            buffer[..n_bins].copy_from_slice(half);
            for k in n_bins..n_fft {
                buffer[k] = half[n_fft - k].conj();
            }
            ifft.process(&mut buffer);

            let offset = t * hop;
            for (i, c) in buffer.iter().enumerate() {
                output[offset + i] += c.re / n_fft as f32 * window[i];
                weights[offset + i] += window[i] * window[i];
            }
        }

        output
            .iter()
            .zip(&weights)
            .skip(n_fft / 2)
            .take(len)
            .map(|(&o, &w)| if w > 1e-8 { o / w } else { 0.0 })
            .collect()
    }

    /// Per-bin `mean + n_std * std` of the magnitude over the quietest frames.
    fn thresholds(&self, frames: &[Vec<Complex<f32>>]) -> Vec<f32> {
        let energies: Vec<f32> = frames
            .iter()
            .map(|frame| frame.iter().map(|c| c.norm_sqr()).sum())
            .collect();
        let mut order: Vec<usize> = (0..frames.len()).collect();
        order.sort_by(|&a, &b| energies[a].total_cmp(&energies[b]));

        let take = ((frames.len() as f32 * self.config.noise_quantile).ceil() as usize)
            .clamp(1, frames.len());
        let quiet = &order[..take];

        (0..self.n_bins())
            .map(|bin| {
                let mean = quiet.iter().map(|&t| frames[t][bin].norm()).sum::<f32>() / take as f32;
                let var = quiet
                    .iter()
                    .map(|&t| (frames[t][bin].norm() - mean).powi(2))
                    .sum::<f32>()
                    / take as f32;
                mean + self.config.n_std_thresh * var.sqrt()
            })
            .collect()
    }
}

impl NoiseReducer for SpectralGate {
    fn denoise(&self, samples: &[f32], sample_rate: u32) -> Result<Vec<f32>, AppError> {
        if sample_rate == 0 {
            return Err(AppError::InvalidSampleRate);
        }
        if samples.is_empty() {
            return Ok(Vec::new());
        }

        let window = Self::hann(self.config.n_fft);
        let mut frames = self.stft(samples, &window);
        let thresholds = self.thresholds(&frames);
        let floor_gain = 1.0 - self.config.prop_decrease;

        for frame in frames.iter_mut() {
            for (bin, &thresh) in frame.iter_mut().zip(&thresholds) {
                if bin.norm() <= thresh {
                    *bin = *bin * floor_gain;
                }
            }
        }

        Ok(self.istft(&frames, &window, samples.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const SR: u32 = 16000;

    fn energy(samples: &[f32]) -> f32 {
        samples.iter().map(|s| s * s).sum()
    }

    fn tone(len: usize, freq: f32) -> Vec<f32> {
        (0..len)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * freq * i as f32 / SR as f32).sin())
            .collect()
    }

    #[test]
    fn preserves_length_and_silence() {
        let gate = SpectralGate::new(NoiseConfig::default()).unwrap();
        for len in [0, 1, 100, 1023, 1024, 5000] {
            let out = gate.denoise(&vec![0.0; len], SR).unwrap();
            assert_eq!(out.len(), len);
            assert!(out.iter().all(|&s| s == 0.0));
        }
    }

    #[test]
    fn passes_signal_over_silent_background() {
        let gate = SpectralGate::new(NoiseConfig::default()).unwrap();
        let mut y = vec![0.0f32; 8000];
        y.extend(tone(8000, 440.0));
        y.extend(vec![0.0f32; 16000]);

        let out = gate.denoise(&y, SR).unwrap();
        assert_eq!(out.len(), y.len());
        for (a, b) in out.iter().zip(&y) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn attenuates_stationary_noise() {
        let gate = SpectralGate::new(NoiseConfig::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let noise: Vec<f32> = (0..SR as usize * 2)
            .map(|_| rng.random_range(-0.05..0.05))
            .collect();

        let out = gate.denoise(&noise, SR).unwrap();
        assert_eq!(out.len(), noise.len());
        assert!(energy(&out) < 0.6 * energy(&noise));
    }

    #[test]
    fn keeps_tone_above_noise_floor() {
        let gate = SpectralGate::new(NoiseConfig::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let mut y: Vec<f32> = (0..SR as usize * 2)
            .map(|_| rng.random_range(-0.01..0.01))
            .collect();
        let burst = tone(SR as usize / 2, 1000.0);
        for (s, t) in y[8000..16000].iter_mut().zip(&burst) {
            *s += t;
        }

        let out = gate.denoise(&y, SR).unwrap();
        let tone_in = energy(&burst);
        let tone_out = energy(&out[8000..16000]);
        assert!(tone_out > 0.8 * tone_in);
        assert!(energy(&out[20000..]) < 0.6 * energy(&y[20000..]));
    }

    #[test]
    fn zero_prop_decrease_is_identity() {
        let config = NoiseConfig { prop_decrease: 0.0, ..NoiseConfig::default() };
        let gate = SpectralGate::new(config).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let y: Vec<f32> = (0..3000).map(|_| rng.random_range(-0.2..0.2)).collect();

        let out = gate.denoise(&y, SR).unwrap();
        for (a, b) in out.iter().zip(&y) {
            assert!((a - b).abs() < 1e-4);
        }
    }

    #[test]
    fn rejects_invalid_config() {
        let bad = [
            NoiseConfig { n_fft: 1, ..NoiseConfig::default() },
            NoiseConfig { hop_length: 0, ..NoiseConfig::default() },
            NoiseConfig { hop_length: 2048, ..NoiseConfig::default() },
            NoiseConfig { hop_length: 1024, ..NoiseConfig::default() },
            NoiseConfig { hop_length: 513, ..NoiseConfig::default() },
            NoiseConfig { noise_quantile: 0.0, ..NoiseConfig::default() },
            NoiseConfig { prop_decrease: 1.5, ..NoiseConfig::default() },
        ];
        for config in bad {
            assert!(matches!(SpectralGate::new(config), Err(AppError::InvalidNoiseConfig(_))));
        }
    }

    #[test]
    fn rejects_zero_sample_rate() {
        let gate = SpectralGate::new(NoiseConfig::default()).unwrap();
        assert!(matches!(gate.denoise(&[0.1; 10], 0), Err(AppError::InvalidSampleRate)));
    }

    #[test]
    fn widest_hop_still_reconstructs_every_sample() {
        let config = NoiseConfig { hop_length: 512, prop_decrease: 0.0, ..NoiseConfig::default() };
        let gate = SpectralGate::new(config).unwrap();
        let y = vec![0.3f32; 4096];

        let out = gate.denoise(&y, SR).unwrap();
        assert_eq!(out.len(), y.len());
        for (i, s) in out.iter().enumerate() {
            assert!((s - 0.3).abs() < 1e-4, "sample {i} is {s}");
        }
    }

    #[test]
    fn odd_frame_size_round_trips() {
        let config = NoiseConfig { n_fft: 255, hop_length: 64, prop_decrease: 0.0, ..NoiseConfig::default() };
        let gate = SpectralGate::new(config).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let y: Vec<f32> = (0..2000).map(|_| rng.random_range(-0.5..0.5)).collect();

        let out = gate.denoise(&y, SR).unwrap();
        for (a, b) in out.iter().zip(&y) {
            assert!((a - b).abs() < 1e-4);
        }
    }

    #[test]
    fn spectrum_keeps_only_non_redundant_bins() {
        let gate = SpectralGate::new(NoiseConfig::default()).unwrap();
        let window = SpectralGate::hann(1024);
        let frames = gate.stft(&tone(4000, 440.0), &window);
        assert_eq!(frames.len(), 4000usize.div_ceil(256) + 1);
        assert!(frames.iter().all(|frame| frame.len() == 513));
    }
}
