use crate::domain::entities::{SegmentationPolicy, Waveform};
use crate::domain::errors::AppError;
use crate::infrastructure::audio::{WaveformSink, WaveformSource, clip_path};
use crate::preprocessing::noise::SpectralGate;
use crate::preprocessing::segmenter::{NoiseReducer, Segmenter, SilenceDetector, SilenceTrimmer};
use crate::preprocessing::silence::EnergyGate;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub clips: usize,
    pub written: usize,
    pub skipped: usize,
}

impl ExportSummary {
    pub fn merge(&mut self, other: ExportSummary) {
        self.clips += other.clips;
        self.written += other.written;
        self.skipped += other.skipped;
    }
}

/// Decodes recordings, segments them and writes every clip next to the
/// source file or into `output_dir`.
pub struct ClipExporter<S, W, D = EnergyGate, T = EnergyGate, N = SpectralGate> {
    source: S,
    sink: W,
    segmenter: Segmenter<D, T, N>,
    output_dir: Option<PathBuf>,
    overwrite: bool,
}

impl<S, W, D, T, N> ClipExporter<S, W, D, T, N>
where
    S: WaveformSource,
    W: WaveformSink,
    D: SilenceDetector,
    T: SilenceTrimmer,
    N: NoiseReducer,
{
    pub fn new(source: S, sink: W, segmenter: Segmenter<D, T, N>) -> Self {
        ClipExporter { source, sink, segmenter, output_dir: None, overwrite: false }
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(output_dir.into());
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn setup_output_dir(&self) -> Result<(), AppError> {
        if let Some(dir) = &self.output_dir {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Writes each clip of `path` as `<stem>_<index>.wav`.
    pub fn process_file(
        &self,
        path: &Path,
        policy: &SegmentationPolicy,
    ) -> Result<ExportSummary, AppError> {
        let waveform = self.source.decode(path)?;
        let segmentation = self.segmenter.segment(&waveform, policy)?;

        // resolve every target before writing so a bad path fails the file as a whole
        let targets = (0..segmentation.len())
            .map(|i| clip_path(path, &i.to_string(), self.output_dir.as_deref()))
            .collect::<Result<Vec<_>, _>>()?;

        let mut summary = ExportSummary { clips: segmentation.len(), ..Default::default() };
        for (clip, target) in segmentation.into_waveforms().iter().zip(&targets) {
            if self.sink.encode(clip, target, self.overwrite)? {
                summary.written += 1;
            } else {
                summary.skipped += 1;
            }
        }

        info!(
            path = %path.display(),
            seconds = waveform.duration_secs(),
            clips = summary.clips,
            written = summary.written,
            skipped = summary.skipped,
            "segmented"
        );
        Ok(summary)
    }

    /// Writes a denoised copy of `path` as `<stem>_noisered.wav`. Skips the
    /// work entirely when the target exists and overwrite is off.
    pub fn denoise_file(&self, path: &Path) -> Result<bool, AppError> {
        let target = clip_path(path, "noisered", self.output_dir.as_deref())?;
        if target.is_file() && !self.overwrite {
            info!(path = %target.display(), "denoised file exists, skipping");
            return Ok(false);
        }

        let waveform = self.source.decode(path)?;
        let denoised: Waveform = self.segmenter.reduce_noise(&waveform)?;
        let written = self.sink.encode(&denoised, &target, self.overwrite)?;
        info!(path = %target.display(), samples = denoised.len(), "denoised");
        Ok(written)
    }
}
