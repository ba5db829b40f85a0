//! Building blocks for a bird-sound dataset: cut recordings into clips around
//! their non-silent regions or into fixed time windows, with an optional
//! spectral-gate noise reduction ahead of silence detection. Source
//! recordings can be pulled from the xeno-canto catalog.

pub mod domain;
pub mod infrastructure;
pub mod preprocessing;

pub use domain::config::AppConfig;
pub use domain::entities::{Clip, DurationLimits, Interval, Segmentation, SegmentationPolicy, Waveform};
pub use domain::errors::AppError;
pub use preprocessing::segmenter::{NoiseReducer, Segmenter, SilenceDetector, SilenceTrimmer};
