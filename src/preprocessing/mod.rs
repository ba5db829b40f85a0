pub mod noise;
pub mod segmenter;
pub mod silence;
