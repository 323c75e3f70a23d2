use image::imageops;

use crate::canvas::feature::{FeatureVector, BACKGROUND, INK};
use crate::canvas::surface::RawSurface;
use crate::config::{PadConfig, ResampleFilter, FEATURE_SIDE};
use crate::log_debug;

const ENABLE_LOGS: bool = false;

/// Turns whatever the drawing widget produced into the input the classifier
/// was trained on: light ink on a black 28x28 field, binarized.
#[derive(Debug, Clone, Copy)]
pub struct CanvasPreprocessor {
    threshold: u8,
    filter: ResampleFilter,
}

impl CanvasPreprocessor {
    pub fn new(threshold: u8, filter: ResampleFilter) -> Self {
        Self { threshold, filter }
    }

    pub fn from_config(config: &PadConfig) -> Self {
        Self::new(config.binarize_threshold, config.resample_filter)
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Pure function of the surface. A blank surface yields all zeros; deciding
    /// what to do with that is the gate's job.
    pub fn preprocess(&self, surface: &RawSurface) -> FeatureVector {
        let mut plane = surface.luma_plane();

        // Dark-on-white strokes become light-on-dark.
        imageops::invert(&mut plane);

        let small = imageops::resize(
            &plane,
            FEATURE_SIDE,
            FEATURE_SIDE,
            self.filter.filter_type(),
        );

        let values: Vec<u8> = small
            .into_raw()
            .into_iter()
            .map(|v| if v < self.threshold { BACKGROUND } else { INK })
            .collect();

        let vector = FeatureVector::from_binarized(values);
        log_debug!(
            "Preprocessed {}x{} surface: {} lit pixels",
            surface.width(),
            surface.height(),
            vector.lit_pixels()
        );
        vector
    }
}

impl Default for CanvasPreprocessor {
    fn default() -> Self {
        Self::from_config(&PadConfig::default())
    }
}
