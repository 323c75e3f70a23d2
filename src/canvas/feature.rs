use image::{GrayImage, ImageBuffer};
use serde::{Deserialize, Serialize};

use crate::config::{FEATURE_LEN, FEATURE_SIDE};
use crate::error::DigitError;

pub const INK: u8 = 255;
pub const BACKGROUND: u8 = 0;

/// A 28x28 binarized drawing, flattened row-major: exactly 784 bytes, each
/// either 0 (background) or 255 (ink).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct FeatureVector(Vec<u8>);

impl FeatureVector {
    pub fn zeros() -> Self {
        Self(vec![BACKGROUND; FEATURE_LEN])
    }

    /// Builds a vector from bytes already thresholded by the preprocessor.
    pub(crate) fn from_binarized(values: Vec<u8>) -> Self {
        debug_assert_eq!(values.len(), FEATURE_LEN);
        debug_assert!(values.iter().all(|&v| v == BACKGROUND || v == INK));
        Self(values)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Sum of all pixel values; how much was drawn.
    pub fn ink_mass(&self) -> u64 {
        self.0.iter().map(|&v| u64::from(v)).sum()
    }

    pub fn lit_pixels(&self) -> usize {
        self.0.iter().filter(|&&v| v == INK).count()
    }

    pub fn is_blank(&self) -> bool {
        self.lit_pixels() == 0
    }

    pub fn to_image(&self) -> GrayImage {
        ImageBuffer::from_raw(FEATURE_SIDE, FEATURE_SIDE, self.0.clone())
            .unwrap_or_else(|| GrayImage::new(FEATURE_SIDE, FEATURE_SIDE))
    }
}

impl TryFrom<Vec<u8>> for FeatureVector {
    type Error = DigitError;

    fn try_from(values: Vec<u8>) -> Result<Self, Self::Error> {
        if values.len() != FEATURE_LEN {
            return Err(DigitError::InferenceFailure(format!(
                "feature vector has {} values, expected {FEATURE_LEN}",
                values.len()
            )));
        }
        if let Some(bad) = values.iter().find(|&&v| v != BACKGROUND && v != INK) {
            return Err(DigitError::InferenceFailure(format!(
                "feature vector holds {bad}, only {BACKGROUND} and {INK} are allowed"
            )));
        }
        Ok(Self(values))
    }
}

impl From<FeatureVector> for Vec<u8> {
    fn from(vector: FeatureVector) -> Self {
        vector.0
    }
}

impl AsRef<[u8]> for FeatureVector {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
