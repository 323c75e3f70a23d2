use std::path::PathBuf;

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use crate::error::{DigitError, Result};

/// Side length of the drawing widget, in pixels.
pub const CANVAS_SIZE: u32 = 280;
/// Side length of the image the classifier was trained on.
pub const FEATURE_SIDE: u32 = 28;
pub const FEATURE_LEN: usize = (FEATURE_SIDE * FEATURE_SIDE) as usize;
pub const NUM_CLASSES: usize = 10;

/// Resampling filters allowed for the 280 -> 28 downsample. No nearest-neighbour.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum ResampleFilter {
    #[default]
    Lanczos3,
    CatmullRom,
    Triangle,
}

impl ResampleFilter {
    pub fn filter_type(self) -> FilterType {
        match self {
            ResampleFilter::Lanczos3 => FilterType::Lanczos3,
            ResampleFilter::CatmullRom => FilterType::CatmullRom,
            ResampleFilter::Triangle => FilterType::Triangle,
        }
    }
}

/// Tunable knobs for preprocessing and gating.
///
/// The two thresholds are calibration values, not ground truth: they depend
/// on stroke width and canvas resolution and should be tuned against held-out
/// drawings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PadConfig {
    /// After inversion and resampling, pixels below this become 0, the rest 255.
    pub binarize_threshold: u8,

    /// Minimum feature-vector sum before the classifier is consulted.
    pub min_ink_mass: u64,

    pub resample_filter: ResampleFilter,

    /// Stroke width selector bounds and starting value
    pub default_stroke_width: u32,
    pub min_stroke_width: u32,
    pub max_stroke_width: u32,

    pub model: ModelConfig,
}

impl Default for PadConfig {
    fn default() -> Self {
        Self {
            binarize_threshold: 50,
            min_ink_mass: 1000,
            resample_filter: ResampleFilter::default(),
            default_stroke_width: 12,
            min_stroke_width: 1,
            max_stroke_width: 25,
            model: ModelConfig::default(),
        }
    }
}

impl PadConfig {
    pub fn validate(&self) -> Result<()> {
        if self.binarize_threshold == 0 {
            return Err(DigitError::InvalidSetting(
                "binarize_threshold must be at least 1".into(),
            ));
        }

        let max_mass = FEATURE_LEN as u64 * 255;
        if self.min_ink_mass > max_mass {
            return Err(DigitError::InvalidSetting(format!(
                "min_ink_mass {} can never be reached (max {max_mass})",
                self.min_ink_mass
            )));
        }

        if self.min_stroke_width == 0 || self.min_stroke_width > self.max_stroke_width {
            return Err(DigitError::InvalidSetting(format!(
                "stroke width range {}..={} is empty or starts at zero",
                self.min_stroke_width, self.max_stroke_width
            )));
        }

        if !(self.min_stroke_width..=self.max_stroke_width).contains(&self.default_stroke_width) {
            return Err(DigitError::InvalidSetting(format!(
                "default stroke width {} outside {}..={}",
                self.default_stroke_width, self.min_stroke_width, self.max_stroke_width
            )));
        }

        self.model.validate()
    }
}

/// Where the classifier artifact lives locally and how to fetch it when it doesn't.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelConfig {
    /// Stable identifier of the artifact in the remote object store.
    /// Without one, a missing local file is fatal.
    pub file_id: Option<String>,
    pub local_path: PathBuf,
    pub download_url: String,
    /// Endpoint used after the store interposes a "download anyway" page
    pub confirm_url: String,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            file_id: None,
            local_path: PathBuf::from("best_model.json"),
            download_url: "https://drive.google.com/uc".into(),
            confirm_url: "https://drive.usercontent.google.com/download".into(),
            connect_timeout_secs: 10,
            read_timeout_secs: 120,
        }
    }
}

impl ModelConfig {
    fn validate(&self) -> Result<()> {
        if self.local_path.as_os_str().is_empty() {
            return Err(DigitError::InvalidSetting("model local_path is empty".into()));
        }
        if matches!(self.file_id.as_deref(), Some(id) if id.trim().is_empty()) {
            return Err(DigitError::InvalidSetting("model file_id is blank".into()));
        }
        Ok(())
    }
}
