use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::config::PadConfig;
use crate::error::{DigitError, Result};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PadSettings {
    pub stroke_width: u32,
}

/// Settings the user can change while drawing. Held in memory for the
/// session only.
pub struct SettingsStore {
    min_stroke_width: u32,
    max_stroke_width: u32,
    data: RwLock<PadSettings>,
}

impl SettingsStore {
    pub fn new(config: &PadConfig) -> Self {
        Self {
            min_stroke_width: config.min_stroke_width,
            max_stroke_width: config.max_stroke_width,
            data: RwLock::new(PadSettings {
                stroke_width: config.default_stroke_width,
            }),
        }
    }

    pub fn snapshot(&self) -> PadSettings {
        *self.read()
    }

    pub fn stroke_width(&self) -> u32 {
        self.read().stroke_width
    }

    pub fn stroke_width_range(&self) -> (u32, u32) {
        (self.min_stroke_width, self.max_stroke_width)
    }

    pub fn update_stroke_width(&self, width: u32) -> Result<()> {
        if !(self.min_stroke_width..=self.max_stroke_width).contains(&width) {
            return Err(DigitError::InvalidSetting(format!(
                "stroke width {width} outside {}..={}",
                self.min_stroke_width, self.max_stroke_width
            )));
        }
        self.write().stroke_width = width;
        Ok(())
    }

    // A poisoned lock still holds a whole PadSettings.
    fn read(&self) -> RwLockReadGuard<'_, PadSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, PadSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
