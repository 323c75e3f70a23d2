use image::{GrayImage, ImageBuffer};
use serde::{Deserialize, Serialize};

use crate::config::CANVAS_SIZE;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SurfaceFormat {
    Rgba,
    Luma,
}

impl SurfaceFormat {
    pub fn channels(self) -> usize {
        match self {
            SurfaceFormat::Rgba => 4,
            SurfaceFormat::Luma => 1,
        }
    }
}

/// One frame of the drawing widget: the whole bitmap as it looked after the
/// latest stroke. Consumed by a single render cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSurface {
    width: u32,
    height: u32,
    format: SurfaceFormat,
    data: Vec<u8>,
}

impl RawSurface {
    /// Wraps an RGBA buffer. Returns `None` when the buffer cannot be a
    /// `width x height` image; callers treat that as "nothing drawn yet".
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        Self::with_format(width, height, SurfaceFormat::Rgba, data)
    }

    pub fn from_luma(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        Self::with_format(width, height, SurfaceFormat::Luma, data)
    }

    fn with_format(width: u32, height: u32, format: SurfaceFormat, data: Vec<u8>) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(format.channels())?;
        if expected == 0 || data.len() != expected {
            return None;
        }
        Some(Self {
            width,
            height,
            format,
            data,
        })
    }

    /// An untouched widget: opaque white, `CANVAS_SIZE` square.
    pub fn blank() -> Self {
        let len = (CANVAS_SIZE * CANVAS_SIZE) as usize * SurfaceFormat::Rgba.channels();
        Self {
            width: CANVAS_SIZE,
            height: CANVAS_SIZE,
            format: SurfaceFormat::Rgba,
            data: vec![255; len],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> SurfaceFormat {
        self.format
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Paints an opaque grey-level rectangle, clipped to the surface.
    pub fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, level: u8) {
        let x_end = x.saturating_add(width).min(self.width);
        let y_end = y.saturating_add(height).min(self.height);
        let channels = self.format.channels();

        for row in y.min(self.height)..y_end {
            for col in x.min(self.width)..x_end {
                let offset = (row as usize * self.width as usize + col as usize) * channels;
                match self.format {
                    SurfaceFormat::Rgba => {
                        self.data[offset..offset + 3].fill(level);
                        self.data[offset + 3] = 255;
                    }
                    SurfaceFormat::Luma => self.data[offset] = level,
                }
            }
        }
    }

    /// Single grey plane of the surface. Strokes are monochrome, so the red
    /// channel stands in for luminance on RGBA input; alpha is dropped.
    pub(crate) fn luma_plane(&self) -> GrayImage {
        let plane: Vec<u8> = match self.format {
            SurfaceFormat::Rgba => self
                .data
                .chunks_exact(SurfaceFormat::Rgba.channels())
                .map(|px| px[0])
                .collect(),
            SurfaceFormat::Luma => self.data.clone(),
        };

        // Length was checked in the constructor.
        ImageBuffer::from_raw(self.width, self.height, plane)
            .unwrap_or_else(|| GrayImage::new(self.width, self.height))
    }
}
