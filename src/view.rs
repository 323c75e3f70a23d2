use serde::Serialize;

use crate::config::{CANVAS_SIZE, NUM_CLASSES};
use crate::error::DigitError;
use crate::model::Probabilities;
use crate::session::{SessionState, SessionStatus};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// A banner or toast for the user. Notices belong to the event that raised
/// them and are not carried into later views.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn prediction_failed(err: &DigitError) -> Self {
        Self::error(format!("Prediction failed: {err}"))
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChartBar {
    pub digit: u8,
    pub probability: f32,
    /// Axis-style whole percent, e.g. "42%"
    pub label: String,
    /// Hover text, e.g. "42.13%"
    pub tooltip: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProbabilityChart {
    pub bars: Vec<ChartBar>,
    pub y_domain: [f32; 2],
}

impl ProbabilityChart {
    pub fn from_probabilities(probabilities: &Probabilities) -> Self {
        let bars = (0..NUM_CLASSES)
            .map(|digit| {
                let probability = probabilities.get(digit).unwrap_or(0.0);
                ChartBar {
                    digit: digit as u8,
                    probability,
                    label: format!("{:.0}%", probability * 100.0),
                    tooltip: format!("{:.2}%", probability * 100.0),
                }
            })
            .collect();

        Self {
            bars,
            y_domain: [0.0, 1.0],
        }
    }
}

/// Everything the presentation layer needs to draw one frame.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PadView {
    pub canvas_key: String,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub stroke_width: u32,
    pub status: SessionStatus,
    pub prediction: Option<u8>,
    pub chart: ProbabilityChart,
    pub notices: Vec<Notice>,
    /// False when the session could not start; controls should be disabled.
    pub ready: bool,
}

impl PadView {
    pub fn from_state(state: &SessionState, stroke_width: u32, notices: Vec<Notice>) -> Self {
        Self {
            canvas_key: state.canvas_key.clone(),
            canvas_width: CANVAS_SIZE,
            canvas_height: CANVAS_SIZE,
            stroke_width,
            status: state.status,
            prediction: state.prediction,
            chart: ProbabilityChart::from_probabilities(&state.probabilities),
            notices,
            ready: true,
        }
    }

    /// A neutral frame for a session that has no model (yet).
    pub fn unavailable(stroke_width: u32, notice: Notice) -> Self {
        Self {
            ready: false,
            ..Self::from_state(&SessionState::new(), stroke_width, vec![notice])
        }
    }

    /// The frame shown when the model could not be loaded: neutral visuals and
    /// an error banner.
    pub fn startup_failure(err: &DigitError, stroke_width: u32) -> Self {
        Self::unavailable(
            stroke_width,
            Notice::error(format!("The model could not be loaded: {err}")),
        )
    }
}
