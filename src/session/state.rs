use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::canvas::{CanvasPreprocessor, FeatureVector, RawSurface};
use crate::error::DigitError;
use crate::gate::PredictionGate;
use crate::model::{Classifier, Probabilities};

/// Key the drawing widget starts with before the first clear.
pub const INITIAL_CANVAS_KEY: &str = "canvas";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    #[default]
    Empty,
    Populated,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub status: SessionStatus,
    pub prediction: Option<u8>,
    pub processed: Option<FeatureVector>,
    pub probabilities: Probabilities,
    /// Changing this makes the widget throw its buffer away and start blank.
    pub canvas_key: String,
    pub updated_at: DateTime<Utc>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            status: SessionStatus::Empty,
            prediction: None,
            processed: None,
            probabilities: Probabilities::zeros(),
            canvas_key: INITIAL_CANVAS_KEY.to_string(),
            updated_at: Utc::now(),
        }
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reprocesses the whole surface and replaces the previous result.
    ///
    /// A missing surface (widget not ready) just empties the state. Returns
    /// the inference failure, if any, so it can be shown for this cycle.
    pub fn draw_cycle(
        &mut self,
        surface: Option<&RawSurface>,
        preprocessor: &CanvasPreprocessor,
        gate: &PredictionGate,
        model: &dyn Classifier,
    ) -> Option<DigitError> {
        self.updated_at = Utc::now();

        let Some(surface) = surface else {
            self.reset_result();
            return None;
        };

        let processed = preprocessor.preprocess(surface);
        let outcome = gate.maybe_predict(&processed, model);

        if let Some(err) = outcome.error {
            self.reset_result();
            return Some(err);
        }

        self.prediction = outcome.prediction;
        self.probabilities = outcome.probabilities;
        self.processed = Some(processed);
        self.status = if self.prediction.is_some() {
            SessionStatus::Populated
        } else {
            SessionStatus::Empty
        };
        None
    }

    pub fn clear(&mut self) {
        self.reset_result();
        self.canvas_key = fresh_canvas_key();
        self.updated_at = Utc::now();
    }

    fn reset_result(&mut self) {
        self.status = SessionStatus::Empty;
        self.prediction = None;
        self.processed = None;
        self.probabilities = Probabilities::zeros();
    }
}

fn fresh_canvas_key() -> String {
    format!("canvas_{}", Uuid::new_v4())
}
