use std::panic::{self, AssertUnwindSafe};

use crate::canvas::FeatureVector;
use crate::config::{PadConfig, NUM_CLASSES};
use crate::error::{DigitError, Result};
use crate::model::{Classifier, Probabilities};
use crate::{log_debug, log_warn};

const ENABLE_LOGS: bool = true;

/// What one cycle produced. `error` is a transient inference failure that the
/// caller should show and then forget.
#[derive(Debug)]
pub struct GateOutcome {
    pub prediction: Option<u8>,
    pub probabilities: Probabilities,
    pub error: Option<DigitError>,
}

impl GateOutcome {
    fn empty() -> Self {
        Self {
            prediction: None,
            probabilities: Probabilities::zeros(),
            error: None,
        }
    }

    fn failed(error: DigitError) -> Self {
        Self {
            error: Some(error),
            ..Self::empty()
        }
    }
}

/// Asks the classifier only when enough was drawn for the answer to mean
/// something; near-blank canvases get no prediction at all.
#[derive(Debug, Clone, Copy)]
pub struct PredictionGate {
    min_ink_mass: u64,
}

impl PredictionGate {
    pub fn new(min_ink_mass: u64) -> Self {
        Self { min_ink_mass }
    }

    pub fn from_config(config: &PadConfig) -> Self {
        Self::new(config.min_ink_mass)
    }

    pub fn min_ink_mass(&self) -> u64 {
        self.min_ink_mass
    }

    pub fn admits(&self, features: &FeatureVector) -> bool {
        features.ink_mass() >= self.min_ink_mass
    }

    /// Never fails: inference errors, and classifiers that panic, come back
    /// as an outcome with no prediction and the error attached.
    pub fn maybe_predict(&self, features: &FeatureVector, model: &dyn Classifier) -> GateOutcome {
        let ink_mass = features.ink_mass();
        if ink_mass < self.min_ink_mass {
            log_debug!("Ink mass {ink_mass} below {}, skipping inference", self.min_ink_mass);
            return GateOutcome::empty();
        }

        let result = panic::catch_unwind(AssertUnwindSafe(|| infer(features, model)))
            .unwrap_or_else(|_| Err(DigitError::InferenceFailure("classifier panicked".into())));

        match result {
            Ok((digit, probabilities)) => GateOutcome {
                prediction: Some(digit),
                probabilities,
                error: None,
            },
            Err(err) => {
                log_warn!("Inference failed: {err}");
                GateOutcome::failed(err)
            }
        }
    }
}

impl Default for PredictionGate {
    fn default() -> Self {
        Self::from_config(&PadConfig::default())
    }
}

fn infer(features: &FeatureVector, model: &dyn Classifier) -> Result<(u8, Probabilities)> {
    let label = model.predict(features).map_err(into_inference_failure)?;
    let row = model.predict_proba(features).map_err(into_inference_failure)?;

    let digit = u8::try_from(label)
        .ok()
        .filter(|&d| usize::from(d) < NUM_CLASSES)
        .ok_or_else(|| DigitError::InferenceFailure(format!("label {label} is not a digit")))?;
    let probabilities = Probabilities::try_from_slice(&row)?;

    Ok((digit, probabilities))
}

fn into_inference_failure(err: DigitError) -> DigitError {
    match err {
        DigitError::InferenceFailure(_) => err,
        other => DigitError::InferenceFailure(other.to_string()),
    }
}
