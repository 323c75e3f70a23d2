use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::canvas::FeatureVector;
use crate::config::{FEATURE_LEN, NUM_CLASSES};
use crate::error::{DigitError, Result};

/// A pre-trained digit classifier. Inference must be free of side effects:
/// one handle is shared by every session.
pub trait Classifier: Send + Sync {
    /// Most likely class for one drawing.
    fn predict(&self, features: &FeatureVector) -> Result<usize>;

    /// Per-class probabilities for one drawing, indexed by digit.
    fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<f32>>;

    fn predict_batch(&self, batch: &[FeatureVector]) -> Result<Vec<usize>> {
        batch.iter().map(|features| self.predict(features)).collect()
    }

    fn predict_proba_batch(&self, batch: &[FeatureVector]) -> Result<Vec<Vec<f32>>> {
        batch
            .iter()
            .map(|features| self.predict_proba(features))
            .collect()
    }
}

/// Ten per-class probabilities in [0, 1]. Their sum is whatever the
/// classifier said it was.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Probabilities([f32; NUM_CLASSES]);

impl Probabilities {
    pub fn zeros() -> Self {
        Self([0.0; NUM_CLASSES])
    }

    /// Checks a raw classifier row: exactly ten finite values in [0, 1].
    pub fn try_from_slice(values: &[f32]) -> Result<Self> {
        let row: [f32; NUM_CLASSES] = values.try_into().map_err(|_| {
            DigitError::InferenceFailure(format!(
                "expected {NUM_CLASSES} probabilities, got {}",
                values.len()
            ))
        })?;

        if let Some((digit, p)) = row
            .iter()
            .enumerate()
            .find(|(_, p)| !p.is_finite() || **p < 0.0 || **p > 1.0)
        {
            return Err(DigitError::InferenceFailure(format!(
                "probability {p} for digit {digit} is outside [0, 1]"
            )));
        }

        Ok(Self(row))
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn get(&self, digit: usize) -> Option<f32> {
        self.0.get(digit).copied()
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&p| p == 0.0)
    }

    /// Highest-probability digit, lowest index on ties. `None` when all zero.
    pub fn argmax(&self) -> Option<usize> {
        if self.is_zero() {
            return None;
        }
        let mut best = 0;
        for (digit, &p) in self.0.iter().enumerate().skip(1) {
            if p > self.0[best] {
                best = digit;
            }
        }
        Some(best)
    }
}

fn default_input_scale() -> f32 {
    1.0 / 255.0
}

/// Multinomial logistic regression over the 784 binarized pixels, stored as
/// JSON: `{"weights": [[f32; 784]; 10], "bias": [f32; 10], "inputScale": f32}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoftmaxModel {
    weights: Vec<Vec<f32>>,
    bias: Vec<f32>,
    #[serde(default = "default_input_scale")]
    input_scale: f32,
}

impl SoftmaxModel {
    pub fn new(weights: Vec<Vec<f32>>, bias: Vec<f32>, input_scale: f32) -> Result<Self> {
        let model = Self {
            weights,
            bias,
            input_scale,
        };
        model.validate()?;
        Ok(model)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let model: Self = serde_json::from_str(json)
            .map_err(|e| DigitError::model_unavailable(format!("not a softmax model: {e}")))?;
        model.validate()?;
        Ok(model)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            DigitError::model_unavailable(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&contents)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    fn validate(&self) -> Result<()> {
        if self.weights.len() != NUM_CLASSES || self.bias.len() != NUM_CLASSES {
            return Err(DigitError::model_unavailable(format!(
                "expected {NUM_CLASSES} classes, got {} weight rows and {} biases",
                self.weights.len(),
                self.bias.len()
            )));
        }
        if let Some((class, row)) = self
            .weights
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != FEATURE_LEN)
        {
            return Err(DigitError::model_unavailable(format!(
                "weight row {class} has {} inputs, expected {FEATURE_LEN}",
                row.len()
            )));
        }
        let all_finite = self
            .weights
            .iter()
            .flatten()
            .chain(self.bias.iter())
            .all(|w| w.is_finite());
        if !all_finite || !self.input_scale.is_finite() || self.input_scale <= 0.0 {
            return Err(DigitError::model_unavailable(
                "model holds non-finite parameters",
            ));
        }
        Ok(())
    }

    fn scores(&self, features: &FeatureVector) -> [f32; NUM_CLASSES] {
        let mut scores = [0.0f32; NUM_CLASSES];
        for (class, score) in scores.iter_mut().enumerate() {
            let dot: f32 = self.weights[class]
                .iter()
                .zip(features.as_slice())
                .filter(|&(_, &x)| x != 0)
                .map(|(w, &x)| w * f32::from(x) * self.input_scale)
                .sum();
            *score = dot + self.bias[class];
        }
        scores
    }
}

impl Classifier for SoftmaxModel {
    fn predict(&self, features: &FeatureVector) -> Result<usize> {
        let scores = self.scores(features);
        let mut best = 0;
        for (class, &score) in scores.iter().enumerate().skip(1) {
            if score > scores[best] {
                best = class;
            }
        }
        Ok(best)
    }

    fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<f32>> {
        let scores = self.scores(features);
        let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
        let total: f32 = exps.iter().sum();
        Ok(exps.into_iter().map(|e| e / total).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Class `favourite` gets +1 per lit pixel, every other class nothing.
    fn biased_model(favourite: usize) -> SoftmaxModel {
        let weights = (0..NUM_CLASSES)
            .map(|class| vec![if class == favourite { 1.0 } else { 0.0 }; FEATURE_LEN])
            .collect();
        SoftmaxModel::new(weights, vec![0.0; NUM_CLASSES], 1.0 / 255.0).unwrap()
    }

    fn inked(pixels: usize) -> FeatureVector {
        let mut values = vec![0u8; FEATURE_LEN];
        values[..pixels].fill(255);
        FeatureVector::try_from(values).unwrap()
    }

    #[test]
    fn blank_input_is_uniform() {
        let probs = biased_model(3).predict_proba(&FeatureVector::zeros()).unwrap();
        assert_eq!(probs.len(), NUM_CLASSES);
        for p in probs {
            assert!((p - 0.1).abs() < 1e-6);
        }
    }

    #[test]
    fn ink_pushes_towards_favourite_class() {
        let model = biased_model(7);
        let features = inked(40);
        assert_eq!(model.predict(&features).unwrap(), 7);

        let row = model.predict_proba(&features).unwrap();
        let probs = Probabilities::try_from_slice(&row).unwrap();
        assert_eq!(probs.argmax(), Some(7));
        let total: f32 = probs.as_slice().iter().sum();
        assert!((total - 1.0).abs() < 1e-4);
    }

    #[test]
    fn batch_helpers_follow_single_calls() {
        let model = biased_model(2);
        let batch = vec![FeatureVector::zeros(), inked(100)];
        let labels = model.predict_batch(&batch).unwrap();
        assert_eq!(labels, vec![0, 2]);
        assert_eq!(model.predict_proba_batch(&batch).unwrap().len(), 2);
    }

    #[test]
    fn json_round_trip_preserves_predictions() {
        let model = biased_model(5);
        let loaded = SoftmaxModel::from_json(&model.to_json().unwrap()).unwrap();
        assert_eq!(loaded.predict(&inked(10)).unwrap(), 5);
    }

    #[test]
    fn malformed_artifacts_are_model_unavailable() {
        let err = SoftmaxModel::from_json("{\"weights\": [], \"bias\": []}").unwrap_err();
        assert!(err.is_model_unavailable());

        let err = SoftmaxModel::from_json("\u{80}pickle").unwrap_err();
        assert!(err.is_model_unavailable());

        let short_row = vec![vec![0.0; FEATURE_LEN - 1]; NUM_CLASSES];
        assert!(SoftmaxModel::new(short_row, vec![0.0; NUM_CLASSES], 1.0).is_err());
    }

    #[test]
    fn probabilities_reject_bad_rows() {
        assert!(Probabilities::try_from_slice(&[0.1; 9]).is_err());
        let mut row = [0.0f32; NUM_CLASSES];
        row[4] = 1.5;
        assert!(Probabilities::try_from_slice(&row).is_err());
        row[4] = f32::NAN;
        assert!(Probabilities::try_from_slice(&row).is_err());
        assert_eq!(Probabilities::zeros().argmax(), None);
    }
}
