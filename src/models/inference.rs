//! Inference adapter: raw inputs in, label and class probabilities out

use crate::error::{InferenceError, PredictionError};
use crate::feature_encoder::{FeatureEncoder, FeatureVector};
use crate::models::artifact::ModelArtifact;
use crate::types::inputs::RawInputs;
use crate::types::prediction::PredictionResult;
use tracing::debug;

/// Allowed deviation of the probability sum from 1
const PROBABILITY_SUM_TOLERANCE: f64 = 1e-3;

/// Encode `raw` for `artifact` and run one prediction.
///
/// The model is called exactly once; the label is taken from the same
/// probability vector that is returned. Encoding failures happen before any
/// model call.
pub fn predict(raw: &RawInputs, artifact: &ModelArtifact) -> Result<PredictionResult, InferenceError> {
    let vector = FeatureEncoder::new(artifact.features()).encode(raw)?;
    Ok(predict_vector(&vector, artifact)?)
}

/// Run the model on an already encoded vector
pub fn predict_vector(
    vector: &FeatureVector,
    artifact: &ModelArtifact,
) -> Result<PredictionResult, PredictionError> {
    let expected = artifact.features().len();
    if vector.len() != expected || vector.names() != artifact.features() {
        return Err(PredictionError::ShapeMismatch {
            expected,
            actual: vector.len(),
        });
    }

    let probabilities = artifact.model().predict_proba(vector.values())?;
    check_probabilities(&probabilities, artifact.classes().len())?;

    let result = PredictionResult::from_probabilities(artifact.classes(), probabilities)
        .ok_or_else(|| PredictionError::InvalidProbabilities("no probabilities returned".into()))?;

    debug!(
        label = %result.label(),
        confidence = result.max_probability(),
        features = ?vector.values(),
        "Prediction complete"
    );

    Ok(result)
}

fn check_probabilities(probabilities: &[f64], n_classes: usize) -> Result<(), PredictionError> {
    if probabilities.len() != n_classes {
        return Err(PredictionError::ClassCountMismatch {
            expected: n_classes,
            actual: probabilities.len(),
        });
    }

    if let Some(bad) = probabilities.iter().find(|p| !p.is_finite() || **p < 0.0) {
        return Err(PredictionError::InvalidProbabilities(format!(
            "value {bad} is not a probability"
        )));
    }

    let sum: f64 = probabilities.iter().sum();
    if (sum - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
        return Err(PredictionError::InvalidProbabilities(format!(
            "probabilities sum to {sum:.4}"
        )));
    }

    Ok(())
}
