//! ONNX Runtime backed classifier

use crate::error::{ArtifactLoadError, PredictionError};
use crate::models::artifact::Classifier;
use ort::memory::Allocator;
use ort::session::{builder::GraphOptimizationLevel, Session, SessionOutputs};
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, DynValue, Tensor};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// Classifier wrapping an ONNX session.
///
/// The session needs exclusive access to run, so it sits behind a mutex; the
/// artifact holding it stays shareable.
pub struct OnnxClassifier {
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
    /// Static width of the input row, when the graph declares one
    n_features: Option<usize>,
    n_classes: usize,
    feature_importances: Option<Vec<f64>>,
}

impl OnnxClassifier {
    /// Load an ONNX graph from file
    pub fn load<P: AsRef<Path>>(
        path: P,
        n_classes: usize,
        onnx_threads: usize,
        feature_importances: Option<Vec<f64>>,
    ) -> Result<Self, ArtifactLoadError> {
        let path = path.as_ref();
        let onnx_error = |e: &dyn std::fmt::Display| ArtifactLoadError::Onnx {
            path: path.to_path_buf(),
            message: e.to_string(),
        };

        info!(path = %path.display(), threads = onnx_threads, "Loading ONNX model");

        let session = Session::builder()
            .map_err(|e| onnx_error(&e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| onnx_error(&e))?
            .with_intra_threads(onnx_threads)
            .map_err(|e| onnx_error(&e))?
            .commit_from_file(path)
            .map_err(|e| onnx_error(&e))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let n_features = session
            .inputs
            .first()
            .and_then(|i| i.input_type.tensor_shape())
            .and_then(|shape| static_width(shape));

        // Prefer the probability output over the label output
        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .or_else(|| session.outputs.last())
            .map(|o| o.name.clone())
            .unwrap_or_else(|| "probabilities".to_string());

        info!(
            input = %input_name,
            output = %output_name,
            features = ?n_features,
            "ONNX model loaded"
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
            n_features,
            n_classes,
            feature_importances,
        })
    }

    /// Pull the class probabilities for the single input row
    fn extract_probabilities(&self, outputs: &SessionOutputs) -> Result<Vec<f64>, PredictionError> {
        let output = outputs.get(self.output_name.as_str()).ok_or_else(|| {
            PredictionError::Backend(format!("model produced no '{}' output", self.output_name))
        })?;

        if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
            debug!(shape = ?shape, "Extracting probabilities from tensor");
            return probabilities_from_tensor(shape, data);
        }

        // seq(map(int64, float)) as produced by zipmap exports
        if DynSequenceValueType::can_downcast(&output.dtype()) {
            return self.extract_from_sequence_map(output);
        }

        Err(PredictionError::Backend(format!(
            "unsupported output type for '{}'",
            self.output_name
        )))
    }

    fn extract_from_sequence_map(&self, output: &DynValue) -> Result<Vec<f64>, PredictionError> {
        let allocator = Allocator::default();

        let sequence = output
            .downcast_ref::<DynSequenceValueType>()
            .map_err(backend)?;
        let maps = sequence
            .try_extract_sequence::<DynMapValueType>(&allocator)
            .map_err(backend)?;
        let first = maps
            .first()
            .ok_or_else(|| PredictionError::Backend("empty probability sequence".into()))?;

        let pairs = first.try_extract_key_values::<i64, f32>().map_err(backend)?;

        debug!("Extracting probabilities from seq(map)");
        probabilities_from_pairs(pairs, self.n_classes)
    }
}

/// Last dimension of an input shape, unless it is symbolic (-1) or zero
fn static_width(shape: &[i64]) -> Option<usize> {
    shape
        .last()
        .and_then(|&dim| usize::try_from(dim).ok())
        .filter(|&dim| dim > 0)
}

/// First row of a `[1, n_classes]` or `[n_classes]` probability tensor
fn probabilities_from_tensor(shape: &[i64], data: &[f32]) -> Result<Vec<f64>, PredictionError> {
    match static_width(shape) {
        Some(width) if data.len() >= width => {
            Ok(data[..width].iter().map(|&p| p as f64).collect())
        }
        _ => Err(PredictionError::Backend(format!(
            "unexpected probability tensor shape {shape:?}"
        ))),
    }
}

/// Dense probabilities from `(class id, probability)` pairs
fn probabilities_from_pairs(
    pairs: impl IntoIterator<Item = (i64, f32)>,
    n_classes: usize,
) -> Result<Vec<f64>, PredictionError> {
    let mut proba = vec![0.0; n_classes];
    for (class_id, p) in pairs {
        let slot = usize::try_from(class_id)
            .ok()
            .and_then(|idx| proba.get_mut(idx))
            .ok_or_else(|| PredictionError::Backend(format!("class id {class_id} out of range")))?;
        *slot = p as f64;
    }
    Ok(proba)
}

fn backend(e: impl std::fmt::Display) -> PredictionError {
    PredictionError::Backend(e.to_string())
}

impl Classifier for OnnxClassifier {
    fn kind(&self) -> &'static str {
        "onnx"
    }

    fn n_features(&self) -> Option<usize> {
        self.n_features
    }

    fn n_classes(&self) -> Option<usize> {
        Some(self.n_classes)
    }

    fn predict_proba(&self, row: &[f64]) -> Result<Vec<f64>, PredictionError> {
        let shape = vec![1_i64, row.len() as i64];
        let values: Vec<f32> = row.iter().map(|&v| v as f32).collect();
        let input_tensor = Tensor::from_array((shape, values)).map_err(backend)?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| PredictionError::Backend(format!("session lock poisoned: {e}")))?;

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_tensor])
            .map_err(backend)?;

        self.extract_probabilities(&outputs)
    }

    fn feature_importances(&self) -> Option<&[f64]> {
        self.feature_importances.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_width() {
        assert_eq!(static_width(&[-1, 7]), Some(7));
        assert_eq!(static_width(&[1, 6]), Some(6));
        assert_eq!(static_width(&[-1, -1]), None);
        assert_eq!(static_width(&[]), None);
    }

    #[test]
    fn test_probabilities_from_tensor() {
        let proba = probabilities_from_tensor(&[1, 3], &[0.25, 0.5, 0.25]).unwrap();
        assert_eq!(proba, vec![0.25, 0.5, 0.25]);

        // A batch keeps only the first row
        let proba = probabilities_from_tensor(&[2, 3], &[0.5, 0.25, 0.25, 0.0, 0.0, 1.0]).unwrap();
        assert_eq!(proba, vec![0.5, 0.25, 0.25]);

        assert!(matches!(
            probabilities_from_tensor(&[1, 3], &[0.5, 0.5]),
            Err(PredictionError::Backend(_))
        ));
        assert!(probabilities_from_tensor(&[1, -1], &[1.0]).is_err());
    }

    #[test]
    fn test_probabilities_from_pairs() {
        let proba = probabilities_from_pairs(vec![(2, 0.75), (0, 0.25)], 3).unwrap();
        assert_eq!(proba, vec![0.25, 0.0, 0.75]);

        assert!(probabilities_from_pairs(vec![(3, 1.0)], 3).is_err());
        assert!(probabilities_from_pairs(vec![(-1, 1.0)], 3).is_err());
    }
}
