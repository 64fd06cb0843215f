//! Error taxonomy for artifact loading, input encoding and prediction

use std::path::PathBuf;
use thiserror::Error;

/// Failure to load the model artifact. Fatal at startup.
#[derive(Debug, Error)]
pub enum ArtifactLoadError {
    #[error("Failed to read model artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed model artifact {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid model artifact: {0}")]
    Invalid(String),
    #[error("Unsupported model kind '{0}'")]
    UnsupportedModel(String),
    #[error("Failed to initialize ONNX session for {path}: {message}")]
    Onnx { path: PathBuf, message: String },
}

/// Raw inputs could not be turned into a feature vector.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EncodingError {
    #[error("Missing required input field '{field}'")]
    MissingField { field: &'static str },
    #[error("Unrecognized value '{value}' for '{field}' (expected one of: {expected})")]
    UnrecognizedCategory {
        field: &'static str,
        value: String,
        expected: String,
    },
    #[error("Input field '{field}' must be {expected}, got {found}")]
    InvalidType {
        field: &'static str,
        expected: &'static str,
        found: String,
    },
    #[error("Input field '{field}' must be a finite number, got {value}")]
    NotFinite { field: &'static str, value: f64 },
    #[error("Input field '{field}' must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("Request is not a JSON object of inputs: {0}")]
    MalformedRequest(String),
    #[error("Model expects feature '{0}' which cannot be derived from the inputs")]
    UnsupportedFeature(String),
}

impl EncodingError {
    /// Name of the offending field, when the error is tied to one.
    pub fn field(&self) -> Option<&str> {
        match self {
            EncodingError::MissingField { field }
            | EncodingError::UnrecognizedCategory { field, .. }
            | EncodingError::InvalidType { field, .. }
            | EncodingError::NotFinite { field, .. }
            | EncodingError::OutOfRange { field, .. } => Some(*field),
            EncodingError::UnsupportedFeature(_) | EncodingError::MalformedRequest(_) => None,
        }
    }
}

/// The model call failed or returned an unusable result.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PredictionError {
    #[error("Feature vector has {actual} values, model expects {expected}")]
    ShapeMismatch { expected: usize, actual: usize },
    #[error("Model returned {actual} probabilities for {expected} classes")]
    ClassCountMismatch { expected: usize, actual: usize },
    #[error("Model returned invalid probabilities: {0}")]
    InvalidProbabilities(String),
    #[error("Model backend error: {0}")]
    Backend(String),
}

/// Per-request failure surfaced to the user.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InferenceError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error("Prediction could not be computed: {0}")]
    Prediction(#[from] PredictionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_error_names_field() {
        let err = EncodingError::MissingField { field: "sex" };
        assert_eq!(err.field(), Some("sex"));
        assert!(err.to_string().contains("'sex'"));

        let err = EncodingError::InvalidType {
            field: "sex",
            expected: "a string",
            found: "number 1".to_string(),
        };
        assert_eq!(err.field(), Some("sex"));
        assert_eq!(err.to_string(), "Input field 'sex' must be a string, got number 1");

        let err = EncodingError::UnsupportedFeature("beak_colour".to_string());
        assert_eq!(err.field(), None);
    }

    #[test]
    fn test_inference_error_wraps_prediction() {
        let err: InferenceError = PredictionError::ShapeMismatch {
            expected: 7,
            actual: 6,
        }
        .into();
        assert!(err.to_string().starts_with("Prediction could not be computed"));
    }
}
