//! Penguin Species Predictor Library
//!
//! Loads a pre-trained classification artifact once per process and turns
//! raw penguin measurements into a predicted species with per-class
//! probabilities.

pub mod config;
pub mod display;
pub mod error;
pub mod feature_encoder;
pub mod metrics;
pub mod models;
pub mod session;
pub mod types;

pub use config::AppConfig;
pub use error::{ArtifactLoadError, EncodingError, InferenceError, PredictionError};
pub use feature_encoder::{FeatureEncoder, FeatureVector};
pub use models::{predict, ArtifactStore, ModelArtifact};
pub use types::{PredictionResult, RawInputs};
