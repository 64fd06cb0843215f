//! Model artifact loading and inference

pub mod artifact;
pub mod forest;
pub mod inference;
pub mod loader;
#[cfg(feature = "onnx")]
pub mod onnx;

pub use artifact::{Classifier, ModelArtifact};
pub use inference::predict;
pub use loader::{ArtifactStore, ModelLoader};
