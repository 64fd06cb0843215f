//! Type definitions for the penguin predictor

pub mod inputs;
pub mod prediction;

pub use inputs::{Island, RawInputs, Sex};
pub use prediction::PredictionResult;
