//! Prediction result data structures

use serde::Serialize;

/// Outcome of a single prediction request
///
/// Only built through [`PredictionResult::from_probabilities`], which keeps
/// `class_index` inside `probabilities`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    label: String,
    class_index: usize,
    probabilities: Vec<f64>,
}

impl PredictionResult {
    /// Build a result from a probability vector, picking the most likely class.
    ///
    /// The first maximum wins on ties. Returns `None` for an empty vector or when
    /// the lengths of `classes` and `probabilities` differ.
    pub fn from_probabilities(classes: &[String], probabilities: Vec<f64>) -> Option<Self> {
        if classes.len() != probabilities.len() {
            return None;
        }

        let class_index = probabilities
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, f64)>, (i, &p)| match best {
                Some((_, best_p)) if best_p >= p => best,
                _ => Some((i, p)),
            })?
            .0;

        Some(Self {
            label: classes[class_index].clone(),
            class_index,
            probabilities,
        })
    }

    /// Predicted class label
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Index of the label within the artifact's classes
    pub fn class_index(&self) -> usize {
        self.class_index
    }

    /// Per-class probabilities, aligned with the artifact's classes
    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    /// Probability of the predicted class
    pub fn max_probability(&self) -> f64 {
        self.probabilities
            .get(self.class_index)
            .copied()
            .unwrap_or(0.0)
    }

    /// Confidence in the predicted class as a rounded percentage
    pub fn confidence_percent(&self) -> u32 {
        (self.max_probability() * 100.0).round().clamp(0.0, 100.0) as u32
    }

    /// Pair each class label with its probability
    pub fn class_probabilities<'a>(
        &'a self,
        classes: &'a [String],
    ) -> impl Iterator<Item = (&'a str, f64)> + 'a {
        classes
            .iter()
            .map(String::as_str)
            .zip(self.probabilities.iter().copied())
    }
}
