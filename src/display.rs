//! Terminal presentation: input controls and text charts

use crate::config::DisplayConfig;
use crate::error::EncodingError;
use crate::models::artifact::ModelArtifact;
use crate::types::prediction::PredictionResult;
use std::fmt::Write;

/// Bounds and default of a numeric input control
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slider {
    pub field: &'static str,
    pub label: &'static str,
    pub min: f64,
    pub max: f64,
    pub default: f64,
}

impl Slider {
    /// Accept a value inside the slider range
    pub fn check(&self, value: f64) -> Result<f64, EncodingError> {
        if (self.min..=self.max).contains(&value) {
            Ok(value)
        } else {
            Err(EncodingError::OutOfRange {
                field: self.field,
                value,
                min: self.min,
                max: self.max,
            })
        }
    }
}

pub const BILL_LENGTH: Slider = Slider {
    field: "bill_length_mm",
    label: "Bill length (mm)",
    min: 30.0,
    max: 60.0,
    default: 40.0,
};

pub const BILL_DEPTH: Slider = Slider {
    field: "bill_depth_mm",
    label: "Bill depth (mm)",
    min: 10.0,
    max: 25.0,
    default: 18.0,
};

pub const FLIPPER_LENGTH: Slider = Slider {
    field: "flipper_length_mm",
    label: "Flipper length (mm)",
    min: 170.0,
    max: 240.0,
    default: 200.0,
};

pub const BODY_MASS: Slider = Slider {
    field: "body_mass_g",
    label: "Body mass (g)",
    min: 2500.0,
    max: 6500.0,
    default: 4000.0,
};

/// Renders predictions and model insight as text
#[derive(Debug, Clone)]
pub struct Renderer {
    top_features: usize,
    bar_width: usize,
}

impl Renderer {
    pub fn new(config: &DisplayConfig) -> Self {
        Self {
            top_features: config.top_features,
            bar_width: config.bar_width.max(1),
        }
    }

    fn bar(&self, fraction: f64) -> String {
        let len = (fraction.clamp(0.0, 1.0) * self.bar_width as f64).round() as usize;
        "█".repeat(len)
    }

    /// Predicted label plus a per-class probability chart
    pub fn prediction(&self, result: &PredictionResult, artifact: &ModelArtifact) -> String {
        let classes = artifact.classes();
        let label_width = classes.iter().map(|c| c.chars().count()).max().unwrap_or(0);

        let mut out = String::new();
        let _ = writeln!(out, "Predicted Species: {}", result.label());
        let _ = writeln!(out);
        let _ = writeln!(out, "Prediction Confidence");
        for (class, p) in result.class_probabilities(classes) {
            let _ = writeln!(
                out,
                "  {class:<label_width$}  {:>5.1}%  {}",
                p * 100.0,
                self.bar(p)
            );
        }
        out
    }

    /// Top features by importance, most important first
    pub fn feature_importances(&self, artifact: &ModelArtifact) -> String {
        let top = artifact.top_features(self.top_features);

        let mut out = String::new();
        let _ = writeln!(out, "Top Influential Features");
        if top.is_empty() {
            let _ = writeln!(out, "  (model does not report feature importances)");
            return out;
        }

        let max = top.iter().map(|(_, v)| *v).fold(0.0_f64, f64::max);
        let name_width = top.iter().map(|(n, _)| n.len()).max().unwrap_or(0);
        for (name, importance) in top {
            let fraction = if max > 0.0 { importance / max } else { 0.0 };
            let _ = writeln!(
                out,
                "  {name:<name_width$}  {importance:.3}  {}",
                self.bar(fraction)
            );
        }
        out
    }

    /// Confidence gauge, only available once a prediction exists
    pub fn confidence(&self, result: Option<&PredictionResult>) -> Option<String> {
        let result = result?;
        let percent = result.confidence_percent();
        let filled = self.bar(percent as f64 / 100.0);
        let empty = "░".repeat(self.bar_width.saturating_sub(filled.chars().count()));

        Some(format!(
            "Model Confidence in '{}' Prediction\n  {filled}{empty} {percent}%\n",
            result.label()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::artifact::testing::{penguin_classes, penguin_features, RecordingClassifier};

    fn artifact(importances: Option<Vec<f64>>) -> ModelArtifact {
        let mut model = RecordingClassifier::new(vec![0.2, 0.1, 0.7]);
        model.importances = importances;
        ModelArtifact::new(Box::new(model), penguin_features(), penguin_classes()).unwrap()
    }

    fn renderer() -> Renderer {
        Renderer::new(&DisplayConfig {
            top_features: 2,
            bar_width: 10,
        })
    }

    #[test]
    fn test_slider_bounds() {
        assert_eq!(BILL_LENGTH.check(30.0), Ok(30.0));
        assert_eq!(BILL_LENGTH.check(60.5).unwrap_err().field(), Some("bill_length_mm"));
        assert!(BODY_MASS.check(2499.0).is_err());
        assert!(FLIPPER_LENGTH.check(FLIPPER_LENGTH.default).is_ok());
        assert!(BILL_DEPTH.check(f64::NAN).is_err());
    }

    #[test]
    fn test_prediction_chart() {
        let artifact = artifact(None);
        let result =
            PredictionResult::from_probabilities(artifact.classes(), vec![0.2, 0.1, 0.7]).unwrap();

        let text = renderer().prediction(&result, &artifact);
        assert!(text.starts_with("Predicted Species: Gentoo"));
        assert!(text.contains("Gentoo      70.0%  ███████\n"));
    }

    #[test]
    fn test_importance_chart_limited_to_top_n() {
        let artifact = artifact(Some(vec![0.30, 0.10, 0.35, 0.15, 0.04, 0.01, 0.05]));
        let text = renderer().feature_importances(&artifact);

        assert!(text.contains("flipper_length_mm"));
        assert!(text.contains("bill_length_mm"));
        assert!(!text.contains("body_mass_g"));
    }

    #[test]
    fn test_importance_chart_without_importances() {
        let text = renderer().feature_importances(&artifact(None));
        assert!(text.contains("does not report"));
    }

    #[test]
    fn test_confidence_requires_prediction() {
        let artifact = artifact(None);
        assert!(renderer().confidence(None).is_none());

        let result =
            PredictionResult::from_probabilities(artifact.classes(), vec![0.2, 0.1, 0.7]).unwrap();
        let gauge = renderer().confidence(Some(&result)).unwrap();
        assert!(gauge.contains("'Gentoo'"));
        assert!(gauge.contains("███████░░░ 70%"));
    }
}
