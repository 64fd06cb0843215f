//! Model artifact bundle: fitted classifier, feature order and class labels

use crate::error::{ArtifactLoadError, PredictionError};
use std::collections::HashSet;

/// A fitted classifier as exposed to the inference adapter.
///
/// `predict_proba` is the single model call made per request; the predicted
/// label is derived from its output.
pub trait Classifier: Send + Sync {
    /// Short name of the model family, used in logs
    fn kind(&self) -> &'static str;

    /// Number of input columns, when the model declares it
    fn n_features(&self) -> Option<usize>;

    /// Number of output classes, when the model declares it
    fn n_classes(&self) -> Option<usize>;

    /// Per-class probabilities for a single row
    fn predict_proba(&self, row: &[f64]) -> Result<Vec<f64>, PredictionError>;

    /// Per-feature importance scores, aligned with the input columns
    fn feature_importances(&self) -> Option<&[f64]> {
        None
    }
}

/// Immutable bundle loaded once per process
pub struct ModelArtifact {
    model: Box<dyn Classifier>,
    features: Vec<String>,
    classes: Vec<String>,
}

impl ModelArtifact {
    /// Bundle a classifier with its schema, checking that they agree
    pub fn new(
        model: Box<dyn Classifier>,
        features: Vec<String>,
        classes: Vec<String>,
    ) -> Result<Self, ArtifactLoadError> {
        if features.is_empty() {
            return Err(ArtifactLoadError::Invalid("feature list is empty".into()));
        }
        if classes.is_empty() {
            return Err(ArtifactLoadError::Invalid("class list is empty".into()));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = features.iter().find(|f| !seen.insert(f.as_str())) {
            return Err(ArtifactLoadError::Invalid(format!(
                "duplicate feature name '{dup}'"
            )));
        }

        if let Some(n) = model.n_features() {
            if n != features.len() {
                return Err(ArtifactLoadError::Invalid(format!(
                    "model expects {n} features but artifact lists {}",
                    features.len()
                )));
            }
        }
        if let Some(n) = model.n_classes() {
            if n != classes.len() {
                return Err(ArtifactLoadError::Invalid(format!(
                    "model has {n} classes but artifact lists {}",
                    classes.len()
                )));
            }
        }
        if let Some(importances) = model.feature_importances() {
            if importances.len() != features.len() {
                return Err(ArtifactLoadError::Invalid(format!(
                    "{} feature importances for {} features",
                    importances.len(),
                    features.len()
                )));
            }
        }

        Ok(Self {
            model,
            features,
            classes,
        })
    }

    pub fn model(&self) -> &dyn Classifier {
        self.model.as_ref()
    }

    /// Feature names in model column order
    pub fn features(&self) -> &[String] {
        &self.features
    }

    /// Class labels in probability-vector order
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// The `n` most influential features, most important first
    pub fn top_features(&self, n: usize) -> Vec<(&str, f64)> {
        let Some(importances) = self.model.feature_importances() else {
            return Vec::new();
        };

        let mut ranked: Vec<(&str, f64)> = self
            .features
            .iter()
            .map(String::as_str)
            .zip(importances.iter().copied())
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(n);
        ranked
    }
}

impl std::fmt::Debug for ModelArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelArtifact")
            .field("model", &self.model.kind())
            .field("features", &self.features)
            .field("classes", &self.classes)
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn test_rejects_empty_schema() {
        let model = Box::new(RecordingClassifier::new(vec![1.0]));
        assert!(ModelArtifact::new(model, vec![], penguin_classes()).is_err());

        let model = Box::new(RecordingClassifier::new(vec![1.0]));
        assert!(ModelArtifact::new(model, penguin_features(), vec![]).is_err());
    }

    #[test]
    fn test_rejects_duplicate_features() {
        let model = Box::new(RecordingClassifier::new(vec![1.0]));
        let features = vec!["sex_male".to_string(), "sex_male".to_string()];
        let err = ModelArtifact::new(model, features, penguin_classes()).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_top_features_sorted_descending() {
        let mut model = RecordingClassifier::new(vec![0.3, 0.3, 0.4]);
        model.importances = Some(vec![0.30, 0.10, 0.35, 0.15, 0.04, 0.01, 0.05]);
        let artifact =
            ModelArtifact::new(Box::new(model), penguin_features(), penguin_classes()).unwrap();

        let top = artifact.top_features(3);
        assert_eq!(
            top.iter().map(|(name, _)| *name).collect::<Vec<_>>(),
            vec!["flipper_length_mm", "bill_length_mm", "body_mass_g"]
        );
    }

    #[test]
    fn test_importance_length_checked() {
        let mut model = RecordingClassifier::new(vec![0.5, 0.5]);
        model.importances = Some(vec![1.0]);
        assert!(ModelArtifact::new(Box::new(model), penguin_features(), penguin_classes()).is_err());
    }

    #[test]
    fn test_no_importances_gives_empty_ranking() {
        let model = RecordingClassifier::new(vec![0.5, 0.5]);
        let artifact =
            ModelArtifact::new(Box::new(model), penguin_features(), penguin_classes()).unwrap();
        assert!(artifact.top_features(5).is_empty());
    }
}
