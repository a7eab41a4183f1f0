//! Model artifact contract and the JSON artifact format used to persist trained estimators.

mod artifact;
mod estimator;

pub use artifact::{ArtifactDocument, JsonClassifier, JsonRegressor, ModelLoadError};
pub use estimator::{Aggregation, Estimator, Tree, TreeNode};

use std::sync::Arc;

use tracing::info;

use super::features::FeatureVector;
use crate::config::ModelConfig;

/// Categorical eligibility model. Documented outputs are 0 (eligible), 1 (high risk) and
/// 2 (not eligible); anything else is a contract violation caught by the dispatcher.
pub trait EligibilityClassifier: Send + Sync {
    fn classify(&self, features: &FeatureVector) -> Result<i64, ModelError>;
}

/// Numeric model predicting the maximum sustainable monthly EMI.
pub trait AffordabilityRegressor: Send + Sync {
    fn regress(&self, features: &FeatureVector) -> Result<f64, ModelError>;
}

/// Failure while producing a prediction from a loaded artifact.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("model '{model}' failed to predict: {reason}")]
    Prediction { model: String, reason: String },
}

/// Both artifacts, loaded once at startup and shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct LoadedModels {
    pub classifier: Arc<JsonClassifier>,
    pub regressor: Arc<JsonRegressor>,
}

pub fn load_models(config: &ModelConfig) -> Result<LoadedModels, ModelLoadError> {
    let classifier = JsonClassifier::from_path(&config.classifier_path)?;
    info!(
        model = classifier.name(),
        path = %config.classifier_path.display(),
        classes = ?classifier.classes(),
        "eligibility classifier loaded"
    );

    let regressor = JsonRegressor::from_path(&config.regressor_path)?;
    info!(
        model = regressor.name(),
        path = %config.regressor_path.display(),
        "affordability regressor loaded"
    );

    Ok(LoadedModels {
        classifier: Arc::new(classifier),
        regressor: Arc::new(regressor),
    })
}
