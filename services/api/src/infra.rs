use emi_predictor::config::ModelConfig;
use emi_predictor::eligibility::{load_models, EmiAssessmentService, JsonClassifier, JsonRegressor};
use emi_predictor::error::AppError;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Assessment service backed by the JSON artifacts on disk.
pub(crate) type AssessmentService = EmiAssessmentService<JsonClassifier, JsonRegressor>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) service: Arc<AssessmentService>,
}

/// Load both artifacts. A missing or malformed artifact is fatal to the caller.
pub(crate) fn build_service(config: &ModelConfig) -> Result<AssessmentService, AppError> {
    let models = load_models(config)?;
    Ok(EmiAssessmentService::new(models.classifier, models.regressor))
}
