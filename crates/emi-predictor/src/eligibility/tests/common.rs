use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::response::Response;
use serde_json::Value;

use crate::eligibility::features::{FeatureVector, FEATURE_COUNT, FEATURE_SCHEMA};
use crate::eligibility::models::{
    AffordabilityRegressor, ArtifactDocument, EligibilityClassifier, Estimator, ModelError,
};
use crate::eligibility::{assessment_router, EmiAssessmentService, RawApplication};

/// Classifier stub answering a fixed class and counting calls.
pub(super) struct StubClassifier {
    class: i64,
    calls: AtomicUsize,
}

impl StubClassifier {
    pub(super) fn answering(class: i64) -> Self {
        Self {
            class,
            calls: AtomicUsize::new(0),
        }
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EligibilityClassifier for StubClassifier {
    fn classify(&self, _features: &FeatureVector) -> Result<i64, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.class)
    }
}

/// Regressor stub answering a fixed amount and counting calls.
pub(super) struct StubRegressor {
    amount: f64,
    calls: AtomicUsize,
}

impl StubRegressor {
    pub(super) fn answering(amount: f64) -> Self {
        Self {
            amount,
            calls: AtomicUsize::new(0),
        }
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AffordabilityRegressor for StubRegressor {
    fn regress(&self, _features: &FeatureVector) -> Result<f64, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.amount)
    }
}

pub(super) struct FailingRegressor;

impl AffordabilityRegressor for FailingRegressor {
    fn regress(&self, _features: &FeatureVector) -> Result<f64, ModelError> {
        Err(ModelError::Prediction {
            model: "failing".to_string(),
            reason: "artifact offline".to_string(),
        })
    }
}

pub(super) type StubService = EmiAssessmentService<StubClassifier, StubRegressor>;

pub(super) fn build_service(
    class: i64,
    amount: f64,
) -> (StubService, Arc<StubClassifier>, Arc<StubRegressor>) {
    let classifier = Arc::new(StubClassifier::answering(class));
    let regressor = Arc::new(StubRegressor::answering(amount));
    let service = EmiAssessmentService::new(classifier.clone(), regressor.clone());
    (service, classifier, regressor)
}

pub(super) fn router_for(service: StubService) -> axum::Router {
    assessment_router(Arc::new(service))
}

/// The documented end-to-end scenario: form defaults with the headline figures spelled out.
pub(super) fn scenario_application() -> RawApplication {
    RawApplication {
        age: 30,
        monthly_salary: 50_000,
        current_emi_amount: 10_000,
        requested_amount: 200_000,
        bank_balance: 25_000,
        years_of_employment: 3.0,
        ..RawApplication::default()
    }
}

pub(super) fn schema_names() -> Vec<String> {
    FEATURE_SCHEMA.iter().map(|name| name.to_string()).collect()
}

pub(super) fn zero_row() -> Vec<f64> {
    vec![0.0; FEATURE_COUNT]
}

pub(super) fn feature_index(name: &str) -> usize {
    FEATURE_SCHEMA
        .iter()
        .position(|column| *column == name)
        .expect("column in schema")
}

pub(super) fn linear_document(
    classes: Option<Vec<i64>>,
    coefficients: Vec<Vec<f64>>,
    intercepts: Vec<f64>,
) -> ArtifactDocument {
    ArtifactDocument {
        name: Some("test-linear".to_string()),
        feature_names: schema_names(),
        classes,
        estimator: Estimator::Linear {
            coefficients,
            intercepts,
        },
    }
}

pub(super) fn origin() -> &'static Path {
    Path::new("memory://artifact.json")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-4,
        "expected {expected}, got {actual}"
    );
}
