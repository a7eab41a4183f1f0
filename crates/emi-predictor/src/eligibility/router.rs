use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tracing::error;

use super::domain::{
    CompanyType, Education, EmiScenario, EmploymentType, Gender, HouseType, MaritalStatus,
    RawApplication, NUMERIC_BOUNDS,
};
use super::features::FEATURE_SCHEMA;
use super::models::{AffordabilityRegressor, EligibilityClassifier};
use super::service::{AssessmentError, EmiAssessmentService};

/// Router builder exposing the assessment endpoints.
pub fn assessment_router<C, R>(service: Arc<EmiAssessmentService<C, R>>) -> Router
where
    C: EligibilityClassifier + 'static,
    R: AffordabilityRegressor + 'static,
{
    Router::new()
        .route("/api/v1/emi/assessments", post(assess_handler::<C, R>))
        .route("/api/v1/emi/features", post(features_handler::<C, R>))
        .route("/api/v1/emi/schema", get(schema_handler))
        .with_state(service)
}

pub(crate) async fn assess_handler<C, R>(
    State(service): State<Arc<EmiAssessmentService<C, R>>>,
    payload: Result<Json<RawApplication>, JsonRejection>,
) -> Response
where
    C: EligibilityClassifier + 'static,
    R: AffordabilityRegressor + 'static,
{
    let application = match payload {
        Ok(Json(application)) => application,
        Err(rejection) => return rejection_response(rejection),
    };

    match service.assess(&application) {
        Ok(assessment) => (StatusCode::OK, Json(assessment.view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn features_handler<C, R>(
    State(service): State<Arc<EmiAssessmentService<C, R>>>,
    payload: Result<Json<RawApplication>, JsonRejection>,
) -> Response
where
    C: EligibilityClassifier + 'static,
    R: AffordabilityRegressor + 'static,
{
    let application = match payload {
        Ok(Json(application)) => application,
        Err(rejection) => return rejection_response(rejection),
    };

    match service.encode(&application) {
        Ok(features) => (StatusCode::OK, Json(features.columns())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn schema_handler() -> Json<serde_json::Value> {
    Json(json!({
        "features": FEATURE_SCHEMA.as_slice(),
        "numeric_fields": NUMERIC_BOUNDS,
        "categorical_fields": {
            (Gender::FIELD): Gender::labels(),
            (MaritalStatus::FIELD): MaritalStatus::labels(),
            (Education::FIELD): Education::labels(),
            (EmploymentType::FIELD): EmploymentType::labels(),
            (CompanyType::FIELD): CompanyType::labels(),
            (HouseType::FIELD): HouseType::labels(),
            (EmiScenario::FIELD): EmiScenario::labels(),
        },
        "flags": ["existing_loans"],
        "defaults": RawApplication::default(),
    }))
}

fn rejection_response(rejection: JsonRejection) -> Response {
    let payload = json!({
        "error": format!("invalid input: {}", rejection.body_text()),
    });
    (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
}

fn error_response(err: AssessmentError) -> Response {
    match err {
        input @ (AssessmentError::InvalidInput(_) | AssessmentError::MalformedInput(_)) => {
            let payload = json!({
                "error": input.to_string(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
        }
        other => {
            error!(error = %other, "assessment failed");
            let payload = json!({
                "error": "assessment failed",
            });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}
