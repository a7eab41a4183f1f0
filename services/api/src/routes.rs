use crate::infra::{AppState, AssessmentService};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use emi_predictor::eligibility::{assessment_router, BatchRow};
use emi_predictor::error::AppError;
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_operational_routes(service: Arc<AssessmentService>) -> axum::Router {
    assessment_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route("/api/v1/emi/batch", axum::routing::post(batch_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Accepts a CSV body whose header row names the application fields.
pub(crate) async fn batch_endpoint(
    Extension(state): Extension<AppState>,
    body: String,
) -> Result<Json<Vec<BatchRow>>, AppError> {
    let rows = state.service.assess_csv(body.as_bytes())?;
    Ok(Json(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use emi_predictor::eligibility::models::{ArtifactDocument, Estimator};
    use emi_predictor::eligibility::{
        EmiAssessmentService, JsonClassifier, JsonRegressor, FEATURE_COUNT, FEATURE_SCHEMA,
    };
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tower::ServiceExt;

    fn linear(classes: Option<Vec<i64>>, intercepts: Vec<f64>) -> ArtifactDocument {
        ArtifactDocument {
            name: None,
            feature_names: FEATURE_SCHEMA.iter().map(|name| name.to_string()).collect(),
            classes,
            estimator: Estimator::Linear {
                coefficients: vec![vec![0.0; FEATURE_COUNT]; intercepts.len()],
                intercepts,
            },
        }
    }

    fn sample_state(ready: bool) -> AppState {
        let origin = Path::new("routes-test.json");
        let classifier =
            JsonClassifier::from_document(linear(Some(vec![0, 1, 2]), vec![1.0, 0.0, 0.0]), origin)
                .expect("classifier artifact");
        let regressor = JsonRegressor::from_document(linear(None, vec![6_400.0]), origin)
            .expect("regressor artifact");

        AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
            service: Arc::new(EmiAssessmentService::new(
                Arc::new(classifier),
                Arc::new(regressor),
            )),
        }
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let Json(body) = healthcheck().await;
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn readiness_tracks_the_startup_flag() {
        let state = sample_state(false);
        let response = readiness_endpoint(Extension(state.clone()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        state.readiness.store(true, Ordering::Release);
        let response = readiness_endpoint(Extension(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn batch_endpoint_scores_each_row() {
        let csv = "age,monthly_salary,emi_scenario\n30,50000,Vehicle Emi\n45,90000,Car Loan Emi\n";

        let Json(rows) = batch_endpoint(Extension(sample_state(true)), csv.to_string())
            .await
            .expect("batch runs");

        assert_eq!(rows.len(), 2);
        let first = rows[0].assessment.as_ref().expect("first row assessed");
        assert_eq!(first.decision, "eligible");
        assert_eq!(first.emi_amount, Some(6_400.0));
        assert!(rows[1].error.is_some());
    }

    #[tokio::test]
    async fn ragged_batch_is_a_bad_request() {
        let result = batch_endpoint(
            Extension(sample_state(true)),
            "age,monthly_salary\n30\n".to_string(),
        )
        .await;

        let response = result.expect_err("ragged csv").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn assessment_routes_are_mounted_alongside_operational_ones() {
        let state = sample_state(true);
        let app = with_operational_routes(state.service.clone()).layer(Extension(state));

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/emi/assessments")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .expect("request builds");
        let response = app.clone().oneshot(request).await.expect("route responds");
        assert_eq!(response.status(), StatusCode::OK);

        let request = Request::builder()
            .uri("/ready")
            .body(Body::empty())
            .expect("request builds");
        let response = app.oneshot(request).await.expect("route responds");
        assert_eq!(response.status(), StatusCode::OK);
    }
}
