use crate::infra::{AppState, CohortLocks};
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use gradebook::bulletins::{
    BulletinGenerator, ClassStatistics, GenerationError, GenerationReport, GenerationRequest,
    ReportCard, ReportCardDetail, ReportCardId, ReportCardStore, ScoreSource,
};
use gradebook::error::AppError;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Shared handler state: the generator plus the caller-side cohort locks.
pub(crate) struct BulletinState<S, R> {
    pub(crate) generator: Arc<BulletinGenerator<S, R>>,
    pub(crate) locks: Arc<CohortLocks>,
}

impl<S, R> Clone for BulletinState<S, R> {
    fn clone(&self) -> Self {
        Self {
            generator: self.generator.clone(),
            locks: self.locks.clone(),
        }
    }
}

impl<S, R> BulletinState<S, R> {
    pub(crate) fn new(generator: BulletinGenerator<S, R>) -> Self {
        Self {
            generator: Arc::new(generator),
            locks: Arc::new(CohortLocks::default()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CohortQuery {
    pub(crate) term: u8,
    pub(crate) school_year: String,
}

impl CohortQuery {
    fn into_request(self, class_id: String) -> GenerationRequest {
        GenerationRequest::new(class_id, self.term, self.school_year)
    }
}

pub(crate) fn bulletin_router<S, R>(state: BulletinState<S, R>) -> Router
where
    S: ScoreSource + 'static,
    R: ReportCardStore + 'static,
{
    Router::new()
        .route("/api/v1/bulletins/generate", post(generate_handler::<S, R>))
        .route(
            "/api/v1/bulletins/:report_card_id",
            get(detail_handler::<S, R>),
        )
        .route(
            "/api/v1/classes/:class_id/statistics",
            get(statistics_handler::<S, R>),
        )
        .route(
            "/api/v1/classes/:class_id/bulletins",
            get(cohort_handler::<S, R>),
        )
        .with_state(state)
}

pub(crate) fn with_service_routes<S, R>(state: BulletinState<S, R>) -> Router
where
    S: ScoreSource + 'static,
    R: ReportCardStore + 'static,
{
    bulletin_router(state)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn generate_handler<S, R>(
    State(state): State<BulletinState<S, R>>,
    Json(request): Json<GenerationRequest>,
) -> Result<(StatusCode, Json<GenerationReport>), AppError>
where
    S: ScoreSource + 'static,
    R: ReportCardStore + 'static,
{
    let key = request.cohort_key().map_err(GenerationError::from)?;
    let _cohort_guard = state.locks.acquire(&key).await;

    let report = state.generator.generate(&request)?;
    let status = if report.created.is_empty() {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(report)))
}

pub(crate) async fn detail_handler<S, R>(
    State(state): State<BulletinState<S, R>>,
    Path(report_card_id): Path<String>,
) -> Result<Json<ReportCardDetail>, AppError>
where
    S: ScoreSource + 'static,
    R: ReportCardStore + 'static,
{
    let detail = state.generator.detail(&ReportCardId(report_card_id))?;
    Ok(Json(detail))
}

pub(crate) async fn statistics_handler<S, R>(
    State(state): State<BulletinState<S, R>>,
    Path(class_id): Path<String>,
    Query(query): Query<CohortQuery>,
) -> Result<Json<ClassStatistics>, AppError>
where
    S: ScoreSource + 'static,
    R: ReportCardStore + 'static,
{
    let stats = state
        .generator
        .class_statistics(&query.into_request(class_id))?;
    Ok(Json(stats))
}

pub(crate) async fn cohort_handler<S, R>(
    State(state): State<BulletinState<S, R>>,
    Path(class_id): Path<String>,
    Query(query): Query<CohortQuery>,
) -> Result<Json<Vec<ReportCard>>, AppError>
where
    S: ScoreSource + 'static,
    R: ReportCardStore + 'static,
{
    let cards = state.generator.cohort(&query.into_request(class_id))?;
    Ok(Json(cards))
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
