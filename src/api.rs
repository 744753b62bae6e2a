use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tracing::error;

use crate::auth::{CurrentUser, JwtKeys};
use crate::config::AppConfig;
use crate::db::DbHandle;
use crate::errors::{AuthError, CopilotError};
use crate::report::dashboard::{
    self, DEFAULT_LATEST_SALES, DEFAULT_TOP_CHANNELS, DEFAULT_TOP_PRODUCTS, MonthPeriod,
};
use crate::report::excel::XLSX_CONTENT_TYPE;
use crate::report::models::{
    AverageBenefit, LatestSale, RevenueObjectives, RevenuePoint, TopChannel, TopProduct,
};
use crate::report::{DateRange, ReportBuilder, ReportFormat, StatsFilter, StatsParams};
use crate::widget::{QueryDescriptor, QueryEnvelope, QueryTranslator, Whitelist};

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub db: DbHandle,
    pub translator: QueryTranslator,
    pub reports: ReportBuilder,
    pub jwt: JwtKeys,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(db: DbHandle, config: &AppConfig) -> Self {
        Self {
            db,
            translator: QueryTranslator::new(Whitelist::default(), config.widget.max_in_values),
            reports: ReportBuilder::new(config.report.top_n),
            jwt: JwtKeys::new(&config.auth.jwt_secret, config.auth.token_ttl_secs),
        }
    }
}

// ── Request payload types ─────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ReportParams {
    pub date1: Option<String>,
    pub date2: Option<String>,
    pub format: Option<String>,
}

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken => ApiError::Unauthorized(err.to_string()),
            AuthError::Issue(_) | AuthError::LifetimeOverflow { .. } => {
                error!(error = %err, "Token issuing failed");
                ApiError::Internal("Internal server error".into())
            }
            _ => ApiError::Unauthorized("Invalid or expired token".into()),
        }
    }
}

impl From<CopilotError> for ApiError {
    fn from(err: CopilotError) -> Self {
        match err {
            CopilotError::Auth(e) => e.into(),
            err if err.is_client_error() => ApiError::BadRequest(err.to_string()),
            err => {
                error!(error = ?err, "Request failed");
                ApiError::Internal("Internal server error".into())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/api/widgets/query", post(query_widget))
        .route("/api/rapport-data", get(rapport_data))
        .route("/api/stats/revenue-chart", get(revenue_chart))
        .route("/api/stats/top-products", get(top_products))
        .route("/api/stats/top-channels", get(top_channels))
        .route("/api/stats/average-benefit", get(average_benefit))
        .route("/api/stats/latest-sales", get(latest_sales))
        .route("/api/stats/revenue-objectives", get(revenue_objectives))
        .route("/health", get(health_check))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> &'static str {
    "ok"
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound("Not found".into())
}

async fn query_widget(
    State(state): State<SharedState>,
    user: CurrentUser,
    payload: Result<Json<QueryDescriptor>, JsonRejection>,
) -> Result<Json<QueryEnvelope>, ApiError> {
    let Json(descriptor) = payload?;
    let envelope = state
        .translator
        .execute(&state.db, descriptor, user.id)
        .await?;
    Ok(Json(envelope))
}

async fn rapport_data(
    State(state): State<SharedState>,
    user: CurrentUser,
    params: Result<Query<ReportParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = params?;
    let range = DateRange::parse(params.date1.as_deref(), params.date2.as_deref())
        .map_err(CopilotError::from)?;
    let format = ReportFormat::from_param(params.format.as_deref()).map_err(CopilotError::from)?;

    match format {
        ReportFormat::Json => {
            let report = state.reports.build(&state.db, user.id, range).await?;
            Ok(Json(report).into_response())
        }
        ReportFormat::Excel => {
            let bytes = state
                .reports
                .build_workbook(&state.db, user.id, range)
                .await?;
            let headers = [
                (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", range.export_filename()),
                ),
                (
                    header::CACHE_CONTROL,
                    "no-cache, no-store, must-revalidate".to_string(),
                ),
                (header::PRAGMA, "no-cache".to_string()),
                (header::EXPIRES, "0".to_string()),
            ];
            Ok((headers, bytes).into_response())
        }
    }
}

async fn revenue_chart(
    State(state): State<SharedState>,
    user: CurrentUser,
    params: Result<Query<StatsParams>, QueryRejection>,
) -> Result<Json<Vec<RevenuePoint>>, ApiError> {
    let Query(params) = params?;
    let points = dashboard::revenue_chart(&state.db, user.id, params.year).await?;
    Ok(Json(points))
}

async fn top_products(
    State(state): State<SharedState>,
    user: CurrentUser,
    params: Result<Query<StatsParams>, QueryRejection>,
) -> Result<Json<Vec<TopProduct>>, ApiError> {
    let Query(params) = params?;
    let filter =
        StatsFilter::from_params(&params, DEFAULT_TOP_PRODUCTS).map_err(CopilotError::from)?;
    Ok(Json(dashboard::top_products(&state.db, user.id, filter).await?))
}

async fn top_channels(
    State(state): State<SharedState>,
    user: CurrentUser,
    params: Result<Query<StatsParams>, QueryRejection>,
) -> Result<Json<Vec<TopChannel>>, ApiError> {
    let Query(params) = params?;
    let filter =
        StatsFilter::from_params(&params, DEFAULT_TOP_CHANNELS).map_err(CopilotError::from)?;
    Ok(Json(dashboard::top_channels(&state.db, user.id, filter).await?))
}

async fn average_benefit(
    State(state): State<SharedState>,
    user: CurrentUser,
    params: Result<Query<StatsParams>, QueryRejection>,
) -> Result<Json<AverageBenefit>, ApiError> {
    let Query(params) = params?;
    let today = chrono::Utc::now().date_naive();
    let period = MonthPeriod::from_params(&params, today).map_err(CopilotError::from)?;
    Ok(Json(dashboard::average_benefit(&state.db, user.id, period).await?))
}

async fn latest_sales(
    State(state): State<SharedState>,
    user: CurrentUser,
    params: Result<Query<StatsParams>, QueryRejection>,
) -> Result<Json<Vec<LatestSale>>, ApiError> {
    let Query(params) = params?;
    let filter =
        StatsFilter::from_params(&params, DEFAULT_LATEST_SALES).map_err(CopilotError::from)?;
    Ok(Json(dashboard::latest_sales(&state.db, user.id, filter.limit).await?))
}

async fn revenue_objectives(
    State(state): State<SharedState>,
    user: CurrentUser,
    params: Result<Query<StatsParams>, QueryRejection>,
) -> Result<Json<RevenueObjectives>, ApiError> {
    let Query(params) = params?;
    let filter = StatsFilter::from_params(&params, 1).map_err(CopilotError::from)?;
    Ok(Json(dashboard::revenue_objectives(&state.db, user.id, filter).await?))
}

// ── Tests ─────────────────────────────────────────────────────────────
