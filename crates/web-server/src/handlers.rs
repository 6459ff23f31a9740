use crate::{error::AppError, kpi, AppState};
use analytics::{CycleKpi, DashboardKpi, PondSummary};
use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

pub const SERVICE_NAME: &str = "aquaops-api";

/// The `{ success: true, data }` envelope every KPI endpoint answers with.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}

/// The optional `?farmId=` query parameter. An empty value means "all farms".
#[derive(Debug, Deserialize)]
pub struct FarmScope {
    #[serde(rename = "farmId")]
    farm_id: Option<String>,
}

impl FarmScope {
    fn farm_id(&self) -> Result<Option<Uuid>, AppError> {
        match self.farm_id.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => Uuid::parse_str(raw)
                .map(Some)
                .map_err(|_| AppError::BadRequest(format!("Invalid farmId: {raw}"))),
        }
    }
}

/// # GET /api/v1/health
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
        "service": SERVICE_NAME,
    }))
}

/// # GET /api/v1/kpi/dashboard
pub async fn get_dashboard_kpi(
    State(state): State<Arc<AppState>>,
    query: Result<Query<FarmScope>, QueryRejection>,
) -> Result<Json<ApiResponse<DashboardKpi>>, AppError> {
    let Query(scope) = query?;
    let farm_id = scope.farm_id()?;
    let report = kpi::dashboard(state.store.as_ref(), &state.engine, farm_id)
        .await
        .map_err(AppError::internal("Failed to compute dashboard KPIs"))?;
    Ok(ApiResponse::ok(report))
}

/// # GET /api/v1/kpi/cycle/:id
pub async fn get_cycle_kpi(
    State(state): State<Arc<AppState>>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ApiResponse<CycleKpi>>, AppError> {
    let Path(cycle_id) = path?;
    let report = kpi::cycle(state.store.as_ref(), &state.engine, cycle_id, Utc::now())
        .await
        .map_err(AppError::internal("Failed to compute cycle KPIs"))?
        .ok_or_else(|| AppError::NotFound("Cycle not found".to_string()))?;
    Ok(ApiResponse::ok(report))
}

/// # GET /api/v1/kpi/ponds-overview
/// One row per pond with its active cycle and latest water reading.
pub async fn get_ponds_overview(
    State(state): State<Arc<AppState>>,
    query: Result<Query<FarmScope>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<PondSummary>>>, AppError> {
    let Query(scope) = query?;
    let farm_id = scope.farm_id()?;
    let ponds = kpi::ponds_overview(state.store.as_ref(), &state.engine, farm_id, Utc::now())
        .await
        .map_err(AppError::internal("Failed to compute ponds overview"))?;
    Ok(ApiResponse::ok(ponds))
}
