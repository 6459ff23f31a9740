use analytics::KpiEngine;
use axum::{http::HeaderValue, routing::get, Router};
use configuration::ServerSettings;
use database::EntityStore;
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

pub mod error;
pub mod handlers;
pub mod kpi;

pub use error::{AppError, KpiError};

/// The shared application state that all handlers can access.
pub struct AppState {
    pub store: Arc<dyn EntityStore>,
    pub engine: KpiEngine,
}

impl AppState {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self {
            store,
            engine: KpiEngine::new(),
        }
    }
}

/// Builds the CORS layer from the configured origins. Origins that are not
/// valid header values are skipped with a warning.
pub fn cors_layer(settings: &ServerSettings) -> CorsLayer {
    let origin = if settings.allows_any_origin() {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = settings
            .cors_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(%origin, "Ignoring invalid CORS origin.");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(AllowHeaders::any())
}

/// The full application: every route is mounted under `/api/v1`.
pub fn router(state: Arc<AppState>, settings: &ServerSettings) -> Router {
    let api = Router::new()
        .route("/health", get(handlers::health))
        .route("/kpi/dashboard", get(handlers::get_dashboard_kpi))
        .route("/kpi/cycle/:id", get(handlers::get_cycle_kpi))
        .route("/kpi/ponds-overview", get(handlers::get_ponds_overview))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api)
        .layer(cors_layer(settings))
        // Logs every incoming request.
        .layer(TraceLayer::new_for_http())
}

/// Binds the configured address and serves until the process is stopped.
pub async fn run_server(
    settings: &ServerSettings,
    store: Arc<dyn EntityStore>,
) -> anyhow::Result<()> {
    let app = router(Arc::new(AppState::new(store)), settings);

    let listener = tokio::net::TcpListener::bind((settings.host.as_str(), settings.port)).await?;
    tracing::info!("Web server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use chrono::{DateTime, Duration, Utc};
    use core_types::{
        Cycle, CycleStatus, Farm, FeedingLog, HarvestRecord, MortalityRecord, OperationalCost,
        Pond, PondStatus, ProductionCost, RevenueRecord, StockingRecord, WaterQualityLog,
    };
    use database::{DbError, Entity, Measure, MemoryStore, QueryFilter, Row};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use serde_json::Value;
    use tower::ServiceExt;
    use uuid::Uuid;

    struct Seed {
        store: MemoryStore,
        laguna: Uuid,
        costa: Uuid,
        seed_cycle: Uuid,
    }

    fn farm(name: &str) -> Farm {
        Farm {
            id: Uuid::new_v4(),
            name: name.to_string(),
            location: None,
            created_at: Utc::now(),
        }
    }

    fn pond(farm: &Farm, code: &str, area: Decimal, status: PondStatus) -> Pond {
        Pond {
            id: Uuid::new_v4(),
            farm_id: farm.id,
            code: code.to_string(),
            name: format!("Pond {code}"),
            area,
            status,
            created_at: Utc::now(),
        }
    }

    /// Started just under `days` days ago, so the day count is exactly `days`.
    fn cycle(pond: &Pond, name: &str, status: CycleStatus, days: i64) -> Cycle {
        Cycle {
            id: Uuid::new_v4(),
            pond_id: pond.id,
            name: name.to_string(),
            status,
            start_date: Some(Utc::now() - Duration::days(days) + Duration::hours(1)),
            actual_end_date: None,
            target_weight: Some(dec!(25)),
            created_at: Utc::now(),
        }
    }

    fn stocking(cycle: &Cycle, quantity: i64) -> StockingRecord {
        StockingRecord {
            id: Uuid::new_v4(),
            cycle_id: cycle.id,
            date: Utc::now(),
            quantity,
            average_weight: None,
        }
    }

    fn mortality(cycle: &Cycle, count: i64) -> MortalityRecord {
        MortalityRecord {
            id: Uuid::new_v4(),
            cycle_id: cycle.id,
            date: Utc::now(),
            count,
            cause: None,
        }
    }

    fn feeding(cycle: &Cycle, quantity: Decimal) -> FeedingLog {
        FeedingLog {
            id: Uuid::new_v4(),
            cycle_id: cycle.id,
            pond_id: cycle.pond_id,
            date: Utc::now(),
            feed_type: None,
            quantity,
        }
    }

    fn harvest(cycle: &Cycle, total_weight: Decimal, survival_rate: Decimal) -> HarvestRecord {
        HarvestRecord {
            id: Uuid::new_v4(),
            cycle_id: cycle.id,
            date: Utc::now(),
            quantity: 569_400,
            total_weight,
            average_weight: dec!(25.27),
            survival_rate,
            total_revenue: dec!(0),
            created_at: Utc::now(),
        }
    }

    fn water(pond: &Pond, date: DateTime<Utc>, temperature: Decimal, ph: Option<Decimal>) -> WaterQualityLog {
        WaterQualityLog {
            id: Uuid::new_v4(),
            pond_id: pond.id,
            date,
            temperature: Some(temperature),
            ph,
            dissolved_oxygen: Some(dec!(6.1)),
        }
    }

    /// Laguna holds the completed seed cycle; Costa holds one growing cycle.
    fn seed() -> Seed {
        let laguna = farm("Laguna");
        let costa = farm("Costa");
        let p01 = pond(&laguna, "P-01", dec!(5.2), PondStatus::Active);
        let p00 = pond(&laguna, "P-00", dec!(3), PondStatus::Preparing);
        let b01 = pond(&costa, "B-01", dec!(4), PondStatus::Active);
        let completed = cycle(&p01, "Cycle 2024-A", CycleStatus::Completed, 30);
        let growing = cycle(&b01, "Cycle 2024-B", CycleStatus::Growing, 10);

        let mut rows: Vec<Row> = vec![
            laguna.clone().into(),
            costa.clone().into(),
            p01.clone().into(),
            p00.clone().into(),
            b01.clone().into(),
            completed.clone().into(),
            growing.clone().into(),
            stocking(&completed, 720_000).into(),
            mortality(&completed, 1_500).into(),
            mortality(&completed, 1_300).into(),
            harvest(&completed, dec!(41962), dec!(73)).into(),
            stocking(&growing, 1_000).into(),
            mortality(&growing, 100).into(),
            harvest(&growing, dec!(10000), dec!(90)).into(),
            water(&b01, Utc::now() - Duration::days(2), dec!(28.1), Some(dec!(7.9))).into(),
            water(&b01, Utc::now() - Duration::days(1), dec!(29.4), None).into(),
        ];
        for d in 0..14 {
            rows.push(feeding(&completed, Decimal::from(80 + 5 * d)).into());
            rows.push(feeding(&completed, Decimal::from(60 + 3 * d)).into());
        }

        Seed {
            store: MemoryStore::with_rows(rows).unwrap(),
            laguna: laguna.id,
            costa: costa.id,
            seed_cycle: completed.id,
        }
    }

    fn app(store: impl EntityStore + 'static) -> Router {
        router(
            Arc::new(AppState::new(Arc::new(store))),
            &ServerSettings::default(),
        )
    }

    async fn fetch(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn number(value: &Value, field: &str) -> f64 {
        value[field]
            .as_f64()
            .unwrap_or_else(|| panic!("{field} is not a number: {value}"))
    }

    fn close(value: &Value, field: &str, expected: f64) {
        let actual = number(value, field);
        assert!(
            (actual - expected).abs() < 1e-9,
            "{field}: expected {expected}, got {actual}"
        );
    }

    #[tokio::test]
    async fn health_reports_the_service() {
        let (status, body) = fetch(app(MemoryStore::new()), "/api/v1/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "aquaops-api");
        assert!(body["timestamp"].as_str().is_some());
    }

    #[tokio::test]
    async fn seed_cycle_kpis() {
        let s = seed();
        let uri = format!("/api/v1/kpi/cycle/{}", s.seed_cycle);
        let (status, body) = fetch(app(s.store), &uri).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        let data = &body["data"];
        assert_eq!(data["cycleId"], s.seed_cycle.to_string());
        assert_eq!(data["cycleName"], "Cycle 2024-A");
        assert_eq!(data["pondName"], "Pond P-01");
        assert_eq!(data["daysInCycle"], 30);
        close(data, "survivalRate", 99.61);
        close(data, "fcr", 0.06);
        close(data, "biomass", 41962.0);
        close(data, "currentWeight", 25.27);
    }

    #[tokio::test]
    async fn unknown_cycle_is_not_found() {
        let uri = format!("/api/v1/kpi/cycle/{}", Uuid::new_v4());
        let (status, body) = fetch(app(seed().store), &uri).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, serde_json::json!({ "success": false, "error": "Cycle not found" }));
    }

    #[tokio::test]
    async fn malformed_ids_are_bad_requests() {
        let (status, body) = fetch(app(MemoryStore::new()), "/api/v1/kpi/cycle/not-a-uuid").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let (status, body) =
            fetch(app(MemoryStore::new()), "/api/v1/kpi/dashboard?farmId=42").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid farmId: 42");
    }

    #[tokio::test]
    async fn dashboard_for_one_farm() {
        let s = seed();
        let uri = format!("/api/v1/kpi/dashboard?farmId={}", s.laguna);
        let (status, body) = fetch(app(s.store), &uri).await;

        assert_eq!(status, StatusCode::OK);
        let data = &body["data"];
        assert_eq!(data["totalPonds"], 2);
        assert_eq!(data["activePonds"], 1);
        assert_eq!(data["activeCycles"], 0);
        assert_eq!(data["completedCycles"], 1);
        close(data, "totalBiomass", 41962.0);
        close(data, "averageSurvivalRate", 73.0);
        close(data, "averageFCR", 0.06);
    }

    #[tokio::test]
    async fn dashboard_without_farm_covers_everything() {
        let s = seed();
        let (_, all) = fetch(app(s.store), "/api/v1/kpi/dashboard").await;
        let (_, blank) = fetch(app(seed().store), "/api/v1/kpi/dashboard?farmId=").await;

        for body in [&all, &blank] {
            let data = &body["data"];
            assert_eq!(data["totalPonds"], 3);
            assert_eq!(data["activePonds"], 2);
            assert_eq!(data["activeCycles"], 1);
            assert_eq!(data["completedCycles"], 1);
            close(data, "totalBiomass", 51962.0);
            close(data, "averageSurvivalRate", 81.5);
            // Completed-cycle feed over every harvest, growing cycles included.
            close(data, "averageFCR", 0.05);
        }
    }

    #[tokio::test]
    async fn ponds_overview_is_ordered_by_code() {
        let s = seed();
        let uri = format!("/api/v1/kpi/ponds-overview?farmId={}", s.laguna);
        let (status, body) = fetch(app(s.store), &uri).await;

        assert_eq!(status, StatusCode::OK);
        let ponds = body["data"].as_array().unwrap();
        let codes: Vec<&str> = ponds.iter().map(|p| p["code"].as_str().unwrap()).collect();
        assert_eq!(codes, ["P-00", "P-01"]);
        // A completed cycle is not an active one.
        for pond in ponds {
            assert!(pond["activeCycleName"].is_null());
            assert_eq!(pond["daysInCycle"], 0);
            assert!(pond["lastTemperature"].is_null());
        }
    }

    #[tokio::test]
    async fn ponds_overview_reports_the_active_cycle_and_latest_reading() {
        let s = seed();
        let uri = format!("/api/v1/kpi/ponds-overview?farmId={}", s.costa);
        let (_, body) = fetch(app(s.store), &uri).await;

        let pond = &body["data"][0];
        assert_eq!(pond["code"], "B-01");
        assert_eq!(pond["status"], "ACTIVE");
        assert_eq!(pond["activeCycleName"], "Cycle 2024-B");
        assert_eq!(pond["daysInCycle"], 10);
        close(pond, "survivalRate", 90.0);
        close(pond, "lastTemperature", 29.4);
        assert!(pond["lastPh"].is_null());
        close(pond, "lastDO", 6.1);
    }

    /// A store whose backend is always down.
    struct Unavailable;

    fn down<T>() -> Result<T, DbError> {
        Err(DbError::ConnectionConfigError("store unavailable".to_string()))
    }

    #[async_trait]
    impl EntityStore for Unavailable {
        async fn count(&self, _: Entity, _: &QueryFilter) -> Result<i64, DbError> {
            down()
        }
        async fn sum(&self, _: Measure, _: &QueryFilter) -> Result<Decimal, DbError> {
            down()
        }
        async fn average(&self, _: Measure, _: &QueryFilter) -> Result<Option<Decimal>, DbError> {
            down()
        }
        async fn find_pond(&self, _: Uuid) -> Result<Option<Pond>, DbError> {
            down()
        }
        async fn find_cycle(&self, _: Uuid) -> Result<Option<Cycle>, DbError> {
            down()
        }
        async fn list_ponds(&self, _: &QueryFilter) -> Result<Vec<Pond>, DbError> {
            down()
        }
        async fn list_cycles(&self, _: &QueryFilter) -> Result<Vec<Cycle>, DbError> {
            down()
        }
        async fn list_stocking_records(&self, _: &QueryFilter) -> Result<Vec<StockingRecord>, DbError> {
            down()
        }
        async fn list_mortality_records(&self, _: &QueryFilter) -> Result<Vec<MortalityRecord>, DbError> {
            down()
        }
        async fn list_feeding_logs(&self, _: &QueryFilter) -> Result<Vec<FeedingLog>, DbError> {
            down()
        }
        async fn list_harvest_records(&self, _: &QueryFilter) -> Result<Vec<HarvestRecord>, DbError> {
            down()
        }
        async fn list_production_costs(&self, _: &QueryFilter) -> Result<Vec<ProductionCost>, DbError> {
            down()
        }
        async fn list_revenue_records(&self, _: &QueryFilter) -> Result<Vec<RevenueRecord>, DbError> {
            down()
        }
        async fn list_operational_costs(&self, _: &QueryFilter) -> Result<Vec<OperationalCost>, DbError> {
            down()
        }
        async fn list_water_quality_logs(&self, _: &QueryFilter) -> Result<Vec<WaterQualityLog>, DbError> {
            down()
        }
        async fn latest_water_quality(&self, _: Uuid) -> Result<Option<WaterQualityLog>, DbError> {
            down()
        }
    }

    #[tokio::test]
    async fn store_failures_become_generic_500s() {
        let cases = [
            ("/api/v1/kpi/dashboard", "Failed to compute dashboard KPIs"),
            ("/api/v1/kpi/ponds-overview", "Failed to compute ponds overview"),
        ];
        for (uri, message) in cases {
            let (status, body) = fetch(app(Unavailable), uri).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(body, serde_json::json!({ "success": false, "error": message }));
        }

        let uri = format!("/api/v1/kpi/cycle/{}", Uuid::new_v4());
        let (status, body) = fetch(app(Unavailable), &uri).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to compute cycle KPIs");
    }
}
