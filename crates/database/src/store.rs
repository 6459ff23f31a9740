use crate::error::DbError;
use crate::filter::{Entity, QueryFilter};
use async_trait::async_trait;
use core_types::{
    Cycle, FeedingLog, HarvestRecord, MortalityRecord, OperationalCost, Pond, ProductionCost,
    RevenueRecord, StockingRecord, WaterQualityLog,
};
use rust_decimal::Decimal;
use uuid::Uuid;

/// A numeric column that can be summed or averaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    StockedQuantity,
    MortalityCount,
    FeedQuantity,
    HarvestWeight,
    HarvestRevenue,
    HarvestSurvivalRate,
    HarvestAverageWeight,
    ProductionCostAmount,
    RevenueAmount,
    OperationalCostAmount,
}

impl Measure {
    pub fn entity(&self) -> Entity {
        match self {
            Measure::StockedQuantity => Entity::StockingRecord,
            Measure::MortalityCount => Entity::MortalityRecord,
            Measure::FeedQuantity => Entity::FeedingLog,
            Measure::HarvestWeight
            | Measure::HarvestRevenue
            | Measure::HarvestSurvivalRate
            | Measure::HarvestAverageWeight => Entity::HarvestRecord,
            Measure::ProductionCostAmount => Entity::ProductionCost,
            Measure::RevenueAmount => Entity::RevenueRecord,
            Measure::OperationalCostAmount => Entity::OperationalCost,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            Measure::StockedQuantity | Measure::FeedQuantity => "quantity",
            Measure::MortalityCount => "count",
            Measure::HarvestWeight => "total_weight",
            Measure::HarvestRevenue => "total_revenue",
            Measure::HarvestSurvivalRate => "survival_rate",
            Measure::HarvestAverageWeight => "average_weight",
            Measure::ProductionCostAmount
            | Measure::RevenueAmount
            | Measure::OperationalCostAmount => "amount",
        }
    }
}

/// The queryable entity store the KPI layer reads from.
///
/// Every list operation returns an empty `Vec` for an empty result, and
/// `sum` returns zero, so callers never have to special-case missing data.
/// Implementations reject filters the target entity does not support with
/// `DbError::UnsupportedFilter`.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn count(&self, entity: Entity, filter: &QueryFilter) -> Result<i64, DbError>;

    async fn sum(&self, measure: Measure, filter: &QueryFilter) -> Result<Decimal, DbError>;

    /// `None` when no row matches.
    async fn average(&self, measure: Measure, filter: &QueryFilter)
        -> Result<Option<Decimal>, DbError>;

    async fn find_pond(&self, id: Uuid) -> Result<Option<Pond>, DbError>;

    async fn find_cycle(&self, id: Uuid) -> Result<Option<Cycle>, DbError>;

    /// Ordered by pond code, ascending.
    async fn list_ponds(&self, filter: &QueryFilter) -> Result<Vec<Pond>, DbError>;

    /// Ordered by start date, newest first; cycles without a start date come first.
    async fn list_cycles(&self, filter: &QueryFilter) -> Result<Vec<Cycle>, DbError>;

    async fn list_stocking_records(&self, filter: &QueryFilter)
        -> Result<Vec<StockingRecord>, DbError>;

    async fn list_mortality_records(&self, filter: &QueryFilter)
        -> Result<Vec<MortalityRecord>, DbError>;

    async fn list_feeding_logs(&self, filter: &QueryFilter) -> Result<Vec<FeedingLog>, DbError>;

    /// Ordered by insertion: the last element is the most recently added harvest.
    async fn list_harvest_records(&self, filter: &QueryFilter)
        -> Result<Vec<HarvestRecord>, DbError>;

    async fn list_production_costs(&self, filter: &QueryFilter)
        -> Result<Vec<ProductionCost>, DbError>;

    async fn list_revenue_records(&self, filter: &QueryFilter)
        -> Result<Vec<RevenueRecord>, DbError>;

    async fn list_operational_costs(&self, filter: &QueryFilter)
        -> Result<Vec<OperationalCost>, DbError>;

    /// Ordered by sample date, newest first.
    async fn list_water_quality_logs(&self, filter: &QueryFilter)
        -> Result<Vec<WaterQualityLog>, DbError>;

    async fn latest_water_quality(&self, pond_id: Uuid)
        -> Result<Option<WaterQualityLog>, DbError>;
}
