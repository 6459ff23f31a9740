use core_types::{
    Cycle, FeedingLog, HarvestRecord, MortalityRecord, Pond, ProductionCost, RevenueRecord,
    StockingRecord, WaterQualityLog,
};
use rust_decimal::Decimal;

/// Everything recorded against a single cycle, plus the pond it runs in.
///
/// `harvest_records` must be in insertion order: the last element is treated
/// as the most recent harvest.
#[derive(Debug, Clone)]
pub struct CycleRecords {
    pub cycle: Cycle,
    pub pond: Pond,
    pub stocking_records: Vec<StockingRecord>,
    pub mortality_records: Vec<MortalityRecord>,
    pub feeding_logs: Vec<FeedingLog>,
    pub harvest_records: Vec<HarvestRecord>,
    pub production_costs: Vec<ProductionCost>,
    pub revenue_records: Vec<RevenueRecord>,
}

/// Counts and store-side aggregates for the farm-wide (or global) dashboard.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardAggregates {
    pub total_ponds: i64,
    pub active_ponds: i64,
    pub active_cycles: i64,
    pub completed_cycles: i64,
    /// Sum of `total_weight` over all harvest records in scope.
    pub harvested_weight: Decimal,
    /// Mean of the recorded harvest `survival_rate`; `None` when there are no harvests.
    pub average_survival_rate: Option<Decimal>,
    /// Sum of feed quantity over the feeding logs of completed cycles only.
    pub completed_cycle_feed: Decimal,
    pub production_costs: Decimal,
    pub operational_costs: Decimal,
    pub revenue: Decimal,
}

/// The records of a pond's active cycle needed for the overview.
#[derive(Debug, Clone)]
pub struct ActiveCycle {
    pub cycle: Cycle,
    pub stocking_records: Vec<StockingRecord>,
    pub mortality_records: Vec<MortalityRecord>,
}

#[derive(Debug, Clone)]
pub struct PondSnapshot {
    pub pond: Pond,
    pub active_cycle: Option<ActiveCycle>,
    pub latest_water_quality: Option<WaterQualityLog>,
}
