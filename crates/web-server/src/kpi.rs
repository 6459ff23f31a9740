//! Resolves a request scope into the record sets the `KpiEngine` needs.
//!
//! Each function issues its independent store queries concurrently and then
//! hands the fetched data to the engine. No report is cached; every call
//! reads a fresh snapshot.

use crate::error::KpiError;
use analytics::{
    ActiveCycle, CycleKpi, CycleRecords, DashboardAggregates, DashboardKpi, KpiEngine,
    PondSnapshot, PondSummary,
};
use chrono::{DateTime, Utc};
use core_types::{CycleStatus, Pond, PondStatus};
use database::{Entity, EntityStore, Filter, Measure, QueryFilter};
use futures_util::future::try_join_all;
use uuid::Uuid;

/// Farm-wide (or global, without `farm_id`) dashboard figures.
pub async fn dashboard(
    store: &dyn EntityStore,
    engine: &KpiEngine,
    farm_id: Option<Uuid>,
) -> Result<DashboardKpi, KpiError> {
    let scope = QueryFilter::for_farm(farm_id);
    let active_ponds = scope.clone().with(Filter::PondStatus(PondStatus::Active));
    let active_cycles = scope
        .clone()
        .with(Filter::CycleStatus(CycleStatus::ACTIVE.to_vec()));
    let completed_cycles = scope
        .clone()
        .with(Filter::CycleStatus(vec![CycleStatus::Completed]));

    let (total_ponds, active_ponds, active_cycles, completed_cycle_count) = tokio::try_join!(
        store.count(Entity::Pond, &scope),
        store.count(Entity::Pond, &active_ponds),
        store.count(Entity::Cycle, &active_cycles),
        store.count(Entity::Cycle, &completed_cycles),
    )?;

    let (harvested_weight, average_survival_rate, production_costs, operational_costs, revenue) =
        tokio::try_join!(
            store.sum(Measure::HarvestWeight, &scope),
            store.average(Measure::HarvestSurvivalRate, &scope),
            store.sum(Measure::ProductionCostAmount, &scope),
            store.sum(Measure::OperationalCostAmount, &scope),
            store.sum(Measure::RevenueAmount, &scope),
        )?;

    // Feed only counts towards the FCR once its cycle is completed.
    let completed_cycle_feed = store.sum(Measure::FeedQuantity, &completed_cycles).await?;

    let aggregates = DashboardAggregates {
        total_ponds,
        active_ponds,
        active_cycles,
        completed_cycles: completed_cycle_count,
        harvested_weight,
        average_survival_rate,
        completed_cycle_feed,
        production_costs,
        operational_costs,
        revenue,
    };
    Ok(engine.compute_dashboard_kpi(&aggregates)?)
}

/// The KPI sheet of one cycle, or `None` if no cycle has this id.
pub async fn cycle(
    store: &dyn EntityStore,
    engine: &KpiEngine,
    cycle_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Option<CycleKpi>, KpiError> {
    let Some(cycle) = store.find_cycle(cycle_id).await? else {
        return Ok(None);
    };
    let pond = store
        .find_pond(cycle.pond_id)
        .await?
        .ok_or(KpiError::OrphanCycle {
            cycle: cycle.id,
            pond: cycle.pond_id,
        })?;

    let scope = QueryFilter::new().with(Filter::Cycle(cycle.id));
    let (
        stocking_records,
        mortality_records,
        feeding_logs,
        harvest_records,
        production_costs,
        revenue_records,
    ) = tokio::try_join!(
        store.list_stocking_records(&scope),
        store.list_mortality_records(&scope),
        store.list_feeding_logs(&scope),
        store.list_harvest_records(&scope),
        store.list_production_costs(&scope),
        store.list_revenue_records(&scope),
    )?;

    let records = CycleRecords {
        cycle,
        pond,
        stocking_records,
        mortality_records,
        feeding_logs,
        harvest_records,
        production_costs,
        revenue_records,
    };
    Ok(Some(engine.compute_cycle_kpi(&records, now)?))
}

/// One summary per pond in scope, ordered by pond code.
pub async fn ponds_overview(
    store: &dyn EntityStore,
    engine: &KpiEngine,
    farm_id: Option<Uuid>,
    now: DateTime<Utc>,
) -> Result<Vec<PondSummary>, KpiError> {
    let ponds = store.list_ponds(&QueryFilter::for_farm(farm_id)).await?;
    tracing::debug!(count = ponds.len(), ?farm_id, "Building pond snapshots.");

    let snapshots = try_join_all(ponds.into_iter().map(|pond| snapshot(store, pond))).await?;
    Ok(engine.compute_ponds_overview(&snapshots, now)?)
}

async fn snapshot(store: &dyn EntityStore, pond: Pond) -> Result<PondSnapshot, KpiError> {
    let active = QueryFilter::new()
        .with(Filter::Pond(pond.id))
        .with(Filter::CycleStatus(CycleStatus::ACTIVE.to_vec()));
    let (cycles, latest_water_quality) = tokio::try_join!(
        store.list_cycles(&active),
        store.latest_water_quality(pond.id),
    )?;

    // Cycles come newest first, so the head is the active cycle.
    let active_cycle = match cycles.into_iter().next() {
        Some(cycle) => {
            let scope = QueryFilter::new().with(Filter::Cycle(cycle.id));
            let (stocking_records, mortality_records) = tokio::try_join!(
                store.list_stocking_records(&scope),
                store.list_mortality_records(&scope),
            )?;
            Some(ActiveCycle {
                cycle,
                stocking_records,
                mortality_records,
            })
        }
        None => None,
    };

    Ok(PondSnapshot {
        pond,
        active_cycle,
        latest_water_quality,
    })
}
