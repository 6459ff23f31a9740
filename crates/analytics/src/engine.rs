use crate::error::AnalyticsError;
use crate::inputs::{CycleRecords, DashboardAggregates, PondSnapshot};
use crate::report::{CycleKpi, DashboardKpi, PondSummary};
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// A stateless calculator for deriving farm KPIs from already-fetched records.
#[derive(Debug, Default)]
pub struct KpiEngine {}

impl KpiEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes the KPI sheet of one cycle.
    ///
    /// # Arguments
    ///
    /// * `records` - The cycle, its pond, and every record logged against the cycle.
    /// * `now` - Stands in for a missing start or end date.
    ///
    /// # Returns
    ///
    /// The `CycleKpi`, `AnalyticsError::ScopeMismatch` if a record in the
    /// bundle belongs to another cycle, or `AnalyticsError::Overflow` if a
    /// total does not fit.
    pub fn compute_cycle_kpi(
        &self,
        records: &CycleRecords,
        now: DateTime<Utc>,
    ) -> Result<CycleKpi, AnalyticsError> {
        let cycle = &records.cycle;
        let pond = &records.pond;
        check_scope("cycle", std::iter::once((cycle.id, cycle.pond_id)), "pond", pond.id)?;
        check_scope(
            "stocking record",
            records.stocking_records.iter().map(|r| (r.id, r.cycle_id)),
            "cycle",
            cycle.id,
        )?;
        check_scope(
            "mortality record",
            records.mortality_records.iter().map(|r| (r.id, r.cycle_id)),
            "cycle",
            cycle.id,
        )?;
        check_scope(
            "feeding log",
            records.feeding_logs.iter().map(|r| (r.id, r.cycle_id)),
            "cycle",
            cycle.id,
        )?;
        check_scope(
            "harvest record",
            records.harvest_records.iter().map(|r| (r.id, r.cycle_id)),
            "cycle",
            cycle.id,
        )?;
        check_scope(
            "production cost",
            records.production_costs.iter().map(|r| (r.id, r.cycle_id)),
            "cycle",
            cycle.id,
        )?;
        check_scope(
            "revenue record",
            records.revenue_records.iter().map(|r| (r.id, r.cycle_id)),
            "cycle",
            cycle.id,
        )?;

        // --- Raw totals ---
        let total_stocked = count_total(records.stocking_records.iter().map(|r| r.quantity), "stocked")?;
        let total_mortality = count_total(records.mortality_records.iter().map(|r| r.count), "mortality")?;
        let total_harvested = total(records.harvest_records.iter().map(|r| r.total_weight), "biomass")?;
        let total_feed = total(records.feeding_logs.iter().map(|r| r.quantity), "feed")?;
        let total_revenue = total(records.revenue_records.iter().map(|r| r.amount), "totalRevenue")?;
        let total_cost = total(records.production_costs.iter().map(|r| r.amount), "totalCost")?;
        let profit = total_revenue
            .checked_sub(total_cost)
            .ok_or_else(|| AnalyticsError::Overflow("profit".to_string()))?;

        // --- Derived metrics ---
        let survival_rate = survival_rate(total_stocked, total_mortality)?;
        // Feed over harvested weight, not over biomass gain.
        let fcr = ratio(total_feed, total_harvested, "fcr")?;
        let cost_per_lb = ratio(total_cost, total_harvested, "costPerLb")?;

        let start = cycle.start_date.unwrap_or(now);
        let end = cycle.actual_end_date.unwrap_or(now);
        let days_in_cycle = elapsed_days_ceil(start, end).max(1);

        let biomass_per_ha = ratio(total_harvested, pond.area, "biomassPerHa")?;
        let gain_per_ha_per_day = if pond.area > Decimal::ZERO {
            ratio(
                ratio(profit, pond.area, "gainPerHaPerDay")?,
                Decimal::from(days_in_cycle),
                "gainPerHaPerDay",
            )?
        } else {
            Decimal::ZERO
        };

        let current_weight = records
            .harvest_records
            .last()
            .map(|h| h.average_weight)
            .filter(|w| !w.is_zero())
            .or(cycle.target_weight.filter(|w| !w.is_zero()))
            .unwrap_or(Decimal::ZERO);

        tracing::debug!(
            cycle_id = %cycle.id,
            total_stocked,
            total_mortality,
            %total_harvested,
            %total_feed,
            days_in_cycle,
            "Computed cycle totals."
        );

        Ok(CycleKpi {
            cycle_id: cycle.id,
            cycle_name: cycle.name.clone(),
            pond_name: pond.name.clone(),
            pond_area: pond.area,
            days_in_cycle,
            current_weight,
            survival_rate: round2(survival_rate),
            fcr: round2(fcr),
            biomass: round2(total_harvested),
            biomass_per_ha: round2(biomass_per_ha),
            cost_per_lb: round2(cost_per_lb),
            gain_per_ha_per_day: round2(gain_per_ha_per_day),
            total_revenue: round2(total_revenue),
            total_cost: round2(total_cost),
            profit: round2(profit),
        })
    }

    /// Shapes store-side counts and aggregates into the dashboard report.
    ///
    /// `averageFCR` divides the feed of completed cycles by the harvested
    /// weight of every harvest in scope, whatever the cycle's status.
    pub fn compute_dashboard_kpi(
        &self,
        aggregates: &DashboardAggregates,
    ) -> Result<DashboardKpi, AnalyticsError> {
        let average_fcr = ratio(
            aggregates.completed_cycle_feed,
            aggregates.harvested_weight,
            "averageFCR",
        )?;
        let total_costs = aggregates
            .production_costs
            .checked_add(aggregates.operational_costs)
            .ok_or_else(|| AnalyticsError::Overflow("totalCosts".to_string()))?;
        let profit = aggregates
            .revenue
            .checked_sub(total_costs)
            .ok_or_else(|| AnalyticsError::Overflow("profit".to_string()))?;

        Ok(DashboardKpi {
            total_ponds: aggregates.total_ponds,
            active_ponds: aggregates.active_ponds,
            active_cycles: aggregates.active_cycles,
            completed_cycles: aggregates.completed_cycles,
            total_biomass: round2(aggregates.harvested_weight),
            average_survival_rate: round2(aggregates.average_survival_rate.unwrap_or_default()),
            average_fcr: round2(average_fcr),
            total_revenue: round2(aggregates.revenue),
            total_costs: round2(total_costs),
            profit: round2(profit),
        })
    }

    /// Summarises each pond with its active cycle and latest water reading.
    ///
    /// Unlike the cycle sheet, `daysInCycle` here is the raw ceiling of the
    /// days since the start date: it is not floored at 1, and is 0 for ponds
    /// without an active cycle.
    pub fn compute_ponds_overview(
        &self,
        ponds: &[PondSnapshot],
        now: DateTime<Utc>,
    ) -> Result<Vec<PondSummary>, AnalyticsError> {
        ponds
            .iter()
            .map(|snapshot| -> Result<PondSummary, AnalyticsError> {
                let pond = &snapshot.pond;
                let mut survival = Decimal::ZERO;
                let mut days_in_cycle = 0;

                if let Some(active) = &snapshot.active_cycle {
                    let cycle_id = active.cycle.id;
                    check_scope(
                        "cycle",
                        std::iter::once((cycle_id, active.cycle.pond_id)),
                        "pond",
                        pond.id,
                    )?;
                    check_scope(
                        "stocking record",
                        active.stocking_records.iter().map(|r| (r.id, r.cycle_id)),
                        "cycle",
                        cycle_id,
                    )?;
                    check_scope(
                        "mortality record",
                        active.mortality_records.iter().map(|r| (r.id, r.cycle_id)),
                        "cycle",
                        cycle_id,
                    )?;

                    let stocked =
                        count_total(active.stocking_records.iter().map(|r| r.quantity), "stocked")?;
                    let mortality =
                        count_total(active.mortality_records.iter().map(|r| r.count), "mortality")?;
                    survival = survival_rate(stocked, mortality)?;
                    days_in_cycle = elapsed_days_ceil(active.cycle.start_date.unwrap_or(now), now);
                }

                let water = snapshot.latest_water_quality.as_ref();
                Ok(PondSummary {
                    id: pond.id,
                    code: pond.code.clone(),
                    name: pond.name.clone(),
                    area: pond.area,
                    status: pond.status,
                    active_cycle_name: snapshot.active_cycle.as_ref().map(|a| a.cycle.name.clone()),
                    days_in_cycle,
                    survival_rate: round2(survival),
                    // Only a missing reading is "no data"; a measured zero is reported as zero.
                    last_temperature: water.and_then(|w| w.temperature),
                    last_ph: water.and_then(|w| w.ph),
                    last_do: water.and_then(|w| w.dissolved_oxygen),
                })
            })
            .collect()
    }
}

/// Rounds a presented value to two decimals, halves away from zero.
fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn total(values: impl IntoIterator<Item = Decimal>, metric: &str) -> Result<Decimal, AnalyticsError> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
        .ok_or_else(|| AnalyticsError::Overflow(metric.to_string()))
}

fn count_total(values: impl IntoIterator<Item = i64>, metric: &str) -> Result<i64, AnalyticsError> {
    values
        .into_iter()
        .try_fold(0i64, |acc, v| acc.checked_add(v))
        .ok_or_else(|| AnalyticsError::Overflow(metric.to_string()))
}

/// `numerator / denominator`, or zero unless the denominator is positive.
fn ratio(numerator: Decimal, denominator: Decimal, metric: &str) -> Result<Decimal, AnalyticsError> {
    if denominator <= Decimal::ZERO {
        return Ok(Decimal::ZERO);
    }
    numerator
        .checked_div(denominator)
        .ok_or_else(|| AnalyticsError::Overflow(metric.to_string()))
}

/// Percentage of stocked organisms not logged as dead. Unrounded.
fn survival_rate(stocked: i64, mortality: i64) -> Result<Decimal, AnalyticsError> {
    let survivors = Decimal::from(stocked.saturating_sub(mortality));
    let fraction = ratio(survivors, Decimal::from(stocked), "survivalRate")?;
    fraction
        .checked_mul(Decimal::ONE_HUNDRED)
        .ok_or_else(|| AnalyticsError::Overflow("survivalRate".to_string()))
}

/// Whole days from `start` to `end`, rounding any partial day up.
/// Negative when `end` precedes `start`.
fn elapsed_days_ceil(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let millis = (end - start).num_milliseconds();
    let whole = millis / MILLIS_PER_DAY;
    if millis % MILLIS_PER_DAY > 0 { whole + 1 } else { whole }
}

/// Fails on the first `(record_id, owner_id)` pair whose owner is not `expected`.
fn check_scope(
    record: &'static str,
    pairs: impl IntoIterator<Item = (Uuid, Uuid)>,
    owner: &'static str,
    expected: Uuid,
) -> Result<(), AnalyticsError> {
    match pairs.into_iter().find(|(_, found)| *found != expected) {
        Some((record_id, found)) => Err(AnalyticsError::ScopeMismatch {
            record,
            record_id,
            owner,
            found,
            expected,
        }),
        None => Ok(()),
    }
}
