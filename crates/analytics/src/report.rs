use core_types::PondStatus;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Farm-wide (or global) headline numbers for the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardKpi {
    pub total_ponds: i64,
    pub active_ponds: i64,
    pub active_cycles: i64,
    pub completed_cycles: i64,
    pub total_biomass: Decimal,
    pub average_survival_rate: Decimal,
    #[serde(rename = "averageFCR")]
    pub average_fcr: Decimal,
    pub total_revenue: Decimal,
    pub total_costs: Decimal,
    pub profit: Decimal,
}

/// The KPI sheet of a single production cycle.
///
/// Every rate and money field is rounded to two decimals on its own;
/// `pond_area` and `current_weight` are passed through as recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleKpi {
    pub cycle_id: Uuid,
    pub cycle_name: String,
    pub pond_name: String,
    pub pond_area: Decimal,
    pub days_in_cycle: i64,
    pub current_weight: Decimal,
    pub survival_rate: Decimal,
    pub fcr: Decimal,
    pub biomass: Decimal,
    pub biomass_per_ha: Decimal,
    pub cost_per_lb: Decimal,
    pub gain_per_ha_per_day: Decimal,
    pub total_revenue: Decimal,
    pub total_cost: Decimal,
    pub profit: Decimal,
}

/// One row of the ponds overview. `None` readings serialize as `null`,
/// the "no data" marker for ponds that were never sampled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PondSummary {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub area: Decimal,
    pub status: PondStatus,
    pub active_cycle_name: Option<String>,
    pub days_in_cycle: i64,
    pub survival_rate: Decimal,
    pub last_temperature: Option<Decimal>,
    pub last_ph: Option<Decimal>,
    #[serde(rename = "lastDO")]
    pub last_do: Option<Decimal>,
}
