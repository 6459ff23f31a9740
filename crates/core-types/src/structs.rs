//! Entity records as they are stored by the CRUD layer.
//!
//! The KPI side of the system only ever reads these. Quantities that are
//! weighed or paid for are `Decimal`; organism counts are plain integers.

use crate::enums::{CycleStatus, PondStatus};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// The tenant boundary: every pond and operational cost belongs to one farm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Farm {
    pub id: Uuid,
    pub name: String,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Pond {
    pub id: Uuid,
    pub farm_id: Uuid,
    pub code: String,
    pub name: String,
    /// Surface area in hectares.
    pub area: Decimal,
    pub status: PondStatus,
    pub created_at: DateTime<Utc>,
}

/// One stocking-to-harvest production run in a single pond.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Cycle {
    pub id: Uuid,
    pub pond_id: Uuid,
    pub name: String,
    pub status: CycleStatus,
    pub start_date: Option<DateTime<Utc>>,
    pub actual_end_date: Option<DateTime<Utc>>,
    /// Target average weight in grams per organism.
    pub target_weight: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StockingRecord {
    pub id: Uuid,
    pub cycle_id: Uuid,
    pub date: DateTime<Utc>,
    /// Number of post-larvae stocked.
    pub quantity: i64,
    pub average_weight: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MortalityRecord {
    pub id: Uuid,
    pub cycle_id: Uuid,
    pub date: DateTime<Utc>,
    pub count: i64,
    pub cause: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FeedingLog {
    pub id: Uuid,
    pub cycle_id: Uuid,
    pub pond_id: Uuid,
    pub date: DateTime<Utc>,
    pub feed_type: Option<String>,
    /// Kilograms fed.
    pub quantity: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct HarvestRecord {
    pub id: Uuid,
    pub cycle_id: Uuid,
    pub date: DateTime<Utc>,
    pub quantity: i64,
    /// Harvested biomass in kilograms.
    pub total_weight: Decimal,
    /// Grams per organism.
    pub average_weight: Decimal,
    /// Survival as recorded at harvest time, independent of stocking/mortality logs.
    pub survival_rate: Decimal,
    pub total_revenue: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProductionCost {
    pub id: Uuid,
    pub cycle_id: Uuid,
    pub date: DateTime<Utc>,
    pub category: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RevenueRecord {
    pub id: Uuid,
    pub cycle_id: Uuid,
    pub date: DateTime<Utc>,
    pub source: String,
    pub amount: Decimal,
}

/// Farm-level overhead that is not attributable to a single cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OperationalCost {
    pub id: Uuid,
    pub farm_id: Uuid,
    pub date: DateTime<Utc>,
    pub category: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WaterQualityLog {
    pub id: Uuid,
    pub pond_id: Uuid,
    pub date: DateTime<Utc>,
    pub temperature: Option<Decimal>,
    pub ph: Option<Decimal>,
    pub dissolved_oxygen: Option<Decimal>,
}
