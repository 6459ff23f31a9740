use serde::{Deserialize, Serialize};

/// Operational status of a pond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "pond_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PondStatus {
    Active,
    Inactive,
    Maintenance,
    Harvesting,
    Preparing,
}

/// Lifecycle of a production cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "cycle_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CycleStatus {
    Planning,
    Stocking,
    Growing,
    Harvesting,
    Completed,
    Cancelled,
}

impl CycleStatus {
    /// The statuses that count a cycle as "active" for KPI purposes.
    pub const ACTIVE: [CycleStatus; 2] = [CycleStatus::Growing, CycleStatus::Stocking];
}
