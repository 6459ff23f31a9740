pub mod enums;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{CycleStatus, PondStatus};
pub use structs::{
    Cycle, Farm, FeedingLog, HarvestRecord, MortalityRecord, OperationalCost, Pond,
    ProductionCost, RevenueRecord, StockingRecord, WaterQualityLog,
};
