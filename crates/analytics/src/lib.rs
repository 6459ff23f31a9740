//! # Aquaops Analytics Engine
//!
//! This crate derives the operational KPIs of a shrimp farm (survival rate,
//! feed-conversion ratio, biomass density, profit) from raw event records.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** This is a pure logic crate. It has no knowledge of the
//!   database or of HTTP. It depends only on `core-types` (Layer 0).
//! - **Stateless Calculation:** The `KpiEngine` takes record bundles that were
//!   already fetched for a scope and produces report structs. Even "now" is an
//!   argument, so identical inputs always give identical outputs.
//! - **Guarded Division:** Every ratio whose divisor is zero degrades to zero.
//!
//! ## Public API
//!
//! - `KpiEngine`: The calculator.
//! - `CycleRecords`, `DashboardAggregates`, `PondSnapshot`: Input bundles per scope.
//! - `CycleKpi`, `DashboardKpi`, `PondSummary`: The presented reports.
//! - `AnalyticsError`: The specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod engine;
pub mod error;
pub mod inputs;
pub mod report;

// Re-export the key components to create a clean, public-facing API.
pub use engine::KpiEngine;
pub use error::AnalyticsError;
pub use inputs::{ActiveCycle, CycleRecords, DashboardAggregates, PondSnapshot};
pub use report::{CycleKpi, DashboardKpi, PondSummary};
