//! Strongly typed query filters.
//!
//! A `QueryFilter` is a conjunction of `Filter`s. Each entity declares which
//! fields it can be filtered on; asking for anything else is an error rather
//! than a clause that is silently dropped.

use chrono::{DateTime, Utc};
use core_types::{CycleStatus, PondStatus};
use std::fmt;
use uuid::Uuid;

/// The entity tables the KPI layer reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Pond,
    Cycle,
    StockingRecord,
    MortalityRecord,
    FeedingLog,
    HarvestRecord,
    ProductionCost,
    RevenueRecord,
    OperationalCost,
    WaterQualityLog,
}

/// A filterable field, independent of the value it is compared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Farm,
    Pond,
    Cycle,
    PondStatus,
    CycleStatus,
    Date,
}

/// One predicate. Variants carry the value they compare against.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Farm(Uuid),
    Pond(Uuid),
    Cycle(Uuid),
    /// Membership in a set of cycles. An empty set matches nothing.
    Cycles(Vec<Uuid>),
    PondStatus(PondStatus),
    /// Membership in a set of cycle statuses. An empty set matches nothing.
    CycleStatus(Vec<CycleStatus>),
    /// Inclusive on both ends.
    DateRange { from: DateTime<Utc>, to: DateTime<Utc> },
}

impl Filter {
    pub fn field(&self) -> Field {
        match self {
            Filter::Farm(_) => Field::Farm,
            Filter::Pond(_) => Field::Pond,
            Filter::Cycle(_) | Filter::Cycles(_) => Field::Cycle,
            Filter::PondStatus(_) => Field::PondStatus,
            Filter::CycleStatus(_) => Field::CycleStatus,
            Filter::DateRange { .. } => Field::Date,
        }
    }
}

impl Entity {
    pub fn table(&self) -> &'static str {
        match self {
            Entity::Pond => "ponds",
            Entity::Cycle => "cycles",
            Entity::StockingRecord => "stocking_records",
            Entity::MortalityRecord => "mortality_records",
            Entity::FeedingLog => "feeding_logs",
            Entity::HarvestRecord => "harvest_records",
            Entity::ProductionCost => "production_costs",
            Entity::RevenueRecord => "revenue_records",
            Entity::OperationalCost => "operational_costs",
            Entity::WaterQualityLog => "water_quality_logs",
        }
    }

    /// Records whose parent key is a cycle.
    pub fn is_cycle_owned(&self) -> bool {
        matches!(
            self,
            Entity::StockingRecord
                | Entity::MortalityRecord
                | Entity::FeedingLog
                | Entity::HarvestRecord
                | Entity::ProductionCost
                | Entity::RevenueRecord
        )
    }

    pub fn supports(&self, field: Field) -> bool {
        match self {
            Entity::Pond => matches!(field, Field::Farm | Field::Pond | Field::PondStatus),
            Entity::Cycle => !matches!(field, Field::PondStatus),
            Entity::OperationalCost => matches!(field, Field::Farm | Field::Date),
            Entity::WaterQualityLog => matches!(field, Field::Farm | Field::Pond | Field::Date),
            _ => !matches!(field, Field::PondStatus),
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Farm => "farm",
            Field::Pond => "pond",
            Field::Cycle => "cycle",
            Field::PondStatus => "pond status",
            Field::CycleStatus => "cycle status",
            Field::Date => "date",
        };
        f.write_str(name)
    }
}

/// A conjunction of filters. The default (empty) filter matches every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryFilter {
    filters: Vec<Filter>,
}

impl QueryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scopes to one farm when an id is given, otherwise matches everything.
    pub fn for_farm(farm_id: Option<Uuid>) -> Self {
        let filter = Self::new();
        match farm_id {
            Some(id) => filter.with(Filter::Farm(id)),
            None => filter,
        }
    }

    pub fn with(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// The first filter `entity` cannot be filtered on, if any.
    pub fn unsupported_by(&self, entity: Entity) -> Option<&Filter> {
        self.filters.iter().find(|f| !entity.supports(f.field()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn farm_scope_is_optional() {
        assert!(QueryFilter::for_farm(None).is_empty());

        let id = Uuid::new_v4();
        assert_eq!(QueryFilter::for_farm(Some(id)).filters(), &[Filter::Farm(id)]);
    }

    #[test]
    fn pond_status_only_applies_to_ponds() {
        let filter = QueryFilter::new().with(Filter::PondStatus(PondStatus::Active));

        assert!(filter.unsupported_by(Entity::Pond).is_none());
        assert_eq!(
            filter.unsupported_by(Entity::Cycle),
            Some(&Filter::PondStatus(PondStatus::Active))
        );
        assert!(filter.unsupported_by(Entity::HarvestRecord).is_some());
    }

    #[test]
    fn farm_level_costs_cannot_be_scoped_to_cycles() {
        let filter = QueryFilter::for_farm(Some(Uuid::new_v4()))
            .with(Filter::CycleStatus(vec![CycleStatus::Completed]));

        assert!(filter.unsupported_by(Entity::ProductionCost).is_none());
        assert!(filter.unsupported_by(Entity::OperationalCost).is_some());
    }

    #[test]
    fn every_cycle_owned_record_supports_cycle_scoping() {
        let filter = QueryFilter::new().with(Filter::Cycles(vec![]));
        for entity in [
            Entity::StockingRecord,
            Entity::MortalityRecord,
            Entity::FeedingLog,
            Entity::HarvestRecord,
            Entity::ProductionCost,
            Entity::RevenueRecord,
        ] {
            assert!(entity.is_cycle_owned());
            assert!(filter.unsupported_by(entity).is_none(), "{entity}");
        }
    }
}
