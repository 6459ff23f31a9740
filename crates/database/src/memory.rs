//! An in-process `EntityStore`.
//!
//! Applies the same filter semantics as the PostgreSQL repository, including
//! the relation hops (record -> cycle -> pond -> farm). Used as a test double
//! for the HTTP layer.

use crate::error::DbError;
use crate::filter::{Entity, Filter, QueryFilter};
use crate::store::{EntityStore, Measure};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_types::{
    Cycle, CycleStatus, Farm, FeedingLog, HarvestRecord, MortalityRecord, OperationalCost, Pond,
    PondStatus, ProductionCost, RevenueRecord, StockingRecord, WaterQualityLog,
};
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::sync::{RwLock, RwLockReadGuard};
use uuid::Uuid;

/// Any entity that can be inserted into a `MemoryStore`.
#[derive(Debug, Clone)]
pub enum Row {
    Farm(Farm),
    Pond(Pond),
    Cycle(Cycle),
    Stocking(StockingRecord),
    Mortality(MortalityRecord),
    Feeding(FeedingLog),
    Harvest(HarvestRecord),
    ProductionCost(ProductionCost),
    Revenue(RevenueRecord),
    OperationalCost(OperationalCost),
    WaterQuality(WaterQualityLog),
}

macro_rules! row_from {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(impl From<$ty> for Row {
            fn from(value: $ty) -> Self {
                Row::$variant(value)
            }
        })*
    };
}

row_from!(
    Farm(Farm),
    Pond(Pond),
    Cycle(Cycle),
    Stocking(StockingRecord),
    Mortality(MortalityRecord),
    Feeding(FeedingLog),
    Harvest(HarvestRecord),
    ProductionCost(ProductionCost),
    Revenue(RevenueRecord),
    OperationalCost(OperationalCost),
    WaterQuality(WaterQualityLog),
);

#[derive(Debug, Default)]
struct Tables {
    farms: Vec<Farm>,
    ponds: Vec<Pond>,
    cycles: Vec<Cycle>,
    stocking_records: Vec<StockingRecord>,
    mortality_records: Vec<MortalityRecord>,
    feeding_logs: Vec<FeedingLog>,
    harvest_records: Vec<HarvestRecord>,
    production_costs: Vec<ProductionCost>,
    revenue_records: Vec<RevenueRecord>,
    operational_costs: Vec<OperationalCost>,
    water_quality_logs: Vec<WaterQualityLog>,
}

impl Tables {
    fn pond(&self, id: Uuid) -> Option<&Pond> {
        self.ponds.iter().find(|p| p.id == id)
    }

    fn cycle(&self, id: Uuid) -> Option<&Cycle> {
        self.cycles.iter().find(|c| c.id == id)
    }

    fn farm_of_pond(&self, pond_id: Uuid) -> Option<Uuid> {
        self.pond(pond_id).map(|p| p.farm_id)
    }

    fn check_parents(&self, row: &Row) -> Result<(), DbError> {
        let missing = |record: &'static str, parent: &'static str, id: Uuid| {
            Err(DbError::MissingParent { record, parent, id })
        };
        let has_farm = |id: Uuid| self.farms.iter().any(|f| f.id == id);
        let has_pond = |id: Uuid| self.pond(id).is_some();
        let has_cycle = |id: Uuid| self.cycle(id).is_some();

        match row {
            Row::Farm(_) => Ok(()),
            Row::Pond(r) if !has_farm(r.farm_id) => missing("pond", "farm", r.farm_id),
            Row::Cycle(r) if !has_pond(r.pond_id) => missing("cycle", "pond", r.pond_id),
            Row::Stocking(r) if !has_cycle(r.cycle_id) => missing("stocking record", "cycle", r.cycle_id),
            Row::Mortality(r) if !has_cycle(r.cycle_id) => missing("mortality record", "cycle", r.cycle_id),
            Row::Feeding(r) if !has_cycle(r.cycle_id) => missing("feeding log", "cycle", r.cycle_id),
            Row::Feeding(r) if !has_pond(r.pond_id) => missing("feeding log", "pond", r.pond_id),
            Row::Harvest(r) if !has_cycle(r.cycle_id) => missing("harvest record", "cycle", r.cycle_id),
            Row::ProductionCost(r) if !has_cycle(r.cycle_id) => missing("production cost", "cycle", r.cycle_id),
            Row::Revenue(r) if !has_cycle(r.cycle_id) => missing("revenue record", "cycle", r.cycle_id),
            Row::OperationalCost(r) if !has_farm(r.farm_id) => missing("operational cost", "farm", r.farm_id),
            Row::WaterQuality(r) if !has_pond(r.pond_id) => missing("water quality log", "pond", r.pond_id),
            _ => Ok(()),
        }
    }

    /// Keys of a record that hangs off a cycle.
    fn cycle_keys(&self, cycle_id: Uuid, date: DateTime<Utc>) -> Keys {
        let cycle = self.cycle(cycle_id);
        let pond = cycle.map(|c| c.pond_id);
        Keys {
            farm: pond.and_then(|p| self.farm_of_pond(p)),
            pond,
            cycle: Some(cycle_id),
            cycle_status: cycle.map(|c| c.status),
            date: Some(date),
            ..Keys::default()
        }
    }
}

/// The values a row exposes to each filterable field.
#[derive(Debug, Default)]
struct Keys {
    farm: Option<Uuid>,
    pond: Option<Uuid>,
    cycle: Option<Uuid>,
    pond_status: Option<PondStatus>,
    cycle_status: Option<CycleStatus>,
    date: Option<DateTime<Utc>>,
}

impl Keys {
    fn matches(&self, filter: &Filter) -> bool {
        match filter {
            Filter::Farm(id) => self.farm == Some(*id),
            Filter::Pond(id) => self.pond == Some(*id),
            Filter::Cycle(id) => self.cycle == Some(*id),
            Filter::Cycles(ids) => self.cycle.is_some_and(|c| ids.contains(&c)),
            Filter::PondStatus(status) => self.pond_status == Some(*status),
            Filter::CycleStatus(statuses) => {
                self.cycle_status.is_some_and(|s| statuses.contains(&s))
            }
            Filter::DateRange { from, to } => self.date.is_some_and(|d| d >= *from && d <= *to),
        }
    }
}

trait Keyed: Clone {
    const ENTITY: Entity;
    fn keys(&self, tables: &Tables) -> Keys;
}

impl Keyed for Pond {
    const ENTITY: Entity = Entity::Pond;
    fn keys(&self, _tables: &Tables) -> Keys {
        Keys {
            farm: Some(self.farm_id),
            pond: Some(self.id),
            pond_status: Some(self.status),
            ..Keys::default()
        }
    }
}

impl Keyed for Cycle {
    const ENTITY: Entity = Entity::Cycle;
    fn keys(&self, tables: &Tables) -> Keys {
        Keys {
            farm: tables.farm_of_pond(self.pond_id),
            pond: Some(self.pond_id),
            cycle: Some(self.id),
            cycle_status: Some(self.status),
            date: self.start_date,
            ..Keys::default()
        }
    }
}

impl Keyed for FeedingLog {
    const ENTITY: Entity = Entity::FeedingLog;
    fn keys(&self, tables: &Tables) -> Keys {
        // Feeding logs carry their own pond; farm scoping goes through it.
        Keys {
            farm: tables.farm_of_pond(self.pond_id),
            pond: Some(self.pond_id),
            ..tables.cycle_keys(self.cycle_id, self.date)
        }
    }
}

impl Keyed for OperationalCost {
    const ENTITY: Entity = Entity::OperationalCost;
    fn keys(&self, _tables: &Tables) -> Keys {
        Keys {
            farm: Some(self.farm_id),
            date: Some(self.date),
            ..Keys::default()
        }
    }
}

impl Keyed for WaterQualityLog {
    const ENTITY: Entity = Entity::WaterQualityLog;
    fn keys(&self, tables: &Tables) -> Keys {
        Keys {
            farm: tables.farm_of_pond(self.pond_id),
            pond: Some(self.pond_id),
            date: Some(self.date),
            ..Keys::default()
        }
    }
}

macro_rules! cycle_owned {
    ($($ty:ty => $entity:ident),* $(,)?) => {
        $(impl Keyed for $ty {
            const ENTITY: Entity = Entity::$entity;
            fn keys(&self, tables: &Tables) -> Keys {
                tables.cycle_keys(self.cycle_id, self.date)
            }
        })*
    };
}

cycle_owned!(
    StockingRecord => StockingRecord,
    MortalityRecord => MortalityRecord,
    HarvestRecord => HarvestRecord,
    ProductionCost => ProductionCost,
    RevenueRecord => RevenueRecord,
);

fn select<R: Keyed>(rows: &[R], tables: &Tables, filter: &QueryFilter) -> Result<Vec<R>, DbError> {
    if let Some(unsupported) = filter.unsupported_by(R::ENTITY) {
        return Err(DbError::UnsupportedFilter {
            entity: R::ENTITY,
            field: unsupported.field(),
        });
    }
    Ok(rows
        .iter()
        .filter(|row| {
            let keys = row.keys(tables);
            filter.filters().iter().all(|f| keys.matches(f))
        })
        .cloned()
        .collect())
}

fn by_date<R>(date: impl Fn(&R) -> DateTime<Utc>, id: impl Fn(&R) -> Uuid) -> impl Fn(&R, &R) -> Ordering {
    move |a: &R, b: &R| date(a).cmp(&date(b)).then_with(|| id(a).cmp(&id(b)))
}

fn checked_sum(measure: Measure, values: Vec<Decimal>) -> Result<Decimal, DbError> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
        .ok_or(DbError::Overflow(measure))
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store pre-populated with `rows`, in order.
    pub fn with_rows(rows: impl IntoIterator<Item = Row>) -> Result<Self, DbError> {
        let store = Self::new();
        for row in rows {
            store.insert(row)?;
        }
        Ok(store)
    }

    /// Inserts a row after checking that its parent rows exist, the way the
    /// foreign keys of the relational schema would.
    pub fn insert(&self, row: impl Into<Row>) -> Result<(), DbError> {
        let mut tables = self.tables.write().map_err(|_| DbError::Poisoned)?;
        let row = row.into();
        tables.check_parents(&row)?;
        match row {
            Row::Farm(r) => tables.farms.push(r),
            Row::Pond(r) => tables.ponds.push(r),
            Row::Cycle(r) => tables.cycles.push(r),
            Row::Stocking(r) => tables.stocking_records.push(r),
            Row::Mortality(r) => tables.mortality_records.push(r),
            Row::Feeding(r) => tables.feeding_logs.push(r),
            Row::Harvest(r) => tables.harvest_records.push(r),
            Row::ProductionCost(r) => tables.production_costs.push(r),
            Row::Revenue(r) => tables.revenue_records.push(r),
            Row::OperationalCost(r) => tables.operational_costs.push(r),
            Row::WaterQuality(r) => tables.water_quality_logs.push(r),
        }
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, DbError> {
        self.tables.read().map_err(|_| DbError::Poisoned)
    }

    fn values(&self, measure: Measure, filter: &QueryFilter) -> Result<Vec<Decimal>, DbError> {
        let t = self.read()?;
        let values = match measure {
            Measure::StockedQuantity => select(&t.stocking_records, &t, filter)?
                .iter()
                .map(|r| Decimal::from(r.quantity))
                .collect(),
            Measure::MortalityCount => select(&t.mortality_records, &t, filter)?
                .iter()
                .map(|r| Decimal::from(r.count))
                .collect(),
            Measure::FeedQuantity => select(&t.feeding_logs, &t, filter)?
                .iter()
                .map(|r| r.quantity)
                .collect(),
            Measure::HarvestWeight => select(&t.harvest_records, &t, filter)?
                .iter()
                .map(|r| r.total_weight)
                .collect(),
            Measure::HarvestRevenue => select(&t.harvest_records, &t, filter)?
                .iter()
                .map(|r| r.total_revenue)
                .collect(),
            Measure::HarvestSurvivalRate => select(&t.harvest_records, &t, filter)?
                .iter()
                .map(|r| r.survival_rate)
                .collect(),
            Measure::HarvestAverageWeight => select(&t.harvest_records, &t, filter)?
                .iter()
                .map(|r| r.average_weight)
                .collect(),
            Measure::ProductionCostAmount => select(&t.production_costs, &t, filter)?
                .iter()
                .map(|r| r.amount)
                .collect(),
            Measure::RevenueAmount => select(&t.revenue_records, &t, filter)?
                .iter()
                .map(|r| r.amount)
                .collect(),
            Measure::OperationalCostAmount => select(&t.operational_costs, &t, filter)?
                .iter()
                .map(|r| r.amount)
                .collect(),
        };
        Ok(values)
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn count(&self, entity: Entity, filter: &QueryFilter) -> Result<i64, DbError> {
        let t = self.read()?;
        let count = match entity {
            Entity::Pond => select(&t.ponds, &t, filter)?.len(),
            Entity::Cycle => select(&t.cycles, &t, filter)?.len(),
            Entity::StockingRecord => select(&t.stocking_records, &t, filter)?.len(),
            Entity::MortalityRecord => select(&t.mortality_records, &t, filter)?.len(),
            Entity::FeedingLog => select(&t.feeding_logs, &t, filter)?.len(),
            Entity::HarvestRecord => select(&t.harvest_records, &t, filter)?.len(),
            Entity::ProductionCost => select(&t.production_costs, &t, filter)?.len(),
            Entity::RevenueRecord => select(&t.revenue_records, &t, filter)?.len(),
            Entity::OperationalCost => select(&t.operational_costs, &t, filter)?.len(),
            Entity::WaterQualityLog => select(&t.water_quality_logs, &t, filter)?.len(),
        };
        Ok(count as i64)
    }

    async fn sum(&self, measure: Measure, filter: &QueryFilter) -> Result<Decimal, DbError> {
        checked_sum(measure, self.values(measure, filter)?)
    }

    async fn average(
        &self,
        measure: Measure,
        filter: &QueryFilter,
    ) -> Result<Option<Decimal>, DbError> {
        let values = self.values(measure, filter)?;
        if values.is_empty() {
            return Ok(None);
        }
        let len = Decimal::from(values.len() as u64);
        let total = checked_sum(measure, values)?;
        total
            .checked_div(len)
            .map(Some)
            .ok_or(DbError::Overflow(measure))
    }

    async fn find_pond(&self, id: Uuid) -> Result<Option<Pond>, DbError> {
        Ok(self.read()?.pond(id).cloned())
    }

    async fn find_cycle(&self, id: Uuid) -> Result<Option<Cycle>, DbError> {
        Ok(self.read()?.cycle(id).cloned())
    }

    async fn list_ponds(&self, filter: &QueryFilter) -> Result<Vec<Pond>, DbError> {
        let t = self.read()?;
        let mut ponds = select(&t.ponds, &t, filter)?;
        ponds.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(ponds)
    }

    async fn list_cycles(&self, filter: &QueryFilter) -> Result<Vec<Cycle>, DbError> {
        let t = self.read()?;
        let mut cycles = select(&t.cycles, &t, filter)?;
        // Undated first (Postgres DESC puts NULLs first), then newest start.
        cycles.sort_by(|a, b| match (a.start_date, b.start_date) {
            (Some(x), Some(y)) => y.cmp(&x).then_with(|| b.created_at.cmp(&a.created_at)),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => b.created_at.cmp(&a.created_at),
        });
        Ok(cycles)
    }

    async fn list_stocking_records(
        &self,
        filter: &QueryFilter,
    ) -> Result<Vec<StockingRecord>, DbError> {
        let t = self.read()?;
        let mut rows = select(&t.stocking_records, &t, filter)?;
        rows.sort_by(by_date(|r: &StockingRecord| r.date, |r: &StockingRecord| r.id));
        Ok(rows)
    }

    async fn list_mortality_records(
        &self,
        filter: &QueryFilter,
    ) -> Result<Vec<MortalityRecord>, DbError> {
        let t = self.read()?;
        let mut rows = select(&t.mortality_records, &t, filter)?;
        rows.sort_by(by_date(|r: &MortalityRecord| r.date, |r: &MortalityRecord| r.id));
        Ok(rows)
    }

    async fn list_feeding_logs(&self, filter: &QueryFilter) -> Result<Vec<FeedingLog>, DbError> {
        let t = self.read()?;
        let mut rows = select(&t.feeding_logs, &t, filter)?;
        rows.sort_by(by_date(|r: &FeedingLog| r.date, |r: &FeedingLog| r.id));
        Ok(rows)
    }

    async fn list_harvest_records(
        &self,
        filter: &QueryFilter,
    ) -> Result<Vec<HarvestRecord>, DbError> {
        let t = self.read()?;
        let mut rows = select(&t.harvest_records, &t, filter)?;
        rows.sort_by(by_date(|r: &HarvestRecord| r.created_at, |r: &HarvestRecord| r.id));
        Ok(rows)
    }

    async fn list_production_costs(
        &self,
        filter: &QueryFilter,
    ) -> Result<Vec<ProductionCost>, DbError> {
        let t = self.read()?;
        let mut rows = select(&t.production_costs, &t, filter)?;
        rows.sort_by(by_date(|r: &ProductionCost| r.date, |r: &ProductionCost| r.id));
        Ok(rows)
    }

    async fn list_revenue_records(
        &self,
        filter: &QueryFilter,
    ) -> Result<Vec<RevenueRecord>, DbError> {
        let t = self.read()?;
        let mut rows = select(&t.revenue_records, &t, filter)?;
        rows.sort_by(by_date(|r: &RevenueRecord| r.date, |r: &RevenueRecord| r.id));
        Ok(rows)
    }

    async fn list_operational_costs(
        &self,
        filter: &QueryFilter,
    ) -> Result<Vec<OperationalCost>, DbError> {
        let t = self.read()?;
        let mut rows = select(&t.operational_costs, &t, filter)?;
        rows.sort_by(by_date(|r: &OperationalCost| r.date, |r: &OperationalCost| r.id));
        Ok(rows)
    }

    async fn list_water_quality_logs(
        &self,
        filter: &QueryFilter,
    ) -> Result<Vec<WaterQualityLog>, DbError> {
        let t = self.read()?;
        let mut rows = select(&t.water_quality_logs, &t, filter)?;
        rows.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(rows)
    }

    async fn latest_water_quality(
        &self,
        pond_id: Uuid,
    ) -> Result<Option<WaterQualityLog>, DbError> {
        let t = self.read()?;
        Ok(t
            .water_quality_logs
            .iter()
            .filter(|log| log.pond_id == pond_id)
            .max_by_key(|log| log.date)
            .cloned())
    }
}
