use crate::DbError;
use crate::filter::{Entity, Field, Filter, QueryFilter};
use crate::store::{EntityStore, Measure};
use async_trait::async_trait;
use core_types::{
    Cycle, FeedingLog, HarvestRecord, MortalityRecord, OperationalCost, Pond, ProductionCost,
    RevenueRecord, StockingRecord, WaterQualityLog,
};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{FromRow, Postgres, QueryBuilder};
use uuid::Uuid;

/// The `DbRepository` provides the PostgreSQL-backed `EntityStore`.
/// It encapsulates all SQL; callers only ever see typed filters and entities.
#[derive(Debug, Clone)]
pub struct DbRepository {
    pool: PgPool,
}

/// Where a filterable field lives relative to an entity's table (aliased `t`).
/// The comparison is written between `prefix` and `suffix`.
struct Path {
    prefix: &'static str,
    suffix: &'static str,
}

const fn own(column: &'static str) -> Path {
    Path { prefix: column, suffix: "" }
}

const CYCLE_IN_FARM: Path = Path {
    prefix: "t.cycle_id IN (SELECT c.id FROM cycles c JOIN ponds p ON p.id = c.pond_id WHERE p.farm_id",
    suffix: ")",
};
const CYCLE_IN_POND: Path = Path {
    prefix: "t.cycle_id IN (SELECT c.id FROM cycles c WHERE c.pond_id",
    suffix: ")",
};
const CYCLE_WITH_STATUS: Path = Path {
    prefix: "t.cycle_id IN (SELECT c.id FROM cycles c WHERE c.status",
    suffix: ")",
};
const POND_IN_FARM: Path = Path {
    prefix: "t.pond_id IN (SELECT p.id FROM ponds p WHERE p.farm_id",
    suffix: ")",
};

fn path(entity: Entity, field: Field) -> Option<Path> {
    if !entity.supports(field) {
        return None;
    }
    let path = match (entity, field) {
        (Entity::Pond, Field::Farm) => own("t.farm_id"),
        (Entity::Pond, Field::Pond) => own("t.id"),
        (Entity::Pond, Field::PondStatus) => own("t.status"),

        (Entity::Cycle, Field::Farm) => POND_IN_FARM,
        (Entity::Cycle, Field::Pond) => own("t.pond_id"),
        (Entity::Cycle, Field::Cycle) => own("t.id"),
        (Entity::Cycle, Field::CycleStatus) => own("t.status"),
        (Entity::Cycle, Field::Date) => own("t.start_date"),

        (Entity::OperationalCost, Field::Farm) => own("t.farm_id"),

        (Entity::WaterQualityLog | Entity::FeedingLog, Field::Farm) => POND_IN_FARM,
        (Entity::WaterQualityLog | Entity::FeedingLog, Field::Pond) => own("t.pond_id"),

        (_, Field::Farm) => CYCLE_IN_FARM,
        (_, Field::Pond) => CYCLE_IN_POND,
        (_, Field::Cycle) => own("t.cycle_id"),
        (_, Field::CycleStatus) => CYCLE_WITH_STATUS,
        (_, Field::Date) => own("t.date"),
        (_, Field::PondStatus) => return None,
    };
    Some(path)
}

fn order_by(entity: Entity) -> &'static str {
    match entity {
        Entity::Pond => "t.code ASC",
        Entity::Cycle => "t.start_date DESC NULLS FIRST, t.created_at DESC",
        Entity::HarvestRecord => "t.created_at ASC, t.id ASC",
        Entity::WaterQualityLog => "t.date DESC",
        _ => "t.date ASC, t.id ASC",
    }
}

/// Appends ` WHERE ...` for every filter; nothing for an empty filter.
fn push_where(
    builder: &mut QueryBuilder<'_, Postgres>,
    entity: Entity,
    filter: &QueryFilter,
) -> Result<(), DbError> {
    for (i, f) in filter.filters().iter().enumerate() {
        let field = f.field();
        let path = path(entity, field).ok_or(DbError::UnsupportedFilter { entity, field })?;
        builder.push(if i == 0 { " WHERE " } else { " AND " });

        match f {
            Filter::Farm(id) | Filter::Pond(id) | Filter::Cycle(id) => {
                builder.push(path.prefix).push(" = ").push_bind(*id);
            }
            Filter::PondStatus(status) => {
                builder.push(path.prefix).push(" = ").push_bind(*status);
            }
            Filter::Cycles(ids) if ids.is_empty() => {
                builder.push("FALSE");
                continue;
            }
            Filter::Cycles(ids) => {
                builder.push(path.prefix).push(" IN (");
                let mut separated = builder.separated(", ");
                for id in ids {
                    separated.push_bind(*id);
                }
                separated.push_unseparated(")");
            }
            Filter::CycleStatus(statuses) if statuses.is_empty() => {
                builder.push("FALSE");
                continue;
            }
            Filter::CycleStatus(statuses) => {
                builder.push(path.prefix).push(" IN (");
                let mut separated = builder.separated(", ");
                for status in statuses {
                    separated.push_bind(*status);
                }
                separated.push_unseparated(")");
            }
            Filter::DateRange { from, to } => {
                builder
                    .push(path.prefix)
                    .push(" BETWEEN ")
                    .push_bind(*from)
                    .push(" AND ")
                    .push_bind(*to);
            }
        }
        builder.push(path.suffix);
    }
    Ok(())
}

impl DbRepository {
    /// Creates a new `DbRepository` with a shared database connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_all<T>(&self, entity: Entity, filter: &QueryFilter) -> Result<Vec<T>, DbError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let mut builder = QueryBuilder::new(format!("SELECT t.* FROM {} t", entity.table()));
        push_where(&mut builder, entity, filter)?;
        builder.push(" ORDER BY ").push(order_by(entity));

        let rows = builder.build_query_as::<T>().fetch_all(&self.pool).await?;
        tracing::debug!(%entity, rows = rows.len(), "Fetched rows.");
        Ok(rows)
    }

    async fn fetch_by_id<T>(&self, entity: Entity, id: Uuid) -> Result<Option<T>, DbError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let row = sqlx::query_as::<_, T>(&format!("SELECT t.* FROM {} t WHERE t.id = $1", entity.table()))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }
}

#[async_trait]
impl EntityStore for DbRepository {
    async fn count(&self, entity: Entity, filter: &QueryFilter) -> Result<i64, DbError> {
        let mut builder = QueryBuilder::new(format!("SELECT COUNT(*) FROM {} t", entity.table()));
        push_where(&mut builder, entity, filter)?;
        let count = builder.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(count)
    }

    async fn sum(&self, measure: Measure, filter: &QueryFilter) -> Result<Decimal, DbError> {
        let entity = measure.entity();
        let mut builder = QueryBuilder::new(format!(
            "SELECT COALESCE(SUM(t.{}), 0)::NUMERIC FROM {} t",
            measure.column(),
            entity.table()
        ));
        push_where(&mut builder, entity, filter)?;
        let total = builder.build_query_scalar::<Decimal>().fetch_one(&self.pool).await?;
        Ok(total)
    }

    async fn average(
        &self,
        measure: Measure,
        filter: &QueryFilter,
    ) -> Result<Option<Decimal>, DbError> {
        let entity = measure.entity();
        let mut builder = QueryBuilder::new(format!(
            "SELECT AVG(t.{})::NUMERIC FROM {} t",
            measure.column(),
            entity.table()
        ));
        push_where(&mut builder, entity, filter)?;
        let mean = builder.build_query_scalar::<Option<Decimal>>().fetch_one(&self.pool).await?;
        Ok(mean)
    }

    async fn find_pond(&self, id: Uuid) -> Result<Option<Pond>, DbError> {
        self.fetch_by_id(Entity::Pond, id).await
    }

    async fn find_cycle(&self, id: Uuid) -> Result<Option<Cycle>, DbError> {
        self.fetch_by_id(Entity::Cycle, id).await
    }

    async fn list_ponds(&self, filter: &QueryFilter) -> Result<Vec<Pond>, DbError> {
        self.fetch_all(Entity::Pond, filter).await
    }

    async fn list_cycles(&self, filter: &QueryFilter) -> Result<Vec<Cycle>, DbError> {
        self.fetch_all(Entity::Cycle, filter).await
    }

    async fn list_stocking_records(
        &self,
        filter: &QueryFilter,
    ) -> Result<Vec<StockingRecord>, DbError> {
        self.fetch_all(Entity::StockingRecord, filter).await
    }

    async fn list_mortality_records(
        &self,
        filter: &QueryFilter,
    ) -> Result<Vec<MortalityRecord>, DbError> {
        self.fetch_all(Entity::MortalityRecord, filter).await
    }

    async fn list_feeding_logs(&self, filter: &QueryFilter) -> Result<Vec<FeedingLog>, DbError> {
        self.fetch_all(Entity::FeedingLog, filter).await
    }

    async fn list_harvest_records(
        &self,
        filter: &QueryFilter,
    ) -> Result<Vec<HarvestRecord>, DbError> {
        self.fetch_all(Entity::HarvestRecord, filter).await
    }

    async fn list_production_costs(
        &self,
        filter: &QueryFilter,
    ) -> Result<Vec<ProductionCost>, DbError> {
        self.fetch_all(Entity::ProductionCost, filter).await
    }

    async fn list_revenue_records(
        &self,
        filter: &QueryFilter,
    ) -> Result<Vec<RevenueRecord>, DbError> {
        self.fetch_all(Entity::RevenueRecord, filter).await
    }

    async fn list_operational_costs(
        &self,
        filter: &QueryFilter,
    ) -> Result<Vec<OperationalCost>, DbError> {
        self.fetch_all(Entity::OperationalCost, filter).await
    }

    async fn list_water_quality_logs(
        &self,
        filter: &QueryFilter,
    ) -> Result<Vec<WaterQualityLog>, DbError> {
        self.fetch_all(Entity::WaterQualityLog, filter).await
    }

    async fn latest_water_quality(
        &self,
        pond_id: Uuid,
    ) -> Result<Option<WaterQualityLog>, DbError> {
        let log = sqlx::query_as::<_, WaterQualityLog>(
            "SELECT t.* FROM water_quality_logs t WHERE t.pond_id = $1 ORDER BY t.date DESC LIMIT 1",
        )
        .bind(pond_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use core_types::{CycleStatus, PondStatus};

    fn sql_for(entity: Entity, filter: &QueryFilter) -> Result<String, DbError> {
        let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) FROM {} t", entity.table()));
        push_where(&mut builder, entity, filter)?;
        Ok(builder.sql().to_string())
    }

    #[test]
    fn empty_filter_adds_no_where_clause() {
        let sql = sql_for(Entity::Pond, &QueryFilter::new()).unwrap();
        assert_eq!(sql, "SELECT COUNT(*) FROM ponds t");
    }

    #[test]
    fn pond_filters_use_own_columns() {
        let filter = QueryFilter::for_farm(Some(Uuid::new_v4()))
            .with(Filter::PondStatus(PondStatus::Active));
        let sql = sql_for(Entity::Pond, &filter).unwrap();
        assert_eq!(
            sql,
            "SELECT COUNT(*) FROM ponds t WHERE t.farm_id = $1 AND t.status = $2"
        );
    }

    #[test]
    fn farm_scope_on_cycle_records_joins_through_ponds() {
        let filter = QueryFilter::for_farm(Some(Uuid::new_v4()));
        let sql = sql_for(Entity::HarvestRecord, &filter).unwrap();
        assert_eq!(
            sql,
            "SELECT COUNT(*) FROM harvest_records t WHERE t.cycle_id IN \
             (SELECT c.id FROM cycles c JOIN ponds p ON p.id = c.pond_id WHERE p.farm_id = $1)"
        );
    }

    #[test]
    fn cycle_status_sets_become_in_lists() {
        let filter = QueryFilter::new()
            .with(Filter::CycleStatus(CycleStatus::ACTIVE.to_vec()));
        let sql = sql_for(Entity::Cycle, &filter).unwrap();
        assert_eq!(sql, "SELECT COUNT(*) FROM cycles t WHERE t.status IN ($1, $2)");

        let sql = sql_for(Entity::FeedingLog, &filter).unwrap();
        assert_eq!(
            sql,
            "SELECT COUNT(*) FROM feeding_logs t WHERE t.cycle_id IN \
             (SELECT c.id FROM cycles c WHERE c.status IN ($1, $2))"
        );
    }

    #[test]
    fn completed_cycle_feed_binds_a_fixed_number_of_parameters() {
        let filter = QueryFilter::for_farm(Some(Uuid::new_v4()))
            .with(Filter::CycleStatus(vec![CycleStatus::Completed]));
        let sql = sql_for(Entity::FeedingLog, &filter).unwrap();
        assert_eq!(
            sql,
            "SELECT COUNT(*) FROM feeding_logs t WHERE t.pond_id IN \
             (SELECT p.id FROM ponds p WHERE p.farm_id = $1) AND t.cycle_id IN \
             (SELECT c.id FROM cycles c WHERE c.status IN ($2))"
        );
    }

    #[test]
    fn empty_cycle_set_matches_nothing() {
        let filter = QueryFilter::new().with(Filter::Cycles(vec![]));
        let sql = sql_for(Entity::FeedingLog, &filter).unwrap();
        assert_eq!(sql, "SELECT COUNT(*) FROM feeding_logs t WHERE FALSE");
    }

    #[test]
    fn date_ranges_are_inclusive() {
        let from = Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 7, 31, 23, 59, 59).unwrap();
        let filter = QueryFilter::new()
            .with(Filter::Pond(Uuid::new_v4()))
            .with(Filter::DateRange { from, to });
        let sql = sql_for(Entity::WaterQualityLog, &filter).unwrap();
        assert_eq!(
            sql,
            "SELECT COUNT(*) FROM water_quality_logs t WHERE t.pond_id = $1 AND t.date BETWEEN $2 AND $3"
        );
    }

    #[test]
    fn unsupported_filters_are_rejected() {
        let filter = QueryFilter::new().with(Filter::Cycle(Uuid::new_v4()));
        let err = sql_for(Entity::OperationalCost, &filter).unwrap_err();
        assert!(matches!(
            err,
            DbError::UnsupportedFilter { entity: Entity::OperationalCost, field: Field::Cycle }
        ));
    }
}
