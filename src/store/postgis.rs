//! # PostGIS Store
//!
//! `sqlx` implementation of the store traits over the relations the batch
//! pipeline publishes. Every value is bound out-of-band; the only text
//! rendered into SQL comes from `Column`, `SortSpec` and `ExclusionRule`.
//!
//! Exports run a `NO SCROLL` server-side cursor inside a transaction and
//! `FETCH FORWARD` one batch per round trip. The transaction is owned by the
//! stream, so dropping the stream rolls it back and returns the connection.

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt, TryStreamExt};
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow};
use sqlx::{Arguments, FromRow, Postgres, Row, Transaction};
use tracing::{debug, info};

use super::errors::{StoreError, StoreResult};
use super::{
    CatalogStore, DerivedRelation, ExclusionStore, PageWindow, RowStream, SpatialStore,
};
use crate::config::DatabaseConfig;
use crate::exclusion::{ExclusionCandidate, ExclusionRule};
use crate::model::{Catalog, Cohort, ParcelRecord, Record};
use crate::query::{BindValue, Predicate, SortSpec};
use crate::spatial::PointLocation;

const EXCLUSION_CURSOR: &str = "exclusion_scan";

const CANDIDATE_COLUMNS: &str =
    "parcel_id, water_pct, land_pct, is_offshore, is_road_corridor, is_rail_corridor, is_long_thin";

/// PostGIS-backed store
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Build a pool that connects on first use
    pub fn connect_lazy(config: &DatabaseConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect_lazy(&config.url)?;

        info!(
            max_connections = config.max_connections,
            "database pool configured"
        );
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn cursor<T>(
        &self,
        name: String,
        select: String,
        values: Vec<BindValue>,
        batch_size: usize,
    ) -> RowStream<T>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin + 'static,
    {
        let state = CursorState {
            cursor: Cursor::Unopened {
                pool: self.pool.clone(),
                declare: format!("DECLARE {} NO SCROLL CURSOR FOR {}", name, select),
                values,
            },
            fetch: fetch_sql(&name, batch_size.max(1)),
            batch_size: batch_size.max(1),
        };

        stream::try_unfold(state, next_batch::<T>)
            .map_ok(|rows| stream::iter(rows.into_iter().map(Ok)))
            .try_flatten()
            .boxed()
    }
}

/// One cursor name per catalog, so each `FETCH` text describes one row shape
fn export_cursor(catalog: Catalog) -> String {
    format!("{}_export", catalog.name())
}

fn fetch_sql(cursor: &str, batch_size: usize) -> String {
    format!("FETCH FORWARD {} FROM {}", batch_size, cursor)
}

fn column_list(catalog: Catalog) -> String {
    catalog
        .columns()
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn add_arg<'q, T>(args: &mut PgArguments, value: T) -> StoreResult<()>
where
    T: 'q + sqlx::Encode<'q, Postgres> + sqlx::Type<Postgres>,
{
    args.add(value)
        .map_err(|e| StoreError::Query(format!("failed to bind value: {}", e)))
}

fn arguments(values: &[BindValue]) -> StoreResult<PgArguments> {
    let mut args = PgArguments::default();
    for value in values {
        match value {
            BindValue::Int(n) => add_arg(&mut args, *n)?,
            BindValue::Float(x) => add_arg(&mut args, *x)?,
            BindValue::TextList(list) => add_arg(&mut args, list.clone())?,
        }
    }
    Ok(args)
}

fn select_sql(catalog: Catalog, predicate: &Predicate) -> String {
    format!(
        "SELECT {} FROM {} WHERE {}",
        column_list(catalog),
        catalog.relation(),
        predicate.to_sql()
    )
}

enum Cursor {
    Unopened {
        pool: PgPool,
        declare: String,
        values: Vec<BindValue>,
    },
    Open(Transaction<'static, Postgres>),
    Drained,
}

struct CursorState {
    cursor: Cursor,
    fetch: String,
    batch_size: usize,
}

async fn next_batch<T>(mut state: CursorState) -> StoreResult<Option<(Vec<T>, CursorState)>>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let mut tx = match std::mem::replace(&mut state.cursor, Cursor::Drained) {
        Cursor::Drained => return Ok(None),
        Cursor::Open(tx) => tx,
        Cursor::Unopened {
            pool,
            declare,
            values,
        } => {
            let mut tx = pool.begin().await?;
            sqlx::query_with(&declare, arguments(&values)?)
                .execute(&mut *tx)
                .await?;
            tx
        }
    };

    // Row shape follows the DECLARE, not the FETCH text: keep it uncached
    let rows: Vec<T> = sqlx::query_as(&state.fetch)
        .persistent(false)
        .fetch_all(&mut *tx)
        .await?;
    debug!(rows = rows.len(), "cursor batch");

    if rows.len() < state.batch_size {
        // Short batch: the cursor is exhausted
        tx.commit().await?;
        if rows.is_empty() {
            return Ok(None);
        }
    } else {
        state.cursor = Cursor::Open(tx);
    }

    Ok(Some((rows, state)))
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn count<R: Record>(&self, predicate: &Predicate) -> StoreResult<u64> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {}",
            R::CATALOG.relation(),
            predicate.to_sql()
        );
        let n: i64 = sqlx::query_scalar_with(&sql, arguments(predicate.values())?)
            .fetch_one(&self.pool)
            .await?;
        Ok(n.max(0) as u64)
    }

    async fn fetch_page<R: Record>(
        &self,
        predicate: &Predicate,
        sort: &SortSpec,
        window: PageWindow,
    ) -> StoreResult<Vec<R>> {
        let slot = predicate.next_slot();
        let sql = format!(
            "{} ORDER BY {} LIMIT ${} OFFSET ${}",
            select_sql(R::CATALOG, predicate),
            sort.order_by_sql(),
            slot,
            slot + 1
        );

        let mut args = arguments(predicate.values())?;
        add_arg(&mut args, window.limit as i64)?;
        add_arg(&mut args, window.offset as i64)?;

        Ok(sqlx::query_as_with::<_, R, _>(&sql, args)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn fetch_parcel(&self, parcel_id: i64) -> StoreResult<Option<ParcelRecord>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE parcel_id = $1",
            column_list(Catalog::Parcels),
            Catalog::Parcels.relation()
        );
        Ok(sqlx::query_as::<_, ParcelRecord>(&sql)
            .bind(parcel_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn cohort_counts(&self) -> StoreResult<Vec<(Cohort, u64)>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT cohort, COUNT(*)::bigint AS n FROM target_cohorts \
             WHERE cohort = ANY($1) GROUP BY cohort",
        )
        .bind(
            Cohort::TARGETS
                .iter()
                .map(|c| c.as_str().to_string())
                .collect::<Vec<_>>(),
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(name, n)| {
                Cohort::parse(&name)
                    .map(|cohort| (cohort, n.max(0) as u64))
                    .ok_or_else(|| StoreError::Decode(format!("unknown cohort: {}", name)))
            })
            .collect()
    }

    fn export<R: Record>(&self, predicate: Predicate, batch_size: usize) -> RowStream<R> {
        let select = format!(
            "{} ORDER BY {}",
            select_sql(R::CATALOG, &predicate),
            SortSpec::identifier_ascending(R::CATALOG).order_by_sql()
        );
        self.cursor(
            export_cursor(R::CATALOG),
            select,
            predicate.values().to_vec(),
            batch_size,
        )
    }

    async fn precomputed_reason(&self, parcel_id: i64) -> StoreResult<Option<String>> {
        let sql = format!(
            "SELECT reason FROM {} WHERE parcel_id = $1",
            DerivedRelation::ExclusionReasons.relation()
        );
        Ok(sqlx::query_scalar::<_, String>(&sql)
            .bind(parcel_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn relation_exists(&self, relation: DerivedRelation) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM pg_catalog.pg_class \
             WHERE relname = $1 AND pg_catalog.pg_table_is_visible(oid))",
        )
        .bind(relation.relation())
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

#[async_trait]
impl SpatialStore for PgStore {
    async fn parcel_exists(&self, parcel_id: i64) -> StoreResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM parcels WHERE parcel_id = $1)")
                .bind(parcel_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn parcel_points(&self, parcel_id: i64) -> StoreResult<Vec<PointLocation>> {
        Ok(sqlx::query_as::<_, PointLocation>(
            "SELECT u.uprn, \
                    ST_X(ST_Transform(u.geom, 4326)) AS lon, \
                    ST_Y(ST_Transform(u.geom, 4326)) AS lat \
             FROM uprn_parcel up \
             JOIN uprns u ON u.uprn = up.uprn \
             WHERE up.parcel_id = $1 \
             ORDER BY u.uprn",
        )
        .bind(parcel_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn precomputed_interior(&self, parcel_id: i64) -> StoreResult<Vec<i64>> {
        let sql = format!(
            "SELECT uprn FROM {} WHERE parcel_id = $1",
            DerivedRelation::PointInteriorJoin.relation()
        );
        Ok(sqlx::query_scalar::<_, i64>(&sql)
            .bind(parcel_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn erodes_to_empty(&self, parcel_id: i64, margin: f64) -> StoreResult<bool> {
        let empty: Option<Option<bool>> = sqlx::query_scalar(
            "SELECT ST_IsEmpty(ST_Buffer(geom, -$2::float8)) FROM parcels WHERE parcel_id = $1",
        )
        .bind(parcel_id)
        .bind(margin)
        .fetch_optional(&self.pool)
        .await?;

        // A missing or NULL geometry has no interior either
        Ok(empty.flatten().unwrap_or(true))
    }

    async fn covered_by_eroded(&self, parcel_id: i64, margin: f64) -> StoreResult<Vec<i64>> {
        Ok(sqlx::query_scalar::<_, i64>(
            "SELECT up.uprn \
             FROM uprn_parcel up \
             JOIN uprns u ON u.uprn = up.uprn \
             JOIN parcels p ON p.parcel_id = up.parcel_id \
             WHERE up.parcel_id = $1 \
               AND ST_Covers(ST_Buffer(p.geom, -$2::float8), u.geom)",
        )
        .bind(parcel_id)
        .bind(margin)
        .fetch_all(&self.pool)
        .await?)
    }
}

#[async_trait]
impl ExclusionStore for PgStore {
    async fn excluded_total(&self) -> StoreResult<u64> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE cohort = $1",
            Catalog::Parcels.relation()
        );
        let n: i64 = sqlx::query_scalar(&sql)
            .bind(Cohort::Excluded.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(n.max(0) as u64)
    }

    async fn precomputed_reason_counts(&self) -> StoreResult<Vec<(String, u64)>> {
        let sql = format!(
            "SELECT reason, COUNT(*)::bigint AS n FROM {} GROUP BY reason",
            DerivedRelation::ExclusionReasons.relation()
        );
        let rows: Vec<(String, i64)> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|(reason, n)| (reason, n.max(0) as u64))
            .collect())
    }

    async fn rule_counts(&self) -> StoreResult<Vec<(ExclusionRule, u64)>> {
        let filters = ExclusionRule::BY_PRIORITY
            .iter()
            .map(|rule| format!("COUNT(*) FILTER (WHERE {})", rule.sql_condition()))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {} FROM {} WHERE cohort = $1",
            filters,
            Catalog::Parcels.relation()
        );

        let row = sqlx::query(&sql)
            .bind(Cohort::Excluded.as_str())
            .fetch_one(&self.pool)
            .await?;

        ExclusionRule::BY_PRIORITY
            .into_iter()
            .enumerate()
            .map(|(i, rule)| -> StoreResult<(ExclusionRule, u64)> {
                let n: i64 = row.try_get(i)?;
                Ok((rule, n.max(0) as u64))
            })
            .collect()
    }

    fn exclusion_candidates(&self, batch_size: usize) -> RowStream<ExclusionCandidate> {
        let select = format!(
            "SELECT {} FROM {} WHERE cohort = ANY($1) ORDER BY parcel_id",
            CANDIDATE_COLUMNS,
            Catalog::Parcels.relation()
        );
        let values = vec![BindValue::TextList(vec![Cohort::Excluded
            .as_str()
            .to_string()])];
        self.cursor(EXCLUSION_CURSOR.to_string(), select, values, batch_size)
    }
}
