//! Postgres-backed warehouse over the ETL's star-schema tables.

use super::{FactFilter, Warehouse, WarehouseError, WarehouseResult};
use crate::models::{DateDim, Host, Listing, ListingDaySnapshot, Location, RoomType};
use crate::repositories::{DimensionRepository, FactRepository};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::debug;

/// Warehouse client backed by a shared connection pool.
///
/// Each call checks a connection out of the pool and returns it when the
/// query finishes, successfully or not.
#[derive(Clone)]
pub struct PgWarehouse {
    fact_repo: Arc<FactRepository>,
    dimension_repo: Arc<DimensionRepository>,
}

impl PgWarehouse {
    /// Create a new PgWarehouse over `pool`
    pub fn new(pool: PgPool) -> Self {
        Self {
            fact_repo: Arc::new(FactRepository::new(pool.clone())),
            dimension_repo: Arc::new(DimensionRepository::new(pool)),
        }
    }
}

/// Classify a driver error: lost connectivity versus rows we cannot decode
fn classify(table: &str, err: sqlx::Error) -> WarehouseError {
    match err {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => WarehouseError::Unavailable(format!("{}: {}", table, err)),
        sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::ColumnNotFound(_) => WarehouseError::malformed(table, err.to_string()),
        other => WarehouseError::Query(other),
    }
}

#[async_trait]
impl Warehouse for PgWarehouse {
    async fn scan_facts(&self, filter: &FactFilter) -> WarehouseResult<Vec<ListingDaySnapshot>> {
        let rows = self
            .fact_repo
            .scan(filter)
            .await
            .map_err(|e| classify("fact_listing_daily", e))?;
        debug!("Scanned {} fact rows ({:?})", rows.len(), filter);
        Ok(rows)
    }

    async fn listings(&self, ids: &[String]) -> WarehouseResult<Vec<Listing>> {
        self.dimension_repo
            .find_listings(ids)
            .await
            .map_err(|e| classify("dim_listing", e))
    }

    async fn hosts(&self, ids: &[String]) -> WarehouseResult<Vec<Host>> {
        self.dimension_repo
            .find_hosts(ids)
            .await
            .map_err(|e| classify("dim_host", e))
    }

    async fn locations(&self, ids: &[String]) -> WarehouseResult<Vec<Location>> {
        self.dimension_repo
            .find_locations(ids)
            .await
            .map_err(|e| classify("dim_location", e))
    }

    async fn room_types(&self, ids: &[String]) -> WarehouseResult<Vec<RoomType>> {
        self.dimension_repo
            .find_room_types(ids)
            .await
            .map_err(|e| classify("dim_room_type", e))
    }

    async fn dates(&self, ids: &[String]) -> WarehouseResult<Vec<DateDim>> {
        self.dimension_repo
            .find_dates(ids)
            .await
            .map_err(|e| classify("dim_date", e))
    }
}
