use crate::models::{DateDim, Host, Listing, Location, RoomType};
use sqlx::{PgPool, Result as SqlxResult};

/// Repository for the five dimension tables.
///
/// Every lookup takes a batch of keys and returns the rows that exist,
/// ordered by id. An empty key list never reaches the database.
pub struct DimensionRepository {
    pool: PgPool,
}

impl DimensionRepository {
    /// Create a new DimensionRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find listings by id
    pub async fn find_listings(&self, ids: &[String]) -> SqlxResult<Vec<Listing>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, Listing>(
            r#"
            SELECT id, name, minimum_nights
            FROM dim_listing
            WHERE id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
    }

    /// Find hosts by id
    pub async fn find_hosts(&self, ids: &[String]) -> SqlxResult<Vec<Host>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, Host>(
            r#"
            SELECT id, host_name
            FROM dim_host
            WHERE id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
    }

    /// Find locations by id
    pub async fn find_locations(&self, ids: &[String]) -> SqlxResult<Vec<Location>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, Location>(
            r#"
            SELECT id, neighbourhood_group, neighbourhood, latitude, longitude
            FROM dim_location
            WHERE id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
    }

    /// Find room types by id
    pub async fn find_room_types(&self, ids: &[String]) -> SqlxResult<Vec<RoomType>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, RoomType>(
            r#"
            SELECT id, room_type
            FROM dim_room_type
            WHERE id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
    }

    /// Find calendar dates by id
    pub async fn find_dates(&self, ids: &[String]) -> SqlxResult<Vec<DateDim>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, DateDim>(
            r#"
            SELECT id, date, day, month, year, day_of_week, is_weekend
            FROM dim_date
            WHERE id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
    }
}
