use crate::models::ListingDaySnapshot;
use crate::warehouse::FactFilter;
use sqlx::{PgPool, Postgres, QueryBuilder, Result as SqlxResult};

/// Repository for `fact_listing_daily` scans
pub struct FactRepository {
    pool: PgPool,
}

impl FactRepository {
    /// Create a new FactRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Scan fact rows matching `filter`, ordered by id
    pub async fn scan(&self, filter: &FactFilter) -> SqlxResult<Vec<ListingDaySnapshot>> {
        let mut query = QueryBuilder::<Postgres>::new(
            r#"
            SELECT
                id,
                listing_id,
                host_id,
                location_id,
                room_type_id,
                date_id,
                price,
                availability_365,
                number_of_reviews,
                reviews_per_month,
                calculated_host_listings_count
            FROM fact_listing_daily
            WHERE TRUE
            "#,
        );

        if filter.positive_price {
            query.push(" AND price > 0");
        }
        if filter.with_reviews {
            query.push(" AND number_of_reviews IS NOT NULL");
        }
        if let Some(min) = filter.reviews_above {
            query.push(" AND number_of_reviews > ").push_bind(min);
        }
        query.push(" ORDER BY id");

        query
            .build_query_as::<ListingDaySnapshot>()
            .fetch_all(&self.pool)
            .await
    }

    /// Count all fact rows
    pub async fn count(&self) -> SqlxResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM fact_listing_daily")
            .fetch_one(&self.pool)
            .await
    }
}
