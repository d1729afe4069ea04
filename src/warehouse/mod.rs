//! Warehouse collaborator: bulk fact scans and dimension lookups.
//!
//! The engine never writes. Implementations acquire whatever connection they
//! need per call and release it on return.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryWarehouse;
pub use postgres::PgWarehouse;

use crate::models::{DateDim, Host, Listing, ListingDaySnapshot, Location, RoomType};
use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised by a warehouse backend
#[derive(Error, Debug)]
pub enum WarehouseError {
    #[error("Warehouse unavailable: {0}")]
    Unavailable(String),

    #[error("Warehouse query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("Malformed row in {table}: {message}")]
    Malformed { table: String, message: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WarehouseError {
    pub fn malformed(table: &str, message: impl Into<String>) -> Self {
        WarehouseError::Malformed {
            table: table.to_string(),
            message: message.into(),
        }
    }
}

/// Result type for warehouse operations
pub type WarehouseResult<T> = Result<T, WarehouseError>;

/// Predicates pushed down to a fact scan. The default matches every row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FactFilter {
    pub positive_price: bool,
    pub with_reviews: bool,
    pub reviews_above: Option<i32>,
}

impl FactFilter {
    pub const fn all() -> Self {
        Self {
            positive_price: false,
            with_reviews: false,
            reviews_above: None,
        }
    }

    /// Only rows with `price > 0`
    pub const fn positive_price(mut self) -> Self {
        self.positive_price = true;
        self
    }

    /// Only rows with a non-null review count
    pub const fn with_reviews(mut self) -> Self {
        self.with_reviews = true;
        self
    }

    /// Only rows with `number_of_reviews > min`
    pub const fn reviews_above(mut self, min: i32) -> Self {
        self.reviews_above = Some(min);
        self
    }

    /// In-memory evaluation, identical to the SQL pushed down by [`PgWarehouse`]
    pub fn matches(&self, fact: &ListingDaySnapshot) -> bool {
        if self.positive_price && !fact.price.is_some_and(|p| p > Decimal::ZERO) {
            return false;
        }
        if self.with_reviews && fact.number_of_reviews.is_none() {
            return false;
        }
        if let Some(min) = self.reviews_above {
            if !fact.number_of_reviews.is_some_and(|n| n > min) {
                return false;
            }
        }
        true
    }
}

/// Read-only access to the star schema
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Fact rows matching `filter`, ordered by fact id
    async fn scan_facts(&self, filter: &FactFilter) -> WarehouseResult<Vec<ListingDaySnapshot>>;

    /// Listing rows for the given keys. Unknown keys are absent from the result.
    async fn listings(&self, ids: &[String]) -> WarehouseResult<Vec<Listing>>;

    async fn hosts(&self, ids: &[String]) -> WarehouseResult<Vec<Host>>;

    async fn locations(&self, ids: &[String]) -> WarehouseResult<Vec<Location>>;

    async fn room_types(&self, ids: &[String]) -> WarehouseResult<Vec<RoomType>>;

    async fn dates(&self, ids: &[String]) -> WarehouseResult<Vec<DateDim>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fact(price: Option<i64>, reviews: Option<i32>) -> ListingDaySnapshot {
        ListingDaySnapshot {
            id: "f1".to_string(),
            listing_id: Some("l1".to_string()),
            host_id: None,
            location_id: None,
            room_type_id: None,
            date_id: None,
            price: price.map(Decimal::from),
            availability_365: Some(400),
            number_of_reviews: reviews,
            reviews_per_month: None,
            calculated_host_listings_count: None,
        }
    }

    #[test]
    fn test_default_filter_matches_everything() {
        assert!(FactFilter::all().matches(&fact(None, None)));
        assert!(FactFilter::default().matches(&fact(Some(0), Some(0))));
    }

    #[test]
    fn test_positive_price_filter() {
        let filter = FactFilter::all().positive_price();
        assert!(filter.matches(&fact(Some(10), None)));
        assert!(!filter.matches(&fact(Some(0), None)));
        assert!(!filter.matches(&fact(None, None)));
    }

    #[test]
    fn test_reviews_above_filter() {
        let filter = FactFilter::all().reviews_above(10);
        assert!(filter.matches(&fact(None, Some(11))));
        assert!(!filter.matches(&fact(None, Some(10))));
        assert!(!filter.matches(&fact(None, None)));
    }
}
