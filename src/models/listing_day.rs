use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Fact row: one listing observed on one day (`fact_listing_daily`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ListingDaySnapshot {
    pub id: String,
    pub listing_id: Option<String>,
    pub host_id: Option<String>,
    pub location_id: Option<String>,
    pub room_type_id: Option<String>,
    pub date_id: Option<String>,
    pub price: Option<Decimal>, // DECIMAL(10, 2) in database
    pub availability_365: Option<i32>,
    pub number_of_reviews: Option<i32>,
    pub reviews_per_month: Option<Decimal>, // DECIMAL(5, 2) in database
    pub calculated_host_listings_count: Option<i32>,
}

impl ListingDaySnapshot {
    /// Price, only when it is strictly positive
    pub fn positive_price(&self) -> Option<Decimal> {
        self.price.filter(|p| *p > Decimal::ZERO)
    }

    /// Availability as a decimal measure. Out-of-range values are kept as-is.
    pub fn availability(&self) -> Option<Decimal> {
        self.availability_365.map(Decimal::from)
    }

    /// Review count as a decimal measure
    pub fn reviews(&self) -> Option<Decimal> {
        self.number_of_reviews.map(Decimal::from)
    }
}
