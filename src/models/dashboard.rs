//! Response payloads consumed by the dashboard's chart components.
//!
//! Field names are part of the contract with the frontend and are serialized
//! in camelCase. Renaming a field is a breaking change.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The five named analytical views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViewName {
    PriceLocation,
    AvailabilityPerformance,
    ReviewTrends,
    HostListing,
    GeneralStats,
}

impl ViewName {
    pub const ALL: [ViewName; 5] = [
        ViewName::PriceLocation,
        ViewName::AvailabilityPerformance,
        ViewName::ReviewTrends,
        ViewName::HostListing,
        ViewName::GeneralStats,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewName::PriceLocation => "priceLocation",
            ViewName::AvailabilityPerformance => "availabilityPerformance",
            ViewName::ReviewTrends => "reviewTrends",
            ViewName::HostListing => "hostListing",
            ViewName::GeneralStats => "generalStats",
        }
    }
}

impl fmt::Display for ViewName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Count and share of one labelled range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeShare {
    pub range: String,
    pub count: u64,
    pub percentage: u32,
}

// ---------------------------------------------------------------------------
// Price / location
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NeighbourhoodPrice {
    pub neighbourhood: String,
    pub neighbourhood_group: String,
    pub avg_price: i64,
    pub listings: u64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaPrice {
    pub area: String,
    pub avg_price: i64,
    pub listings: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceLocationData {
    pub neighbourhood_prices: Vec<NeighbourhoodPrice>,
    pub price_distribution: Vec<RangeShare>,
    pub avg_price_by_area: Vec<AreaPrice>,
}

// ---------------------------------------------------------------------------
// Availability / performance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaAvailability {
    pub area: String,
    pub avg_availability: i64,
    pub listings: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomTypeAvailability {
    pub room_type: String,
    pub avg_availability: i64,
    pub listings: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopRatedListing {
    pub name: String,
    pub neighbourhood: String,
    pub reviews: i64,
    pub reviews_per_month: Option<f64>,
    pub price: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityPerformanceData {
    pub property_availability: Vec<AreaAvailability>,
    pub room_type_availability: Vec<RoomTypeAvailability>,
    pub top_rated_listings: Vec<TopRatedListing>,
}

// ---------------------------------------------------------------------------
// Review trends
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyReviews {
    pub month: String,
    pub reviews: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaPriceReviews {
    pub area: String,
    pub avg_price: Option<i64>,
    pub total_reviews: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewTrendData {
    pub monthly_reviews: Vec<MonthlyReviews>,
    pub price_vs_reviews: Vec<AreaPriceReviews>,
    pub review_distribution: Vec<RangeShare>,
}

// ---------------------------------------------------------------------------
// Host / listing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostCategoryShare {
    pub category: String,
    pub hosts: u64,
    pub percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopHost {
    pub host_name: String,
    pub listings: u64,
    pub total_reviews: i64,
    pub avg_price: Option<i64>,
    pub estimated_revenue: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostRangeListings {
    pub range: String,
    pub hosts: u64,
    pub total_listings: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostListingData {
    pub host_distribution: Vec<HostCategoryShare>,
    pub top_hosts: Vec<TopHost>,
    pub listings_by_host: Vec<HostRangeListings>,
}

// ---------------------------------------------------------------------------
// General stats
// ---------------------------------------------------------------------------

fn is_false(value: &bool) -> bool {
    !*value
}

/// Header-tile summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralStats {
    pub total_listings: u64,
    pub total_hosts: u64,
    pub total_reviews: i64,
    pub total_areas: u64,
    pub avg_price: i64,
    pub avg_availability: i64,
    /// Set only on the substituted summary served when the warehouse is unreachable
    #[serde(default, skip_serializing_if = "is_false")]
    pub fallback: bool,
}
