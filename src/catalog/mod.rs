//! Query catalog: the named sub-queries behind each dashboard view.
//!
//! Every sub-query is a [`CatalogQuery`]: a [`QueryPlan`] saying which fact
//! rows and dimensions to load, and a pure function composing the
//! aggregation primitives over the loaded [`StarSchema`].

pub mod availability;
pub mod general_stats;
pub mod host_listing;
pub mod price_location;
pub mod review_trends;

use crate::aggregate::percentage_of_total;
use crate::models::{RangeShare, ViewName};
use crate::schema::{QueryPlan, StarSchema};
use std::fmt;

/// Every sub-query in the catalog, one per payload field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubQuery {
    NeighbourhoodPrices,
    PriceDistribution,
    AvgPriceByArea,
    PropertyAvailability,
    RoomTypeAvailability,
    TopRatedListings,
    MonthlyReviews,
    PriceVsReviews,
    ReviewDistribution,
    HostDistribution,
    TopHosts,
    ListingsByHost,
    GeneralStats,
}

impl SubQuery {
    pub const ALL: [SubQuery; 13] = [
        SubQuery::NeighbourhoodPrices,
        SubQuery::PriceDistribution,
        SubQuery::AvgPriceByArea,
        SubQuery::PropertyAvailability,
        SubQuery::RoomTypeAvailability,
        SubQuery::TopRatedListings,
        SubQuery::MonthlyReviews,
        SubQuery::PriceVsReviews,
        SubQuery::ReviewDistribution,
        SubQuery::HostDistribution,
        SubQuery::TopHosts,
        SubQuery::ListingsByHost,
        SubQuery::GeneralStats,
    ];

    /// View this sub-query belongs to
    pub fn view(&self) -> ViewName {
        match self {
            SubQuery::NeighbourhoodPrices
            | SubQuery::PriceDistribution
            | SubQuery::AvgPriceByArea => ViewName::PriceLocation,
            SubQuery::PropertyAvailability
            | SubQuery::RoomTypeAvailability
            | SubQuery::TopRatedListings => ViewName::AvailabilityPerformance,
            SubQuery::MonthlyReviews | SubQuery::PriceVsReviews | SubQuery::ReviewDistribution => {
                ViewName::ReviewTrends
            }
            SubQuery::HostDistribution | SubQuery::TopHosts | SubQuery::ListingsByHost => {
                ViewName::HostListing
            }
            SubQuery::GeneralStats => ViewName::GeneralStats,
        }
    }

    /// Payload field name the sub-query fills
    pub fn field(&self) -> &'static str {
        match self {
            SubQuery::NeighbourhoodPrices => "neighbourhoodPrices",
            SubQuery::PriceDistribution => "priceDistribution",
            SubQuery::AvgPriceByArea => "avgPriceByArea",
            SubQuery::PropertyAvailability => "propertyAvailability",
            SubQuery::RoomTypeAvailability => "roomTypeAvailability",
            SubQuery::TopRatedListings => "topRatedListings",
            SubQuery::MonthlyReviews => "monthlyReviews",
            SubQuery::PriceVsReviews => "priceVsReviews",
            SubQuery::ReviewDistribution => "reviewDistribution",
            SubQuery::HostDistribution => "hostDistribution",
            SubQuery::TopHosts => "topHosts",
            SubQuery::ListingsByHost => "listingsByHost",
            SubQuery::GeneralStats => "generalStats",
        }
    }
}

impl fmt::Display for SubQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.view(), self.field())
    }
}

/// A sub-query: what to load and how to aggregate it
pub struct CatalogQuery<T> {
    pub sub: SubQuery,
    pub plan: QueryPlan,
    pub run: fn(&StarSchema) -> Vec<T>,
}

impl<T> CatalogQuery<T> {
    pub fn evaluate(&self, schema: &StarSchema) -> Vec<T> {
        (self.run)(schema)
    }
}

/// Count/percentage rows for a bucket distribution.
///
/// Empty buckets are left out; percentages are taken over the total of all
/// buckets.
pub fn range_shares(counts: Vec<(&'static str, u64)>) -> Vec<RangeShare> {
    let total: u64 = counts.iter().map(|(_, count)| count).sum();
    counts
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(range, count)| RangeShare {
            range: range.to_string(),
            count,
            percentage: percentage_of_total(count, total),
        })
        .collect()
}
