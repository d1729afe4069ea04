//! Fallback policy: every placeholder row the dashboard may be served, in
//! one table keyed by sub-query.
//!
//! Nulls are absent from aggregates but shown as zero here, so a chart never
//! receives a missing value from a placeholder.

use crate::catalog::SubQuery;
use crate::models::{
    AreaAvailability, AreaPrice, AreaPriceReviews, GeneralStats, HostCategoryShare,
    HostRangeListings, MonthlyReviews, NeighbourhoodPrice, RangeShare, RoomTypeAvailability,
    TopHost, TopRatedListing,
};

pub const NO_DATA: &str = "No data";

/// A single placeholder entry for one sub-query's array
#[derive(Debug, Clone, PartialEq)]
pub enum PlaceholderRow {
    NeighbourhoodPrice(NeighbourhoodPrice),
    Range(RangeShare),
    AreaPrice(AreaPrice),
    AreaAvailability(AreaAvailability),
    RoomTypeAvailability(RoomTypeAvailability),
    TopRatedListing(TopRatedListing),
    MonthlyReviews(MonthlyReviews),
    AreaPriceReviews(AreaPriceReviews),
    HostCategory(HostCategoryShare),
    TopHost(TopHost),
    HostRange(HostRangeListings),
    GeneralStats(GeneralStats),
}

macro_rules! placeholder_conversions {
    ($($variant:ident => $row:ty),* $(,)?) => {
        $(
            impl TryFrom<PlaceholderRow> for $row {
                type Error = PlaceholderRow;

                fn try_from(row: PlaceholderRow) -> Result<Self, Self::Error> {
                    match row {
                        PlaceholderRow::$variant(value) => Ok(value),
                        other => Err(other),
                    }
                }
            }
        )*
    };
}

placeholder_conversions! {
    NeighbourhoodPrice => NeighbourhoodPrice,
    Range => RangeShare,
    AreaPrice => AreaPrice,
    AreaAvailability => AreaAvailability,
    RoomTypeAvailability => RoomTypeAvailability,
    TopRatedListing => TopRatedListing,
    MonthlyReviews => MonthlyReviews,
    AreaPriceReviews => AreaPriceReviews,
    HostCategory => HostCategoryShare,
    TopHost => TopHost,
    HostRange => HostRangeListings,
    GeneralStats => GeneralStats,
}

fn no_data_range() -> RangeShare {
    RangeShare {
        range: NO_DATA.to_string(),
        count: 0,
        percentage: 0,
    }
}

pub struct FallbackPolicy;

impl FallbackPolicy {
    /// Row substituted when `sub` fails
    pub fn on_failure(sub: SubQuery) -> PlaceholderRow {
        match sub {
            SubQuery::NeighbourhoodPrices => PlaceholderRow::NeighbourhoodPrice(NeighbourhoodPrice {
                neighbourhood: NO_DATA.to_string(),
                neighbourhood_group: NO_DATA.to_string(),
                avg_price: 0,
                listings: 0,
                latitude: None,
                longitude: None,
            }),
            SubQuery::PriceDistribution => PlaceholderRow::Range(no_data_range()),
            SubQuery::AvgPriceByArea => PlaceholderRow::AreaPrice(AreaPrice {
                area: NO_DATA.to_string(),
                avg_price: 0,
                listings: 0,
            }),
            SubQuery::PropertyAvailability => PlaceholderRow::AreaAvailability(AreaAvailability {
                area: NO_DATA.to_string(),
                avg_availability: 0,
                listings: 0,
            }),
            SubQuery::RoomTypeAvailability => {
                PlaceholderRow::RoomTypeAvailability(RoomTypeAvailability {
                    room_type: NO_DATA.to_string(),
                    avg_availability: 0,
                    listings: 0,
                })
            }
            SubQuery::TopRatedListings => PlaceholderRow::TopRatedListing(TopRatedListing {
                name: NO_DATA.to_string(),
                neighbourhood: NO_DATA.to_string(),
                reviews: 0,
                reviews_per_month: Some(0.0),
                price: Some(0),
            }),
            // Review trends degrade the same way whether empty or failed
            SubQuery::MonthlyReviews | SubQuery::PriceVsReviews | SubQuery::ReviewDistribution => {
                Self::review_trend_placeholder(sub)
            }
            SubQuery::HostDistribution => PlaceholderRow::HostCategory(HostCategoryShare {
                category: NO_DATA.to_string(),
                hosts: 0,
                percentage: 0,
            }),
            SubQuery::TopHosts => PlaceholderRow::TopHost(TopHost {
                host_name: NO_DATA.to_string(),
                listings: 0,
                total_reviews: 0,
                avg_price: Some(0),
                estimated_revenue: Some(0),
            }),
            SubQuery::ListingsByHost => PlaceholderRow::HostRange(HostRangeListings {
                range: NO_DATA.to_string(),
                hosts: 0,
                total_listings: 0,
            }),
            SubQuery::GeneralStats => PlaceholderRow::GeneralStats(Self::general_stats()),
        }
    }

    /// Row substituted when `sub` legitimately matched nothing. `None` means
    /// the empty array is served as-is.
    pub fn on_empty(sub: SubQuery) -> Option<PlaceholderRow> {
        match sub {
            SubQuery::MonthlyReviews | SubQuery::PriceVsReviews | SubQuery::ReviewDistribution => {
                Some(Self::review_trend_placeholder(sub))
            }
            _ => None,
        }
    }

    fn review_trend_placeholder(sub: SubQuery) -> PlaceholderRow {
        match sub {
            SubQuery::MonthlyReviews => PlaceholderRow::MonthlyReviews(MonthlyReviews {
                month: NO_DATA.to_string(),
                reviews: 0,
            }),
            SubQuery::PriceVsReviews => PlaceholderRow::AreaPriceReviews(AreaPriceReviews {
                area: NO_DATA.to_string(),
                avg_price: Some(0),
                total_reviews: 0,
            }),
            _ => PlaceholderRow::Range(RangeShare {
                range: "0 reviews".to_string(),
                count: 1,
                percentage: 100,
            }),
        }
    }

    /// Header summary served when the warehouse cannot be reached. These are
    /// the published 2019 NYC figures, flagged so the tiles can mark them.
    pub fn general_stats() -> GeneralStats {
        GeneralStats {
            total_listings: 48_895,
            total_hosts: 37_457,
            total_reviews: 1_138_005,
            total_areas: 221,
            avg_price: 153,
            avg_availability: 113,
            fallback: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_every_sub_query_has_a_failure_row() {
        for sub in SubQuery::ALL {
            // must not panic, and must convert to the field's row type
            let row = FallbackPolicy::on_failure(sub);
            let matches_field = match sub {
                SubQuery::NeighbourhoodPrices => NeighbourhoodPrice::try_from(row).is_ok(),
                SubQuery::PriceDistribution | SubQuery::ReviewDistribution => {
                    RangeShare::try_from(row).is_ok()
                }
                SubQuery::AvgPriceByArea => AreaPrice::try_from(row).is_ok(),
                SubQuery::PropertyAvailability => AreaAvailability::try_from(row).is_ok(),
                SubQuery::RoomTypeAvailability => RoomTypeAvailability::try_from(row).is_ok(),
                SubQuery::TopRatedListings => TopRatedListing::try_from(row).is_ok(),
                SubQuery::MonthlyReviews => MonthlyReviews::try_from(row).is_ok(),
                SubQuery::PriceVsReviews => AreaPriceReviews::try_from(row).is_ok(),
                SubQuery::HostDistribution => HostCategoryShare::try_from(row).is_ok(),
                SubQuery::TopHosts => TopHost::try_from(row).is_ok(),
                SubQuery::ListingsByHost => HostRangeListings::try_from(row).is_ok(),
                SubQuery::GeneralStats => GeneralStats::try_from(row).is_ok(),
            };
            assert!(matches_field, "{}", sub);
        }
    }

    #[test]
    fn test_empty_review_distribution_placeholder() {
        let row = FallbackPolicy::on_empty(SubQuery::ReviewDistribution).unwrap();
        let share = RangeShare::try_from(row).unwrap();
        assert_eq!(
            serde_json::to_value(&share).unwrap(),
            json!({"range": "0 reviews", "count": 1, "percentage": 100})
        );
    }

    #[test]
    fn test_only_review_trends_have_empty_placeholders() {
        let with_empty: Vec<SubQuery> = SubQuery::ALL
            .into_iter()
            .filter(|s| FallbackPolicy::on_empty(*s).is_some())
            .collect();
        assert_eq!(
            with_empty,
            vec![
                SubQuery::MonthlyReviews,
                SubQuery::PriceVsReviews,
                SubQuery::ReviewDistribution,
            ]
        );
    }

    #[test]
    fn test_general_stats_fallback_is_flagged() {
        let stats = serde_json::to_value(FallbackPolicy::general_stats()).unwrap();
        assert_eq!(stats["totalListings"], 48_895);
        assert_eq!(stats["fallback"], true);
    }

    #[test]
    fn test_placeholders_show_zero_not_null() {
        let row = TopHost::try_from(FallbackPolicy::on_failure(SubQuery::TopHosts)).unwrap();
        let value = serde_json::to_value(row).unwrap();
        assert_eq!(value["avgPrice"], 0);
        assert_eq!(value["estimatedRevenue"], 0);
    }
}
