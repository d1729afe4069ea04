//! Availability and performance: borough and room-type availability, and the
//! most reviewed listings.

use super::{CatalogQuery, SubQuery};
use crate::aggregate::{group_average, group_distinct_count, top_n, GroupBy, Precision};
use crate::models::{AreaAvailability, ListingDaySnapshot, RoomTypeAvailability, TopRatedListing};
use crate::schema::{Dimension, QueryPlan, StarSchema};
use crate::services::assembler::{one_decimal, whole};
use crate::warehouse::FactFilter;

/// Listings need more reviews than this to be ranked
pub const MIN_REVIEWS_FOR_RANKING: i32 = 10;
pub const TOP_RATED_LIMIT: usize = 10;

pub const UNNAMED_LISTING: &str = "Unnamed listing";
pub const UNKNOWN_NEIGHBOURHOOD: &str = "Unknown";

pub const PROPERTY_AVAILABILITY: CatalogQuery<AreaAvailability> = CatalogQuery {
    sub: SubQuery::PropertyAvailability,
    plan: QueryPlan::new(FactFilter::all(), &[Dimension::Location]),
    run: property_availability,
};

pub const ROOM_TYPE_AVAILABILITY: CatalogQuery<RoomTypeAvailability> = CatalogQuery {
    sub: SubQuery::RoomTypeAvailability,
    plan: QueryPlan::new(FactFilter::all(), &[Dimension::RoomType]),
    run: room_type_availability,
};

pub const TOP_RATED_LISTINGS: CatalogQuery<TopRatedListing> = CatalogQuery {
    sub: SubQuery::TopRatedListings,
    plan: QueryPlan::new(
        FactFilter::all().reviews_above(MIN_REVIEWS_FOR_RANKING),
        &[Dimension::Listing, Dimension::Location],
    ),
    run: top_rated_listings,
};

/// Average availability and distinct listings per group, in first-seen order
fn availability_by<K>(
    schema: &StarSchema,
    key: impl Fn(&ListingDaySnapshot) -> Option<K> + Copy,
) -> Vec<(K, i64, u64)>
where
    K: Eq + std::hash::Hash + Clone,
{
    let listings = group_distinct_count(schema.facts(), key, |f| f.listing_id.clone());
    group_average(schema.facts(), key, |f| f.availability(), Precision::Integer)
        .into_iter()
        .map(|(k, avg)| {
            let count = listings
                .iter()
                .find(|(other, _)| *other == k)
                .map_or(0, |(_, n)| *n);
            (k, whole(avg), count)
        })
        .collect()
}

pub fn property_availability(schema: &StarSchema) -> Vec<AreaAvailability> {
    let area = |f: &ListingDaySnapshot| {
        schema
            .join_location(f)
            .and_then(|l| l.neighbourhood_group.clone())
    };

    let mut rows: Vec<AreaAvailability> = availability_by(schema, area)
        .into_iter()
        .map(|(area, avg_availability, listings)| AreaAvailability {
            area,
            avg_availability,
            listings,
        })
        .collect();

    rows.sort_by(|a, b| b.avg_availability.cmp(&a.avg_availability));
    rows
}

/// Sorted ascending: the least available room type comes first
pub fn room_type_availability(schema: &StarSchema) -> Vec<RoomTypeAvailability> {
    let room_type = |f: &ListingDaySnapshot| {
        schema
            .join_room_type(f)
            .and_then(|r| r.label())
            .map(|label| label.as_str().to_string())
    };

    let mut rows: Vec<RoomTypeAvailability> = availability_by(schema, room_type)
        .into_iter()
        .map(|(room_type, avg_availability, listings)| RoomTypeAvailability {
            room_type,
            avg_availability,
            listings,
        })
        .collect();

    rows.sort_by(|a, b| a.avg_availability.cmp(&b.avg_availability));
    rows
}

/// Top listings by review count. A listing observed on several days is
/// ranked once, by its highest count.
pub fn top_rated_listings(schema: &StarSchema) -> Vec<TopRatedListing> {
    let mut best: GroupBy<String, Option<&ListingDaySnapshot>> = GroupBy::new();

    for fact in schema.facts() {
        let (Some(listing_id), Some(reviews)) = (&fact.listing_id, fact.number_of_reviews) else {
            continue;
        };
        if reviews <= MIN_REVIEWS_FOR_RANKING {
            continue;
        }
        let slot = best.entry(listing_id.clone());
        if slot.map_or(true, |b| b.number_of_reviews < Some(reviews)) {
            *slot = Some(fact);
        }
    }

    let ranked = top_n(
        best.into_vec().into_iter().filter_map(|(_, f)| f).collect(),
        |f: &&ListingDaySnapshot| f.number_of_reviews,
        TOP_RATED_LIMIT,
    );

    ranked
        .into_iter()
        .map(|fact| TopRatedListing {
            name: schema
                .join_listing(fact)
                .and_then(|l| l.name.clone())
                .unwrap_or_else(|| UNNAMED_LISTING.to_string()),
            neighbourhood: schema
                .join_location(fact)
                .and_then(|l| l.neighbourhood.clone())
                .unwrap_or_else(|| UNKNOWN_NEIGHBOURHOOD.to_string()),
            reviews: i64::from(fact.number_of_reviews.unwrap_or(0)),
            reviews_per_month: fact.reviews_per_month.map(one_decimal),
            price: fact.positive_price().map(whole),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Listing, Location, RoomType};
    use rust_decimal::Decimal;

    fn fact(id: &str, listing: &str, room: &str, availability: Option<i32>) -> ListingDaySnapshot {
        ListingDaySnapshot {
            id: id.to_string(),
            listing_id: Some(listing.to_string()),
            host_id: None,
            location_id: Some("loc".to_string()),
            room_type_id: Some(room.to_string()),
            date_id: None,
            price: Some(Decimal::from(120)),
            availability_365: availability,
            number_of_reviews: None,
            reviews_per_month: None,
            calculated_host_listings_count: None,
        }
    }

    fn reviewed(id: &str, listing: &str, reviews: i32) -> ListingDaySnapshot {
        ListingDaySnapshot {
            number_of_reviews: Some(reviews),
            reviews_per_month: Some(Decimal::new(425, 2)),
            ..fact(id, listing, "r1", Some(10))
        }
    }

    fn schema(facts: Vec<ListingDaySnapshot>) -> StarSchema {
        StarSchema::new(facts)
            .with_locations(vec![Location {
                id: "loc".to_string(),
                neighbourhood_group: Some("Bronx".to_string()),
                neighbourhood: Some("Fordham".to_string()),
                latitude: None,
                longitude: None,
            }])
            .with_room_types(vec![
                RoomType {
                    id: "r1".to_string(),
                    room_type: Some("Private room".to_string()),
                },
                RoomType {
                    id: "r2".to_string(),
                    room_type: Some("Entire home/apt".to_string()),
                },
            ])
            .with_listings(vec![Listing {
                id: "a".to_string(),
                name: Some("Sunny loft".to_string()),
                minimum_nights: Some(2),
            }])
    }

    #[test]
    fn test_property_availability_ignores_nulls() {
        let rows = property_availability(&schema(vec![
            fact("f1", "a", "r1", Some(100)),
            fact("f2", "b", "r1", None),
            fact("f3", "c", "r1", Some(201)),
        ]));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].area, "Bronx");
        assert_eq!(rows[0].avg_availability, 151);
        assert_eq!(rows[0].listings, 3);
    }

    #[test]
    fn test_out_of_range_availability_is_kept() {
        let rows = property_availability(&schema(vec![fact("f1", "a", "r1", Some(400))]));
        assert_eq!(rows[0].avg_availability, 400);
    }

    #[test]
    fn test_room_types_sorted_ascending() {
        let rows = room_type_availability(&schema(vec![
            fact("f1", "a", "r1", Some(300)),
            fact("f2", "b", "r2", Some(20)),
            fact("f3", "c", "missing", Some(0)),
        ]));
        let labels: Vec<&str> = rows.iter().map(|r| r.room_type.as_str()).collect();
        assert_eq!(labels, vec!["Entire home/apt", "Private room"]);
    }

    #[test]
    fn test_top_rated_ranks_each_listing_once() {
        let rows = top_rated_listings(&schema(vec![
            reviewed("f1", "a", 40),
            reviewed("f2", "a", 45),
            reviewed("f3", "b", 30),
            reviewed("f4", "c", 10),
        ]));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Sunny loft");
        assert_eq!(rows[0].reviews, 45);
        assert_eq!(rows[0].neighbourhood, "Fordham");
        assert!((rows[0].reviews_per_month.unwrap() - 4.3).abs() < 1e-9);
        assert_eq!(rows[0].price, Some(120));
        assert_eq!(rows[1].name, UNNAMED_LISTING);
    }

    #[test]
    fn test_top_rated_limit() {
        let facts = (0..15)
            .map(|i| reviewed(&format!("f{:02}", i), &format!("l{:02}", i), 11 + i))
            .collect();
        let rows = top_rated_listings(&schema(facts));
        assert_eq!(rows.len(), TOP_RATED_LIMIT);
        assert_eq!(rows[0].reviews, 25);
    }
}
