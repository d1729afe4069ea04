//! Price by location: neighbourhood averages for the map, the price range
//! distribution and borough-level averages.

use super::{range_shares, CatalogQuery, SubQuery};
use crate::aggregate::{
    at_least, bucket_counts, group_average, group_distinct_count, having_filter, GroupBy, Mean,
    Precision, PRICE_RANGES,
};
use crate::models::{AreaPrice, ListingDaySnapshot, NeighbourhoodPrice, RangeShare};
use crate::schema::{Dimension, QueryPlan, StarSchema};
use crate::services::assembler::{coordinate, whole};
use crate::warehouse::FactFilter;
use std::collections::HashSet;

/// Neighbourhoods with fewer distinct listings are not shown
pub const MIN_NEIGHBOURHOOD_LISTINGS: u64 = 5;

pub const NEIGHBOURHOOD_PRICES: CatalogQuery<NeighbourhoodPrice> = CatalogQuery {
    sub: SubQuery::NeighbourhoodPrices,
    plan: QueryPlan::new(FactFilter::all().positive_price(), &[Dimension::Location]),
    run: neighbourhood_prices,
};

pub const PRICE_DISTRIBUTION: CatalogQuery<RangeShare> = CatalogQuery {
    sub: SubQuery::PriceDistribution,
    plan: QueryPlan::new(FactFilter::all().positive_price(), &[]),
    run: price_distribution,
};

pub const AVG_PRICE_BY_AREA: CatalogQuery<AreaPrice> = CatalogQuery {
    sub: SubQuery::AvgPriceByArea,
    plan: QueryPlan::new(FactFilter::all().positive_price(), &[Dimension::Location]),
    run: avg_price_by_area,
};

#[derive(Default)]
struct NeighbourhoodAcc {
    price: Mean,
    listings: HashSet<String>,
    latitude: Mean,
    longitude: Mean,
}

pub fn neighbourhood_prices(schema: &StarSchema) -> Vec<NeighbourhoodPrice> {
    let mut groups: GroupBy<(String, String), NeighbourhoodAcc> = GroupBy::new();

    for fact in schema.facts() {
        let Some(location) = schema.join_location(fact) else {
            continue;
        };
        let (Some(neighbourhood), Some(group)) =
            (&location.neighbourhood, &location.neighbourhood_group)
        else {
            continue;
        };
        let Some(price) = fact.positive_price() else {
            continue;
        };

        let acc = groups.entry((neighbourhood.clone(), group.clone()));
        acc.price.push(price);
        if let Some(listing_id) = &fact.listing_id {
            acc.listings.insert(listing_id.clone());
        }
        if let Some(lat) = location.latitude {
            acc.latitude.push(lat);
        }
        if let Some(lon) = location.longitude {
            acc.longitude.push(lon);
        }
    }

    let min_listings = at_least(MIN_NEIGHBOURHOOD_LISTINGS);
    let kept = having_filter(groups.into_vec(), |(_, acc)| {
        min_listings(&(acc.listings.len() as u64))
    });

    let mut rows: Vec<NeighbourhoodPrice> = kept
        .into_iter()
        .filter_map(|((neighbourhood, neighbourhood_group), acc)| {
            Some(NeighbourhoodPrice {
                neighbourhood,
                neighbourhood_group,
                avg_price: whole(acc.price.value()?),
                listings: acc.listings.len() as u64,
                latitude: acc.latitude.value().and_then(coordinate),
                longitude: acc.longitude.value().and_then(coordinate),
            })
        })
        .collect();

    rows.sort_by(|a, b| b.avg_price.cmp(&a.avg_price));
    rows
}

pub fn price_distribution(schema: &StarSchema) -> Vec<RangeShare> {
    range_shares(bucket_counts(
        schema.facts(),
        |f| f.positive_price(),
        &PRICE_RANGES,
    ))
}

pub fn avg_price_by_area(schema: &StarSchema) -> Vec<AreaPrice> {
    let area = |f: &ListingDaySnapshot| {
        schema
            .join_location(f)
            .and_then(|l| l.neighbourhood_group.clone())
    };

    let averages = group_average(schema.facts(), area, |f| f.positive_price(), Precision::Integer);
    let listings = group_distinct_count(schema.facts(), area, |f| f.listing_id.clone());

    let mut rows: Vec<AreaPrice> = averages
        .into_iter()
        .map(|(area, avg)| AreaPrice {
            listings: listings
                .iter()
                .find(|(a, _)| *a == area)
                .map_or(0, |(_, n)| *n),
            avg_price: whole(avg),
            area,
        })
        .collect();

    rows.sort_by(|a, b| b.avg_price.cmp(&a.avg_price));
    rows
}
