//! Host and listing structure: host size categories, the largest hosts and
//! listing totals per host size range.

use super::{range_shares, CatalogQuery, SubQuery};
use crate::aggregate::{
    at_least, bucket_counts, group_distinct_count, having_filter, top_n, GroupBy, Mean,
    HOST_CATEGORIES, HOST_LISTING_RANGES,
};
use crate::models::{HostCategoryShare, HostRangeListings, ListingDaySnapshot, TopHost};
use crate::schema::{Dimension, QueryPlan, StarSchema};
use crate::services::assembler::whole;
use crate::warehouse::FactFilter;
use rust_decimal::Decimal;
use std::collections::HashSet;

pub const MIN_TOP_HOST_LISTINGS: u64 = 2;
pub const TOP_HOSTS_LIMIT: usize = 15;
/// Nights per month used for the revenue estimate
pub const REVENUE_NIGHTS: i64 = 30;

pub const UNKNOWN_HOST: &str = "Unknown host";

const HOSTS_ONLY: QueryPlan = QueryPlan::new(FactFilter::all(), &[Dimension::Host]);

pub const HOST_DISTRIBUTION: CatalogQuery<HostCategoryShare> = CatalogQuery {
    sub: SubQuery::HostDistribution,
    plan: HOSTS_ONLY,
    run: host_distribution,
};

pub const TOP_HOSTS: CatalogQuery<TopHost> = CatalogQuery {
    sub: SubQuery::TopHosts,
    plan: HOSTS_ONLY,
    run: top_hosts,
};

pub const LISTINGS_BY_HOST: CatalogQuery<HostRangeListings> = CatalogQuery {
    sub: SubQuery::ListingsByHost,
    plan: HOSTS_ONLY,
    run: listings_by_host,
};

/// Distinct listings per resolved host, in first-seen order
fn listings_per_host(schema: &StarSchema) -> Vec<(String, u64)> {
    group_distinct_count(
        schema.facts(),
        |f: &ListingDaySnapshot| schema.join_host(f).map(|h| h.id.clone()),
        |f| f.listing_id.clone(),
    )
}

pub fn host_distribution(schema: &StarSchema) -> Vec<HostCategoryShare> {
    let hosts = listings_per_host(schema);
    let counts = bucket_counts(&hosts, |(_, n)| Some(Decimal::from(*n)), &HOST_CATEGORIES);

    range_shares(counts)
        .into_iter()
        .map(|share| HostCategoryShare {
            category: share.range,
            hosts: share.count,
            percentage: share.percentage,
        })
        .collect()
}

#[derive(Default)]
struct HostAcc {
    name: Option<String>,
    listings: HashSet<String>,
    reviews: Decimal,
    price: Mean,
}

pub fn top_hosts(schema: &StarSchema) -> Vec<TopHost> {
    let mut hosts: GroupBy<String, HostAcc> = GroupBy::new();

    for fact in schema.facts() {
        let Some(host) = schema.join_host(fact) else {
            continue;
        };
        let acc = hosts.entry(host.id.clone());
        if acc.name.is_none() {
            acc.name = host.host_name.clone();
        }
        if let Some(listing_id) = &fact.listing_id {
            acc.listings.insert(listing_id.clone());
        }
        if let Some(reviews) = fact.reviews() {
            acc.reviews += reviews;
        }
        if let Some(price) = fact.positive_price() {
            acc.price.push(price);
        }
    }

    let min_listings = at_least(MIN_TOP_HOST_LISTINGS);
    let multi = having_filter(hosts.into_vec(), |(_, acc)| {
        min_listings(&(acc.listings.len() as u64))
    });

    let rows = multi
        .into_iter()
        .map(|(_, acc)| {
            let listings = acc.listings.len() as u64;
            let avg_price = acc.price.value();
            TopHost {
                host_name: acc.name.unwrap_or_else(|| UNKNOWN_HOST.to_string()),
                listings,
                total_reviews: whole(acc.reviews),
                avg_price: avg_price.map(whole),
                estimated_revenue: avg_price.map(|avg| {
                    whole(avg * Decimal::from(listings) * Decimal::from(REVENUE_NIGHTS))
                }),
            }
        })
        .collect();

    top_n(rows, |h: &TopHost| h.listings, TOP_HOSTS_LIMIT)
}

pub fn listings_by_host(schema: &StarSchema) -> Vec<HostRangeListings> {
    let labels = HOST_LISTING_RANGES.labels();
    let mut hosts = vec![0u64; labels.len()];
    let mut listings = vec![0u64; labels.len()];

    for (_, count) in listings_per_host(schema) {
        let i = HOST_LISTING_RANGES.index_of(Decimal::from(count));
        hosts[i] += 1;
        listings[i] += count;
    }

    labels
        .iter()
        .zip(hosts.into_iter().zip(listings))
        .filter(|(_, (hosts, _))| *hosts > 0)
        .map(|(range, (hosts, total_listings))| HostRangeListings {
            range: range.to_string(),
            hosts,
            total_listings,
        })
        .collect()
}
