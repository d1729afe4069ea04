//! Single-row summary for the dashboard header tiles.

use super::{CatalogQuery, SubQuery};
use crate::aggregate::Mean;
use crate::models::GeneralStats;
use crate::schema::{QueryPlan, StarSchema};
use crate::services::assembler::whole;
use crate::warehouse::FactFilter;
use rust_decimal::Decimal;
use std::collections::HashSet;

pub const GENERAL_STATS: CatalogQuery<GeneralStats> = CatalogQuery {
    sub: SubQuery::GeneralStats,
    plan: QueryPlan::new(FactFilter::all().positive_price(), &[]),
    run: general_stats_rows,
};

/// Summary over facts with a positive price. Null review counts add nothing
/// to the total. An empty fact set gives all zeros.
pub fn general_stats(schema: &StarSchema) -> GeneralStats {
    let mut listings = HashSet::new();
    let mut hosts = HashSet::new();
    let mut areas = HashSet::new();
    let mut reviews = Decimal::ZERO;
    let mut price = Mean::default();
    let mut availability = Mean::default();

    for fact in schema.facts() {
        let Some(p) = fact.positive_price() else {
            continue;
        };
        price.push(p);
        listings.extend(fact.listing_id.as_deref());
        hosts.extend(fact.host_id.as_deref());
        areas.extend(fact.location_id.as_deref());
        if let Some(r) = fact.reviews() {
            reviews += r;
        }
        if let Some(a) = fact.availability() {
            availability.push(a);
        }
    }

    GeneralStats {
        total_listings: listings.len() as u64,
        total_hosts: hosts.len() as u64,
        total_reviews: whole(reviews),
        total_areas: areas.len() as u64,
        avg_price: price.value().map_or(0, whole),
        avg_availability: availability.value().map_or(0, whole),
        fallback: false,
    }
}

/// [`general_stats`] as a one-row result, for the shared sub-query runner
fn general_stats_rows(schema: &StarSchema) -> Vec<GeneralStats> {
    vec![general_stats(schema)]
}
