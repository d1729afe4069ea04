//! Review trends: reviews per calendar month, borough price against review
//! volume, and the review count distribution.

use super::{range_shares, CatalogQuery, SubQuery};
use crate::aggregate::{bucket_counts, group_sum, top_n, GroupBy, Mean, REVIEW_RANGES};
use crate::models::{AreaPriceReviews, MonthlyReviews, RangeShare, YearMonth};
use crate::schema::{Dimension, QueryPlan, StarSchema};
use crate::services::assembler::whole;
use crate::warehouse::FactFilter;
use rust_decimal::Decimal;

pub const PRICE_VS_REVIEWS_LIMIT: usize = 15;

pub const MONTHLY_REVIEWS: CatalogQuery<MonthlyReviews> = CatalogQuery {
    sub: SubQuery::MonthlyReviews,
    plan: QueryPlan::new(FactFilter::all().with_reviews(), &[Dimension::Date]),
    run: monthly_reviews,
};

pub const PRICE_VS_REVIEWS: CatalogQuery<AreaPriceReviews> = CatalogQuery {
    sub: SubQuery::PriceVsReviews,
    plan: QueryPlan::new(FactFilter::all(), &[Dimension::Location]),
    run: price_vs_reviews,
};

pub const REVIEW_DISTRIBUTION: CatalogQuery<RangeShare> = CatalogQuery {
    sub: SubQuery::ReviewDistribution,
    plan: QueryPlan::new(FactFilter::all().with_reviews(), &[]),
    run: review_distribution,
};

/// Review totals per month, oldest first. Rows whose date has no valid
/// month/year are left out.
pub fn monthly_reviews(schema: &StarSchema) -> Vec<MonthlyReviews> {
    let mut months: Vec<(YearMonth, Decimal)> = group_sum(
        schema.facts(),
        |f| schema.join_date(f).and_then(|d| d.year_month()),
        |f| f.reviews(),
    );
    months.sort_by_key(|(month, _)| *month);

    months
        .into_iter()
        .map(|(month, total)| MonthlyReviews {
            month: month.label(),
            reviews: whole(total),
        })
        .collect()
}

#[derive(Default)]
struct AreaAcc {
    price: Mean,
    reviews: Decimal,
}

/// Mean positive price and total reviews per borough, busiest first
pub fn price_vs_reviews(schema: &StarSchema) -> Vec<AreaPriceReviews> {
    let mut areas: GroupBy<String, AreaAcc> = GroupBy::new();

    for fact in schema.facts() {
        let Some(area) = schema
            .join_location(fact)
            .and_then(|l| l.neighbourhood_group.clone())
        else {
            continue;
        };
        let acc = areas.entry(area);
        if let Some(price) = fact.positive_price() {
            acc.price.push(price);
        }
        if let Some(reviews) = fact.reviews() {
            acc.reviews += reviews;
        }
    }

    let rows = areas
        .into_vec()
        .into_iter()
        .map(|(area, acc)| AreaPriceReviews {
            area,
            avg_price: acc.price.value().map(whole),
            total_reviews: whole(acc.reviews),
        })
        .collect();

    top_n(rows, |r: &AreaPriceReviews| r.total_reviews, PRICE_VS_REVIEWS_LIMIT)
}

pub fn review_distribution(schema: &StarSchema) -> Vec<RangeShare> {
    range_shares(bucket_counts(schema.facts(), |f| f.reviews(), &REVIEW_RANGES))
}
