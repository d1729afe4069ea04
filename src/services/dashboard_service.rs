use crate::catalog::availability::{PROPERTY_AVAILABILITY, ROOM_TYPE_AVAILABILITY, TOP_RATED_LISTINGS};
use crate::catalog::general_stats::{general_stats, GENERAL_STATS};
use crate::catalog::host_listing::{HOST_DISTRIBUTION, LISTINGS_BY_HOST, TOP_HOSTS};
use crate::catalog::price_location::{AVG_PRICE_BY_AREA, NEIGHBOURHOOD_PRICES, PRICE_DISTRIBUTION};
use crate::catalog::review_trends::{MONTHLY_REVIEWS, PRICE_VS_REVIEWS, REVIEW_DISTRIBUTION};
use crate::catalog::CatalogQuery;
use crate::models::{
    AvailabilityPerformanceData, GeneralStats, HostListingData, PriceLocationData,
    ReviewTrendData, ViewName,
};
use crate::schema::StarSchema;
use crate::services::assembler::{Settlement, ViewError, ViewOutcome};
use crate::services::fallback::FallbackPolicy;
use crate::warehouse::{Warehouse, WarehouseResult};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Payload of any view
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ViewPayload {
    PriceLocation(PriceLocationData),
    AvailabilityPerformance(AvailabilityPerformanceData),
    ReviewTrends(ReviewTrendData),
    HostListing(HostListingData),
    GeneralStats(GeneralStats),
}

/// Read-only analytics over the injected warehouse.
///
/// Each sub-query loads its own snapshot so that one failing scan or
/// dimension lookup only degrades that sub-query. The sub-queries of a view
/// run concurrently.
pub struct DashboardService {
    warehouse: Arc<dyn Warehouse>,
}

impl DashboardService {
    pub fn new(warehouse: Arc<dyn Warehouse>) -> Self {
        Self { warehouse }
    }

    async fn run<T>(&self, query: &CatalogQuery<T>) -> WarehouseResult<Vec<T>> {
        let schema = StarSchema::load(self.warehouse.as_ref(), &query.plan).await?;
        let rows = query.evaluate(&schema);
        debug!(
            "Sub-query {} aggregated {} facts into {} rows",
            query.sub,
            schema.facts().len(),
            rows.len()
        );
        Ok(rows)
    }

    pub async fn get_price_location_data(&self) -> Result<ViewOutcome<PriceLocationData>, ViewError> {
        let (neighbourhoods, distribution, areas) = tokio::join!(
            self.run(&NEIGHBOURHOOD_PRICES),
            self.run(&PRICE_DISTRIBUTION),
            self.run(&AVG_PRICE_BY_AREA),
        );

        let mut settle = Settlement::new(ViewName::PriceLocation);
        let data = PriceLocationData {
            neighbourhood_prices: settle.take(NEIGHBOURHOOD_PRICES.sub, neighbourhoods),
            price_distribution: settle.take(PRICE_DISTRIBUTION.sub, distribution),
            avg_price_by_area: settle.take(AVG_PRICE_BY_AREA.sub, areas),
        };
        settle.finish(data)
    }

    pub async fn get_availability_performance_data(
        &self,
    ) -> Result<ViewOutcome<AvailabilityPerformanceData>, ViewError> {
        let (areas, room_types, top_rated) = tokio::join!(
            self.run(&PROPERTY_AVAILABILITY),
            self.run(&ROOM_TYPE_AVAILABILITY),
            self.run(&TOP_RATED_LISTINGS),
        );

        let mut settle = Settlement::new(ViewName::AvailabilityPerformance);
        let data = AvailabilityPerformanceData {
            property_availability: settle.take(PROPERTY_AVAILABILITY.sub, areas),
            room_type_availability: settle.take(ROOM_TYPE_AVAILABILITY.sub, room_types),
            top_rated_listings: settle.take(TOP_RATED_LISTINGS.sub, top_rated),
        };
        settle.finish(data)
    }

    pub async fn get_review_trend_data(&self) -> Result<ViewOutcome<ReviewTrendData>, ViewError> {
        let (monthly, price_vs_reviews, distribution) = tokio::join!(
            self.run(&MONTHLY_REVIEWS),
            self.run(&PRICE_VS_REVIEWS),
            self.run(&REVIEW_DISTRIBUTION),
        );

        let mut settle = Settlement::new(ViewName::ReviewTrends);
        let data = ReviewTrendData {
            monthly_reviews: settle.take(MONTHLY_REVIEWS.sub, monthly),
            price_vs_reviews: settle.take(PRICE_VS_REVIEWS.sub, price_vs_reviews),
            review_distribution: settle.take(REVIEW_DISTRIBUTION.sub, distribution),
        };
        settle.finish(data)
    }

    pub async fn get_host_listing_data(&self) -> Result<ViewOutcome<HostListingData>, ViewError> {
        let (distribution, top_hosts, by_range) = tokio::join!(
            self.run(&HOST_DISTRIBUTION),
            self.run(&TOP_HOSTS),
            self.run(&LISTINGS_BY_HOST),
        );

        let mut settle = Settlement::new(ViewName::HostListing);
        let data = HostListingData {
            host_distribution: settle.take(HOST_DISTRIBUTION.sub, distribution),
            top_hosts: settle.take(TOP_HOSTS.sub, top_hosts),
            listings_by_host: settle.take(LISTINGS_BY_HOST.sub, by_range),
        };
        settle.finish(data)
    }

    /// Never fails: an unreachable warehouse yields the flagged fallback summary
    pub async fn get_general_stats(&self) -> ViewOutcome<GeneralStats> {
        match self.run(&GENERAL_STATS).await {
            Ok(rows) => ViewOutcome {
                data: rows
                    .into_iter()
                    .next()
                    .unwrap_or_else(|| general_stats(&StarSchema::default())),
                degraded: Vec::new(),
            },
            Err(e) => {
                warn!("General stats unavailable, serving fallback summary: {}", e);
                ViewOutcome {
                    data: FallbackPolicy::general_stats(),
                    degraded: vec![GENERAL_STATS.sub.field()],
                }
            }
        }
    }

    /// Load any view by name
    pub async fn view(&self, name: ViewName) -> Result<ViewOutcome<ViewPayload>, ViewError> {
        info!("Loading view {}", name);
        match name {
            ViewName::PriceLocation => self
                .get_price_location_data()
                .await
                .map(|o| o.map(ViewPayload::PriceLocation)),
            ViewName::AvailabilityPerformance => self
                .get_availability_performance_data()
                .await
                .map(|o| o.map(ViewPayload::AvailabilityPerformance)),
            ViewName::ReviewTrends => self
                .get_review_trend_data()
                .await
                .map(|o| o.map(ViewPayload::ReviewTrends)),
            ViewName::HostListing => self
                .get_host_listing_data()
                .await
                .map(|o| o.map(ViewPayload::HostListing)),
            ViewName::GeneralStats => Ok(self.get_general_stats().await.map(ViewPayload::GeneralStats)),
        }
    }
}
