#![allow(dead_code)]

use airbnb_insights::models::*;
use airbnb_insights::services::DashboardService;
use airbnb_insights::warehouse::memory::StarTables;
use airbnb_insights::warehouse::InMemoryWarehouse;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Builds star-schema tables for tests. Fact ids are assigned in insertion
/// order so scans return rows in the order they were added.
#[derive(Default)]
pub struct StarFixture {
    tables: StarTables,
}

impl StarFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn location(mut self, id: &str, borough: &str, neighbourhood: &str) -> Self {
        self.tables.locations.push(Location {
            id: id.to_string(),
            neighbourhood_group: Some(borough.to_string()),
            neighbourhood: Some(neighbourhood.to_string()),
            latitude: Some(Decimal::new(407_128, 4)),
            longitude: Some(Decimal::new(-740_060, 4)),
        });
        self
    }

    pub fn host(mut self, id: &str, name: &str) -> Self {
        self.tables.hosts.push(Host {
            id: id.to_string(),
            host_name: Some(name.to_string()),
        });
        self
    }

    pub fn listing(mut self, id: &str, name: &str) -> Self {
        self.tables.listings.push(Listing {
            id: id.to_string(),
            name: Some(name.to_string()),
            minimum_nights: Some(1),
        });
        self
    }

    pub fn room_type(mut self, id: &str, label: &str) -> Self {
        self.tables.room_types.push(RoomType {
            id: id.to_string(),
            room_type: Some(label.to_string()),
        });
        self
    }

    pub fn date(mut self, id: &str, year: Option<i32>, month: Option<i32>) -> Self {
        self.tables.dates.push(DateDim {
            id: id.to_string(),
            date: None,
            day: Some(1),
            month,
            year,
            day_of_week: None,
            is_weekend: Some(false),
        });
        self
    }

    /// Add a fact row. `fact` starts from [`blank_fact`] with a fresh id.
    pub fn fact(mut self, build: impl FnOnce(ListingDaySnapshot) -> ListingDaySnapshot) -> Self {
        let id = format!("f{:05}", self.tables.facts.len());
        self.tables.facts.push(build(blank_fact(&id)));
        self
    }

    pub fn tables(self) -> StarTables {
        self.tables
    }

    pub fn warehouse(self) -> Arc<InMemoryWarehouse> {
        Arc::new(InMemoryWarehouse::new(self.tables))
    }
}

/// A fact row with every foreign key and measure null
pub fn blank_fact(id: &str) -> ListingDaySnapshot {
    ListingDaySnapshot {
        id: id.to_string(),
        listing_id: None,
        host_id: None,
        location_id: None,
        room_type_id: None,
        date_id: None,
        price: None,
        availability_365: None,
        number_of_reviews: None,
        reviews_per_month: None,
        calculated_host_listings_count: None,
    }
}

pub fn some(s: &str) -> Option<String> {
    Some(s.to_string())
}

/// A small but complete dataset touching every view
pub fn sample_fixture() -> StarFixture {
    let mut fixture = StarFixture::new()
        .location("loc-x", "Manhattan", "X")
        .location("loc-y", "Brooklyn", "Y")
        .host("h-solo", "Solo")
        .host("h-multi", "Multi")
        .room_type("rt-entire", "Entire home/apt")
        .room_type("rt-private", "Private room")
        .date("d-jul", Some(2024), Some(7))
        .date("d-aug", Some(2024), Some(8));

    for i in 0..5 {
        let listing = format!("a{}", i);
        fixture = fixture.listing(&listing, &format!("Loft {}", i)).fact(|f| ListingDaySnapshot {
            listing_id: Some(listing.clone()),
            host_id: some("h-multi"),
            location_id: some("loc-x"),
            room_type_id: some("rt-entire"),
            date_id: some("d-jul"),
            price: Some(Decimal::from(100)),
            availability_365: Some(200),
            number_of_reviews: Some(20 + i),
            reviews_per_month: Some(Decimal::new(15, 1)),
            ..f
        });
    }
    for i in 0..5 {
        let listing = format!("b{}", i);
        fixture = fixture.listing(&listing, &format!("Studio {}", i)).fact(|f| ListingDaySnapshot {
            listing_id: Some(listing.clone()),
            host_id: some("h-multi"),
            location_id: some("loc-x"),
            room_type_id: some("rt-private"),
            date_id: some("d-aug"),
            price: Some(Decimal::from(300)),
            availability_365: Some(100),
            number_of_reviews: Some(5),
            reviews_per_month: Some(Decimal::new(4, 1)),
            ..f
        });
    }
    fixture
        .listing("c0", "Brownstone")
        .fact(|f| ListingDaySnapshot {
            listing_id: some("c0"),
            host_id: some("h-solo"),
            location_id: some("loc-y"),
            room_type_id: some("rt-private"),
            date_id: some("d-aug"),
            price: Some(Decimal::from(80)),
            availability_365: Some(50),
            number_of_reviews: Some(0),
            ..f
        })
}

pub fn dashboard(warehouse: Arc<InMemoryWarehouse>) -> DashboardService {
    DashboardService::new(warehouse)
}
