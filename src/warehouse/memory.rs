//! In-memory warehouse.
//!
//! Serves the star schema from memory, either built directly (tests) or
//! loaded from the ETL's CSV export directory. Individual operations can be
//! switched to fail so that degraded dashboard paths can be exercised
//! without a database.

use super::{FactFilter, Warehouse, WarehouseError, WarehouseResult};
use crate::models::{DateDim, Host, Listing, ListingDaySnapshot, Location, RoomType};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::str::FromStr;
use std::sync::RwLock;
use tracing::info;

/// Warehouse operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarehouseOp {
    ScanFacts,
    Listings,
    Hosts,
    Locations,
    RoomTypes,
    Dates,
}

/// Raw table contents
#[derive(Debug, Clone, Default)]
pub struct StarTables {
    pub facts: Vec<ListingDaySnapshot>,
    pub listings: Vec<Listing>,
    pub hosts: Vec<Host>,
    pub locations: Vec<Location>,
    pub room_types: Vec<RoomType>,
    pub dates: Vec<DateDim>,
}

pub struct InMemoryWarehouse {
    facts: Vec<ListingDaySnapshot>,
    listings: HashMap<String, Listing>,
    hosts: HashMap<String, Host>,
    locations: HashMap<String, Location>,
    room_types: HashMap<String, RoomType>,
    dates: HashMap<String, DateDim>,
    failing: RwLock<HashSet<WarehouseOp>>,
}

fn index_by_id<T>(rows: Vec<T>, id: impl Fn(&T) -> &str) -> HashMap<String, T> {
    rows.into_iter().map(|row| (id(&row).to_string(), row)).collect()
}

fn lookup<T: Clone>(table: &HashMap<String, T>, ids: &[String]) -> Vec<T> {
    ids.iter().filter_map(|id| table.get(id).cloned()).collect()
}

impl InMemoryWarehouse {
    pub fn new(tables: StarTables) -> Self {
        let mut facts = tables.facts;
        facts.sort_by(|a, b| a.id.cmp(&b.id));

        Self {
            facts,
            listings: index_by_id(tables.listings, |r| &r.id),
            hosts: index_by_id(tables.hosts, |r| &r.id),
            locations: index_by_id(tables.locations, |r| &r.id),
            room_types: index_by_id(tables.room_types, |r| &r.id),
            dates: index_by_id(tables.dates, |r| &r.id),
            failing: RwLock::new(HashSet::new()),
        }
    }

    /// Load the six CSV files written by the ETL job from `dir`
    pub fn from_csv_dir(dir: &Path) -> WarehouseResult<Self> {
        let tables = StarTables {
            locations: read_table::<LocationCsvRow, _>(dir, "dim_location", LocationCsvRow::parse)?,
            hosts: read_table::<HostCsvRow, _>(dir, "dim_host", HostCsvRow::parse)?,
            room_types: read_table::<RoomTypeCsvRow, _>(dir, "dim_room_type", RoomTypeCsvRow::parse)?,
            listings: read_table::<ListingCsvRow, _>(dir, "dim_listing", ListingCsvRow::parse)?,
            dates: read_table::<DateCsvRow, _>(dir, "dim_date", DateCsvRow::parse)?,
            facts: read_table::<FactCsvRow, _>(dir, "fact_listing_daily", FactCsvRow::parse)?,
        };
        Ok(Self::new(tables))
    }

    /// Make `op` fail with [`WarehouseError::Unavailable`] until [`recover`](Self::recover)
    pub fn fail(&self, op: WarehouseOp) {
        self.failing
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(op);
    }

    pub fn recover(&self, op: WarehouseOp) {
        self.failing
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&op);
    }

    pub fn fact_count(&self) -> usize {
        self.facts.len()
    }

    fn check(&self, op: WarehouseOp) -> WarehouseResult<()> {
        let failing = self.failing.read().unwrap_or_else(|e| e.into_inner());
        if failing.contains(&op) {
            return Err(WarehouseError::Unavailable(format!("{:?} is offline", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl Warehouse for InMemoryWarehouse {
    async fn scan_facts(&self, filter: &FactFilter) -> WarehouseResult<Vec<ListingDaySnapshot>> {
        self.check(WarehouseOp::ScanFacts)?;
        Ok(self
            .facts
            .iter()
            .filter(|f| filter.matches(f))
            .cloned()
            .collect())
    }

    async fn listings(&self, ids: &[String]) -> WarehouseResult<Vec<Listing>> {
        self.check(WarehouseOp::Listings)?;
        Ok(lookup(&self.listings, ids))
    }

    async fn hosts(&self, ids: &[String]) -> WarehouseResult<Vec<Host>> {
        self.check(WarehouseOp::Hosts)?;
        Ok(lookup(&self.hosts, ids))
    }

    async fn locations(&self, ids: &[String]) -> WarehouseResult<Vec<Location>> {
        self.check(WarehouseOp::Locations)?;
        Ok(lookup(&self.locations, ids))
    }

    async fn room_types(&self, ids: &[String]) -> WarehouseResult<Vec<RoomType>> {
        self.check(WarehouseOp::RoomTypes)?;
        Ok(lookup(&self.room_types, ids))
    }

    async fn dates(&self, ids: &[String]) -> WarehouseResult<Vec<DateDim>> {
        self.check(WarehouseOp::Dates)?;
        Ok(lookup(&self.dates, ids))
    }
}

// ---------------------------------------------------------------------------
// CSV export parsing
// ---------------------------------------------------------------------------

fn read_table<R, T>(
    dir: &Path,
    table: &str,
    parse: impl Fn(R) -> WarehouseResult<T>,
) -> WarehouseResult<Vec<T>>
where
    R: for<'de> Deserialize<'de>,
{
    let path = dir.join(format!("{}.csv", table));
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(&path)?;

    let mut rows = Vec::new();
    for record in reader.deserialize::<R>() {
        rows.push(parse(record?)?);
    }

    info!("Loaded {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Empty cells and `NaN` are nulls
fn text(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("nan"))
}

fn parse_decimal(table: &str, field: &str, raw: Option<String>) -> WarehouseResult<Option<Decimal>> {
    let Some(s) = text(raw) else {
        return Ok(None);
    };
    Decimal::from_str(&s)
        .or_else(|_| Decimal::from_scientific(&s))
        .map(Some)
        .map_err(|e| WarehouseError::malformed(table, format!("{} = {:?}: {}", field, s, e)))
}

/// Integers may arrive as `"12.0"` from a widened nullable column
fn parse_int(table: &str, field: &str, raw: Option<String>) -> WarehouseResult<Option<i32>> {
    let Some(s) = text(raw) else {
        return Ok(None);
    };
    if let Ok(n) = s.parse::<i32>() {
        return Ok(Some(n));
    }
    Decimal::from_str(&s)
        .ok()
        .filter(|d| d.fract().is_zero())
        .and_then(|d| d.to_i32())
        .map(Some)
        .ok_or_else(|| WarehouseError::malformed(table, format!("{} = {:?} is not an integer", field, s)))
}

fn parse_bool(table: &str, field: &str, raw: Option<String>) -> WarehouseResult<Option<bool>> {
    let Some(s) = text(raw) else {
        return Ok(None);
    };
    match s.to_lowercase().as_str() {
        "true" | "t" | "1" | "1.0" | "yes" => Ok(Some(true)),
        "false" | "f" | "0" | "0.0" | "no" => Ok(Some(false)),
        _ => Err(WarehouseError::malformed(
            table,
            format!("{} = {:?} is not a boolean", field, s),
        )),
    }
}

/// Accepts `2019-07-08` and `2019-07-08 00:00:00`
fn parse_date(table: &str, field: &str, raw: Option<String>) -> WarehouseResult<Option<NaiveDate>> {
    let Some(s) = text(raw) else {
        return Ok(None);
    };
    let day = s.get(..10).unwrap_or(&s);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map(Some)
        .map_err(|e| WarehouseError::malformed(table, format!("{} = {:?}: {}", field, s, e)))
}

fn required_id(table: &str, raw: Option<String>) -> WarehouseResult<String> {
    text(raw).ok_or_else(|| WarehouseError::malformed(table, "row without id"))
}

#[derive(Debug, Deserialize)]
struct LocationCsvRow {
    id: Option<String>,
    neighbourhood_group: Option<String>,
    neighbourhood: Option<String>,
    latitude: Option<String>,
    longitude: Option<String>,
}

impl LocationCsvRow {
    fn parse(self) -> WarehouseResult<Location> {
        const T: &str = "dim_location";
        Ok(Location {
            id: required_id(T, self.id)?,
            neighbourhood_group: text(self.neighbourhood_group),
            neighbourhood: text(self.neighbourhood),
            latitude: parse_decimal(T, "latitude", self.latitude)?,
            longitude: parse_decimal(T, "longitude", self.longitude)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct HostCsvRow {
    id: Option<String>,
    host_name: Option<String>,
}

impl HostCsvRow {
    fn parse(self) -> WarehouseResult<Host> {
        Ok(Host {
            id: required_id("dim_host", self.id)?,
            host_name: text(self.host_name),
        })
    }
}

#[derive(Debug, Deserialize)]
struct RoomTypeCsvRow {
    id: Option<String>,
    room_type: Option<String>,
}

impl RoomTypeCsvRow {
    fn parse(self) -> WarehouseResult<RoomType> {
        Ok(RoomType {
            id: required_id("dim_room_type", self.id)?,
            room_type: text(self.room_type),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ListingCsvRow {
    id: Option<String>,
    name: Option<String>,
    minimum_nights: Option<String>,
}

impl ListingCsvRow {
    fn parse(self) -> WarehouseResult<Listing> {
        const T: &str = "dim_listing";
        Ok(Listing {
            id: required_id(T, self.id)?,
            name: text(self.name),
            minimum_nights: parse_int(T, "minimum_nights", self.minimum_nights)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct DateCsvRow {
    id: Option<String>,
    date: Option<String>,
    day: Option<String>,
    month: Option<String>,
    year: Option<String>,
    day_of_week: Option<String>,
    is_weekend: Option<String>,
}

impl DateCsvRow {
    fn parse(self) -> WarehouseResult<DateDim> {
        const T: &str = "dim_date";
        Ok(DateDim {
            id: required_id(T, self.id)?,
            date: parse_date(T, "date", self.date)?,
            day: parse_int(T, "day", self.day)?,
            month: parse_int(T, "month", self.month)?,
            year: parse_int(T, "year", self.year)?,
            day_of_week: text(self.day_of_week),
            is_weekend: parse_bool(T, "is_weekend", self.is_weekend)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct FactCsvRow {
    id: Option<String>,
    listing_id: Option<String>,
    host_id: Option<String>,
    location_id: Option<String>,
    room_type_id: Option<String>,
    date_id: Option<String>,
    price: Option<String>,
    availability_365: Option<String>,
    number_of_reviews: Option<String>,
    reviews_per_month: Option<String>,
    calculated_host_listings_count: Option<String>,
}

impl FactCsvRow {
    fn parse(self) -> WarehouseResult<ListingDaySnapshot> {
        const T: &str = "fact_listing_daily";
        Ok(ListingDaySnapshot {
            id: required_id(T, self.id)?,
            listing_id: text(self.listing_id),
            host_id: text(self.host_id),
            location_id: text(self.location_id),
            room_type_id: text(self.room_type_id),
            date_id: text(self.date_id),
            price: parse_decimal(T, "price", self.price)?,
            availability_365: parse_int(T, "availability_365", self.availability_365)?,
            number_of_reviews: parse_int(T, "number_of_reviews", self.number_of_reviews)?,
            reviews_per_month: parse_decimal(T, "reviews_per_month", self.reviews_per_month)?,
            calculated_host_listings_count: parse_int(
                T,
                "calculated_host_listings_count",
                self.calculated_host_listings_count,
            )?,
        })
    }
}
