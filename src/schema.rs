//! Star schema snapshot used by the query catalog.
//!
//! A [`StarSchema`] holds the fact rows one sub-query scanned plus the
//! dimension rows those facts reference. Joins never fail: a foreign key that
//! does not resolve yields `None` and the caller leaves the row out of that
//! dimension's grouping.

use crate::models::{DateDim, Host, Listing, ListingDaySnapshot, Location, RoomType};
use crate::warehouse::{FactFilter, Warehouse, WarehouseResult};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Dimension tables a fact row can be joined to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Listing,
    Host,
    Location,
    RoomType,
    Date,
}

/// Fact predicate plus the dimensions a query needs resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryPlan {
    pub filter: FactFilter,
    pub joins: &'static [Dimension],
}

impl QueryPlan {
    pub const fn new(filter: FactFilter, joins: &'static [Dimension]) -> Self {
        Self { filter, joins }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StarSchema {
    facts: Vec<ListingDaySnapshot>,
    listings: HashMap<String, Listing>,
    hosts: HashMap<String, Host>,
    locations: HashMap<String, Location>,
    room_types: HashMap<String, RoomType>,
    dates: HashMap<String, DateDim>,
}

fn keyed<T>(rows: Vec<T>, id: impl Fn(&T) -> &str) -> HashMap<String, T> {
    rows.into_iter().map(|r| (id(&r).to_string(), r)).collect()
}

/// Sorted distinct foreign keys referenced by `facts`
fn referenced(
    facts: &[ListingDaySnapshot],
    key: impl Fn(&ListingDaySnapshot) -> Option<&String>,
) -> Vec<String> {
    facts
        .iter()
        .filter_map(key)
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

impl StarSchema {
    /// Snapshot with no dimension rows; every join resolves to `None`
    pub fn new(facts: Vec<ListingDaySnapshot>) -> Self {
        Self {
            facts,
            ..Self::default()
        }
    }

    pub fn with_listings(mut self, rows: Vec<Listing>) -> Self {
        self.listings = keyed(rows, |r| &r.id);
        self
    }

    pub fn with_hosts(mut self, rows: Vec<Host>) -> Self {
        self.hosts = keyed(rows, |r| &r.id);
        self
    }

    pub fn with_locations(mut self, rows: Vec<Location>) -> Self {
        self.locations = keyed(rows, |r| &r.id);
        self
    }

    pub fn with_room_types(mut self, rows: Vec<RoomType>) -> Self {
        self.room_types = keyed(rows, |r| &r.id);
        self
    }

    pub fn with_dates(mut self, rows: Vec<DateDim>) -> Self {
        self.dates = keyed(rows, |r| &r.id);
        self
    }

    /// Scan the facts matching `plan.filter` and resolve the joined dimensions
    pub async fn load(warehouse: &dyn Warehouse, plan: &QueryPlan) -> WarehouseResult<Self> {
        let facts = warehouse.scan_facts(&plan.filter).await?;
        let mut schema = Self::new(Vec::new());

        for dimension in plan.joins {
            match dimension {
                Dimension::Listing => {
                    let ids = referenced(&facts, |f| f.listing_id.as_ref());
                    schema = schema.with_listings(warehouse.listings(&ids).await?);
                }
                Dimension::Host => {
                    let ids = referenced(&facts, |f| f.host_id.as_ref());
                    schema = schema.with_hosts(warehouse.hosts(&ids).await?);
                }
                Dimension::Location => {
                    let ids = referenced(&facts, |f| f.location_id.as_ref());
                    schema = schema.with_locations(warehouse.locations(&ids).await?);
                }
                Dimension::RoomType => {
                    let ids = referenced(&facts, |f| f.room_type_id.as_ref());
                    schema = schema.with_room_types(warehouse.room_types(&ids).await?);
                }
                Dimension::Date => {
                    let ids = referenced(&facts, |f| f.date_id.as_ref());
                    schema = schema.with_dates(warehouse.dates(&ids).await?);
                }
            }
        }

        debug!("Loaded {} facts with joins {:?}", facts.len(), plan.joins);
        schema.facts = facts;
        Ok(schema)
    }

    pub fn facts(&self) -> &[ListingDaySnapshot] {
        &self.facts
    }

    pub fn join_listing(&self, fact: &ListingDaySnapshot) -> Option<&Listing> {
        self.listings.get(fact.listing_id.as_deref()?)
    }

    pub fn join_host(&self, fact: &ListingDaySnapshot) -> Option<&Host> {
        self.hosts.get(fact.host_id.as_deref()?)
    }

    pub fn join_location(&self, fact: &ListingDaySnapshot) -> Option<&Location> {
        self.locations.get(fact.location_id.as_deref()?)
    }

    pub fn join_room_type(&self, fact: &ListingDaySnapshot) -> Option<&RoomType> {
        self.room_types.get(fact.room_type_id.as_deref()?)
    }

    pub fn join_date(&self, fact: &ListingDaySnapshot) -> Option<&DateDim> {
        self.dates.get(fact.date_id.as_deref()?)
    }
}
