//! Domain models for the analytics backend.
//!
//! The star schema (one fact table, five dimensions) as loaded by the ETL,
//! plus the typed payloads returned to the dashboard.

pub mod dashboard;
pub mod dimensions;
pub mod listing_day;
pub mod year_month;

// Re-export all models for convenient access
pub use dashboard::*;
pub use dimensions::{DateDim, Host, Listing, Location, RoomType, RoomTypeLabel};
pub use listing_day::ListingDaySnapshot;
pub use year_month::YearMonth;
