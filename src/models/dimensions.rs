//! Dimension tables of the star schema.
//!
//! Rows are reference data written once per ETL run. The engine only reads them.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::YearMonth;

/// `dim_listing`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Listing {
    pub id: String,
    pub name: Option<String>,
    pub minimum_nights: Option<i32>,
}

/// `dim_host`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Host {
    pub id: String,
    pub host_name: Option<String>,
}

/// `dim_location`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Location {
    pub id: String,
    pub neighbourhood_group: Option<String>, // borough
    pub neighbourhood: Option<String>,
    pub latitude: Option<Decimal>,
    pub longitude: Option<Decimal>,
}

/// Room type label
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomTypeLabel {
    EntirePlace,
    PrivateRoom,
    SharedRoom,
    HotelRoom,
    Other(String),
}

impl RoomTypeLabel {
    /// Convert from database string
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "entire home/apt" | "entire place" => RoomTypeLabel::EntirePlace,
            "private room" => RoomTypeLabel::PrivateRoom,
            "shared room" => RoomTypeLabel::SharedRoom,
            "hotel room" => RoomTypeLabel::HotelRoom,
            _ => RoomTypeLabel::Other(s.trim().to_string()),
        }
    }

    /// Convert to display string
    pub fn as_str(&self) -> &str {
        match self {
            RoomTypeLabel::EntirePlace => "Entire home/apt",
            RoomTypeLabel::PrivateRoom => "Private room",
            RoomTypeLabel::SharedRoom => "Shared room",
            RoomTypeLabel::HotelRoom => "Hotel room",
            RoomTypeLabel::Other(label) => label,
        }
    }
}

/// `dim_room_type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RoomType {
    pub id: String,
    pub room_type: Option<String>,
}

impl RoomType {
    /// Get the room type as an enum
    pub fn label(&self) -> Option<RoomTypeLabel> {
        self.room_type
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(RoomTypeLabel::parse)
    }
}

/// `dim_date`. Calendar parts are precomputed by the ETL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct DateDim {
    pub id: String,
    pub date: Option<NaiveDate>,
    pub day: Option<i32>,
    pub month: Option<i32>,
    pub year: Option<i32>,
    pub day_of_week: Option<String>,
    pub is_weekend: Option<bool>,
}

impl DateDim {
    /// Month bucket from the precomputed month/year fields.
    /// Rows missing either field, or with a month outside 1..=12, have none.
    pub fn year_month(&self) -> Option<YearMonth> {
        YearMonth::new(self.year?, self.month?)
    }
}
