//! Airbnb Insights Backend Library
//!
//! Read-only analytics over the NYC listings star schema, exposed for the
//! push server binary, tests and other consumers.

pub mod aggregate;
pub mod catalog;
pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod repositories;
pub mod schema;
pub mod services;
pub mod warehouse;
pub mod websocket;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use services::{DashboardService, ViewError, ViewOutcome, ViewState};
pub use warehouse::{InMemoryWarehouse, PgWarehouse, Warehouse};
pub use websocket::DashboardSocketServer;
