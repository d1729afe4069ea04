pub mod assembler;
pub mod dashboard_service;
pub mod fallback;
pub mod price_predictor;

pub use assembler::{QueryErrorKind, ViewError, ViewOutcome, ViewState};
pub use dashboard_service::{DashboardService, ViewPayload};
pub use fallback::FallbackPolicy;
pub use price_predictor::{PredictionError, PricePredictorClient};
