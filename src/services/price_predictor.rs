//! HTTP client for the external price-prediction service.
//!
//! Only the request/response contract lives here. Inputs are validated with
//! the service's own rules before anything is sent.

use crate::config::MlServiceConfig;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{info, warn};

pub const VALID_BOROUGHS: [&str; 5] = ["Manhattan", "Brooklyn", "Queens", "Bronx", "Staten Island"];
pub const VALID_ROOM_TYPES: [&str; 3] = ["Entire home/apt", "Private room", "Shared room"];
pub const MAX_BATCH_SIZE: usize = 100;

#[derive(Error, Debug)]
pub enum PredictionError {
    #[error("Invalid prediction input: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Prediction service request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Prediction service returned {status}: {message}")]
    Service { status: u16, message: String },

    #[error("Prediction failed: {0}")]
    Failed(String),
}

pub type PredictionResult<T> = Result<T, PredictionError>;

/// Listing features sent to `/predict`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub neighbourhood_group: String,
    pub neighbourhood: String,
    pub room_type: String,
    pub latitude: f64,
    pub longitude: f64,
    pub minimum_nights: i64,
    pub availability_365: i64,
    pub number_of_reviews: i64,
    pub calculated_host_listings_count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviews_per_month: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_weekend: Option<u8>,
}

impl PredictionRequest {
    /// Fill the optional fields with the service defaults
    pub fn with_defaults(mut self) -> Self {
        self.reviews_per_month.get_or_insert(0.0);
        self.day.get_or_insert(15);
        self.month.get_or_insert(6);
        self.year.get_or_insert(2024);
        self.is_weekend.get_or_insert(0);
        self
    }

    /// Every rule the input breaks; empty when valid
    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if !(-90.0..=90.0).contains(&self.latitude) {
            errors.push("Latitude must be between -90 and 90".to_string());
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            errors.push("Longitude must be between -180 and 180".to_string());
        }
        if self.minimum_nights < 0 {
            errors.push("minimum_nights must be non-negative".to_string());
        }
        if !(0..=365).contains(&self.availability_365) {
            errors.push("availability_365 must be between 0 and 365".to_string());
        }
        if self.number_of_reviews < 0 {
            errors.push("number_of_reviews must be non-negative".to_string());
        }
        if self.calculated_host_listings_count < 0 {
            errors.push("calculated_host_listings_count must be non-negative".to_string());
        }
        if !VALID_BOROUGHS.contains(&self.neighbourhood_group.as_str()) {
            errors.push(format!("neighbourhood_group must be one of: {:?}", VALID_BOROUGHS));
        }
        if !VALID_ROOM_TYPES.contains(&self.room_type.as_str()) {
            errors.push(format!("room_type must be one of: {:?}", VALID_ROOM_TYPES));
        }

        errors
    }

    pub fn validate(&self) -> PredictionResult<()> {
        let errors = self.validation_errors();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(PredictionError::Validation(errors))
        }
    }
}

/// `/predict` response, also used for each batch entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub predicted_price: Option<f64>,
    #[serde(default)]
    pub model_used: Option<String>,
    #[serde(default)]
    pub confidence_level: Option<String>,
    #[serde(default)]
    pub individual_predictions: BTreeMap<String, f64>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchPredictionResponse {
    pub predictions: Vec<PredictionResponse>,
    pub total_count: usize,
    pub successful_count: usize,
    pub failed_count: usize,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub model_loaded: bool,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy" && self.model_loaded
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
    details: Option<String>,
    #[serde(default)]
    validation_errors: Option<serde_json::Value>,
}

impl ErrorBody {
    fn describe(self) -> String {
        let mut parts: Vec<String> = [self.error, self.message, self.details]
            .into_iter()
            .flatten()
            .collect();
        if let Some(v) = self.validation_errors {
            parts.push(v.to_string());
        }
        if parts.is_empty() {
            "no details".to_string()
        } else {
            parts.join(": ")
        }
    }
}

/// Client for the price-prediction service
#[derive(Clone)]
pub struct PricePredictorClient {
    base_url: String,
    http: Client,
}

impl PricePredictorClient {
    pub fn new(config: &MlServiceConfig) -> PredictionResult<Self> {
        let http = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> PredictionResult<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.describe(),
            Err(_) => status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string(),
        };
        Err(PredictionError::Service {
            status: status.as_u16(),
            message,
        })
    }

    /// Predict one nightly price
    pub async fn predict(&self, request: PredictionRequest) -> PredictionResult<PredictionResponse> {
        request.validate()?;
        let request = request.with_defaults();
        info!(
            "Requesting price prediction for {} - {}",
            request.neighbourhood_group, request.room_type
        );

        let response = self.http.post(self.url("/predict")).json(&request).send().await?;
        let prediction: PredictionResponse = Self::decode(response).await?;

        if prediction.predicted_price.is_none() {
            let reason = prediction
                .error
                .clone()
                .unwrap_or_else(|| "no price returned".to_string());
            warn!("Prediction service returned no price: {}", reason);
            return Err(PredictionError::Failed(reason));
        }
        Ok(prediction)
    }

    /// Predict up to [`MAX_BATCH_SIZE`] prices. Entries the model could not
    /// price come back with `predicted_price: None`.
    pub async fn predict_batch(
        &self,
        requests: Vec<PredictionRequest>,
    ) -> PredictionResult<BatchPredictionResponse> {
        if requests.is_empty() {
            return Err(PredictionError::Validation(vec![
                "At least one prediction is required".to_string(),
            ]));
        }
        if requests.len() > MAX_BATCH_SIZE {
            return Err(PredictionError::Validation(vec![format!(
                "Maximum {} predictions per batch",
                MAX_BATCH_SIZE
            )]));
        }

        let errors: Vec<String> = requests
            .iter()
            .enumerate()
            .flat_map(|(i, r)| {
                r.validation_errors()
                    .into_iter()
                    .map(move |e| format!("[{}] {}", i, e))
            })
            .collect();
        if !errors.is_empty() {
            return Err(PredictionError::Validation(errors));
        }

        let predictions: Vec<PredictionRequest> =
            requests.into_iter().map(PredictionRequest::with_defaults).collect();
        let body = serde_json::json!({ "predictions": predictions });

        let response = self.http.post(self.url("/predict/batch")).json(&body).send().await?;
        let batch: BatchPredictionResponse = Self::decode(response).await?;
        info!(
            "Batch prediction completed: {}/{} successful",
            batch.successful_count, batch.total_count
        );
        Ok(batch)
    }

    /// Health check. An unhealthy service answers 503 with the same body.
    pub async fn health(&self) -> PredictionResult<HealthStatus> {
        let response = self.http.get(self.url("/health")).send().await?;
        if response.status() == StatusCode::SERVICE_UNAVAILABLE {
            return Ok(response.json::<HealthStatus>().await?);
        }
        Self::decode(response).await
    }

    /// Free-form model metadata
    pub async fn model_info(&self) -> PredictionResult<serde_json::Value> {
        let response = self.http.get(self.url("/model/info")).send().await?;
        Self::decode(response).await
    }
}
