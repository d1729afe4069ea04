//! Result assembly: numeric normalisation, sub-query settlement and the
//! per-view request state machine.

use crate::aggregate::round_half_up;
use crate::catalog::SubQuery;
use crate::models::ViewName;
use crate::services::fallback::{FallbackPolicy, PlaceholderRow};
use crate::warehouse::WarehouseResult;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use tracing::{error, warn};

/// Whole units (currency, days, counts), halves away from zero
pub fn whole(value: Decimal) -> i64 {
    round_half_up(value, 0).to_i64().unwrap_or(if value.is_sign_negative() {
        i64::MIN
    } else {
        i64::MAX
    })
}

/// Rates shown with one decimal place
pub fn one_decimal(value: Decimal) -> f64 {
    round_half_up(value, 1).to_f64().unwrap_or(0.0)
}

/// Map coordinates, six decimal places
pub fn coordinate(value: Decimal) -> Option<f64> {
    round_half_up(value, 6).to_f64()
}

/// SHA-256 of the serialized payload, hex encoded
pub fn fingerprint<T: Serialize>(payload: &T) -> Result<String, serde_json::Error> {
    let bytes = serde_json::to_vec(payload)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryErrorKind {
    /// The warehouse could not be reached or returned malformed rows
    DataUnavailable,
    /// Some sub-queries were replaced by placeholders
    PartialFailure,
}

/// Typed error returned to the dashboard instead of a payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewError {
    pub view: ViewName,
    pub kind: QueryErrorKind,
    pub message: String,
}

impl ViewError {
    pub fn unavailable(view: ViewName, message: impl Into<String>) -> Self {
        Self {
            view,
            kind: QueryErrorKind::DataUnavailable,
            message: message.into(),
        }
    }
}

impl fmt::Display for ViewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?}): {}", self.view, self.kind, self.message)
    }
}

impl std::error::Error for ViewError {}

/// A view payload plus the sub-queries that fell back to placeholders
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewOutcome<T> {
    pub data: T,
    pub degraded: Vec<&'static str>,
}

impl<T> ViewOutcome<T> {
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }

    /// The partial failure, if any sub-query was replaced
    pub fn warning(&self, view: ViewName) -> Option<ViewError> {
        if self.degraded.is_empty() {
            return None;
        }
        Some(ViewError {
            view,
            kind: QueryErrorKind::PartialFailure,
            message: format!("Showing placeholder data for {}", self.degraded.join(", ")),
        })
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ViewOutcome<U> {
        ViewOutcome {
            data: f(self.data),
            degraded: self.degraded,
        }
    }
}

/// Collects the sub-query results of one view.
///
/// Failed sub-queries are replaced by their placeholder row; legitimately
/// empty ones keep an empty array unless the policy defines an empty
/// placeholder. If every sub-query failed the view itself fails.
pub struct Settlement {
    view: ViewName,
    attempted: usize,
    degraded: Vec<&'static str>,
    failures: Vec<String>,
}

impl Settlement {
    pub fn new(view: ViewName) -> Self {
        Self {
            view,
            attempted: 0,
            degraded: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn take<T>(&mut self, sub: SubQuery, result: WarehouseResult<Vec<T>>) -> Vec<T>
    where
        T: TryFrom<PlaceholderRow>,
    {
        self.attempted += 1;
        match result {
            Ok(rows) if rows.is_empty() => FallbackPolicy::on_empty(sub)
                .and_then(|row| T::try_from(row).ok())
                .into_iter()
                .collect(),
            Ok(rows) => rows,
            Err(e) => {
                warn!("Sub-query {} failed, using placeholder: {}", sub, e);
                self.degraded.push(sub.field());
                self.failures.push(format!("{}: {}", sub.field(), e));
                T::try_from(FallbackPolicy::on_failure(sub))
                    .ok()
                    .into_iter()
                    .collect()
            }
        }
    }

    pub fn finish<T>(self, data: T) -> Result<ViewOutcome<T>, ViewError> {
        if self.attempted > 0 && self.failures.len() == self.attempted {
            let message = format!("Data unavailable: {}", self.failures.join("; "));
            error!("View {} failed: {}", self.view, message);
            return Err(ViewError::unavailable(self.view, message));
        }
        Ok(ViewOutcome {
            data,
            degraded: self.degraded,
        })
    }
}

/// Client-visible lifecycle of one view request.
///
/// `NotRequested -> Loading -> Ready | Errored`. Leaving `Ready` or
/// `Errored` requires an explicit reload; the engine never retries on its own.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ViewState {
    #[default]
    NotRequested,
    Loading,
    Ready {
        data: serde_json::Value,
        degraded: Vec<String>,
        fingerprint: String,
    },
    Errored {
        error: ViewError,
    },
}

impl ViewState {
    /// Move to `Loading` if the request should run. Returns `false` when the
    /// state is left unchanged (already loading, or settled without reload).
    pub fn begin(&mut self, reload: bool) -> bool {
        let start = match self {
            ViewState::NotRequested => true,
            ViewState::Loading => false,
            ViewState::Ready { .. } | ViewState::Errored { .. } => reload,
        };
        if start {
            *self = ViewState::Loading;
        }
        start
    }

    /// Settle a loading request. Ignored unless the state is `Loading`.
    pub fn resolve<T: Serialize>(
        &mut self,
        view: ViewName,
        result: Result<ViewOutcome<T>, ViewError>,
    ) -> bool {
        if *self != ViewState::Loading {
            return false;
        }
        *self = match result {
            Ok(outcome) => match Self::ready(&outcome) {
                Ok(state) => state,
                Err(e) => ViewState::Errored {
                    error: ViewError::unavailable(
                        view,
                        format!("Could not serialize payload: {}", e),
                    ),
                },
            },
            Err(error) => ViewState::Errored { error },
        };
        true
    }

    fn ready<T: Serialize>(outcome: &ViewOutcome<T>) -> Result<Self, serde_json::Error> {
        Ok(ViewState::Ready {
            data: serde_json::to_value(&outcome.data)?,
            degraded: outcome.degraded.iter().map(|s| s.to_string()).collect(),
            fingerprint: fingerprint(&outcome.data)?,
        })
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, ViewState::Ready { .. } | ViewState::Errored { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RangeShare;
    use crate::warehouse::WarehouseError;

    fn unavailable<T>() -> WarehouseResult<Vec<T>> {
        Err(WarehouseError::Unavailable("down".to_string()))
    }

    #[test]
    fn test_rounding_helpers() {
        assert_eq!(whole(Decimal::new(1505, 1)), 151);
        assert_eq!(whole(Decimal::new(-25, 1)), -3);
        assert!((one_decimal(Decimal::new(125, 2)) - 1.3).abs() < 1e-9);
        let lat = coordinate(Decimal::new(4_071_234_567, 8)).unwrap();
        assert!((lat - 40.712346).abs() < 1e-9);
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let a = fingerprint(&vec![1, 2, 3]).unwrap();
        let b = fingerprint(&vec![1, 2, 3]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, fingerprint(&vec![3, 2, 1]).unwrap());
    }

    #[test]
    fn test_partial_failure_keeps_siblings() {
        let mut settle = Settlement::new(ViewName::PriceLocation);
        let ok: Vec<RangeShare> = settle.take(
            SubQuery::PriceDistribution,
            Ok(vec![RangeShare {
                range: "$0-50".to_string(),
                count: 1,
                percentage: 100,
            }]),
        );
        let failed: Vec<RangeShare> = settle.take(SubQuery::PriceDistribution, unavailable());
        assert_eq!(ok.len(), 1);
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].range, "No data");

        let outcome = settle.finish(()).unwrap();
        assert_eq!(outcome.degraded, vec!["priceDistribution"]);
        let warning = outcome.warning(ViewName::PriceLocation).unwrap();
        assert_eq!(warning.kind, QueryErrorKind::PartialFailure);
    }

    #[test]
    fn test_all_failed_is_data_unavailable() {
        let mut settle = Settlement::new(ViewName::PriceLocation);
        let _: Vec<RangeShare> = settle.take(SubQuery::PriceDistribution, unavailable());
        let err = settle.finish(()).unwrap_err();
        assert_eq!(err.kind, QueryErrorKind::DataUnavailable);
        assert!(err.message.contains("priceDistribution"));
    }

    #[test]
    fn test_empty_result_is_not_a_failure() {
        let mut settle = Settlement::new(ViewName::PriceLocation);
        let rows: Vec<RangeShare> = settle.take(SubQuery::PriceDistribution, Ok(Vec::new()));
        assert!(rows.is_empty());
        let outcome = settle.finish(()).unwrap();
        assert!(!outcome.is_degraded());
    }

    #[test]
    fn test_state_machine() {
        let mut state = ViewState::default();
        assert!(state.begin(false));
        assert_eq!(state, ViewState::Loading);
        assert!(!state.begin(true));

        let outcome = ViewOutcome {
            data: vec![1],
            degraded: Vec::new(),
        };
        let view = ViewName::HostListing;
        assert!(state.resolve(view, Ok(outcome.clone())));
        assert!(state.is_settled());
        assert!(!state.resolve(view, Ok(outcome)));

        // settled views only restart on reload
        assert!(!state.begin(false));
        assert!(state.begin(true));
        assert!(state.resolve::<()>(view, Err(ViewError::unavailable(view, "down"))));
        assert!(matches!(state, ViewState::Errored { .. }));
    }
}
