//! Gateway-level error types.

use thiserror::Error;

/// Errors produced by the invoicing gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Required connection parameters are missing or malformed.
    #[error("configuration error: {0}")]
    Configuration(#[from] db::ConfigError),

    /// The store reported a failure; passed through untouched.
    #[error("store error: {0}")]
    Store(#[from] db::DbError),

    /// A locally checked precondition does not hold.
    #[error("validation failed: {0}")]
    DomainValidation(String),

    /// A store failure wrapped with the operation that hit it.
    #[error("{operation}: {source}")]
    Operation {
        operation: &'static str,
        #[source]
        source: db::DbError,
    },

    /// The calendar day has no representable start or end in the time zone.
    #[error("calendar day {0} has no local start or end in this time zone")]
    LocalDay(chrono::NaiveDate),

    /// A row came back in a shape the domain model does not accept.
    #[error("unexpected row shape: {0}")]
    Decode(#[from] serde_json::Error),
}

impl GatewayError {
    pub(crate) fn wrap(operation: &'static str) -> impl FnOnce(db::DbError) -> Self {
        move |source| Self::Operation { operation, source }
    }

    /// `true` if the underlying store error is a missing row.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Store(db::DbError::NotFound)
                | Self::Operation {
                    source: db::DbError::NotFound,
                    ..
                }
        )
    }
}
