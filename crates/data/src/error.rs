//! Storage error taxonomy.
//!
//! [`BackendError`] is what a driver adapter reports; [`OrderStoreError`] is
//! what repositories and connectors hand to callers. Only duplicate keys get
//! a dedicated variant, everything else carries its cause.

use thiserror::Error;

/// Boxed driver error.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure reported by a [`crate::backend::Backend`] adapter.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The store rejected a row because of a primary-key/unique constraint.
    #[error("unique constraint violated: {0}")]
    UniqueViolation(#[source] BoxError),

    /// A returned row could not be mapped onto an order.
    #[error("row mapping failed: {0}")]
    RowMapping(#[source] BoxError),

    /// The handle was already closed.
    #[error("connection is closed")]
    Closed,

    /// Any other driver failure.
    #[error("{0}")]
    Driver(#[source] BoxError),
}

impl BackendError {
    /// Wraps a driver error that is not a constraint violation.
    pub fn driver(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Driver(Box::new(err))
    }

    #[must_use]
    pub const fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }
}

/// Errors returned by connectors, repositories and the router.
#[derive(Debug, Error)]
pub enum OrderStoreError {
    /// The backend could not be opened or did not answer the ping.
    #[error("cannot connect to {dialect} backend at {target}: {source}")]
    Connection {
        dialect: &'static str,
        /// Redacted connection target.
        target: String,
        #[source]
        source: BoxError,
    },

    /// The table bootstrap statement failed.
    #[error("cannot ensure table {table} exists: {source}")]
    Schema {
        table: String,
        #[source]
        source: BackendError,
    },

    /// An order with the same `(order_id, namespace)` is already stored.
    #[error("order {order_id} already exists in namespace {namespace}")]
    DuplicateKey { order_id: String, namespace: String },

    /// Any other store failure.
    #[error("{context}: {source}")]
    Repository {
        context: String,
        #[source]
        source: BackendError,
    },

    /// Dropping the table and/or closing the connection failed.
    #[error("teardown failed (drop: {}, close: {})", describe(.drop.as_ref()), describe(.close.as_ref()))]
    Teardown {
        drop: Option<BackendError>,
        close: Option<BackendError>,
    },

    /// The backend configuration cannot produce a connection string.
    #[error("backend configuration: {0}")]
    Config(String),
}

impl OrderStoreError {
    pub(crate) fn repository(context: impl Into<String>, source: BackendError) -> Self {
        Self::Repository {
            context: context.into(),
            source,
        }
    }

    /// True for the one expected, recoverable failure.
    #[must_use]
    pub const fn is_duplicate_key(&self) -> bool {
        matches!(self, Self::DuplicateKey { .. })
    }
}

fn describe(err: Option<&BackendError>) -> String {
    err.map_or_else(|| "ok".to_string(), ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_teardown_message_lists_both_steps() {
        let err = OrderStoreError::Teardown {
            drop: Some(BackendError::Closed),
            close: None,
        };
        assert_eq!(
            err.to_string(),
            "teardown failed (drop: connection is closed, close: ok)"
        );
    }

    #[test]
    fn test_repository_error_keeps_cause() {
        let err = OrderStoreError::repository(
            "while reading orders",
            BackendError::driver(std::io::Error::other("socket reset")),
        );
        assert_eq!(err.to_string(), "while reading orders: socket reset");
        assert!(std::error::Error::source(&err).is_some());
        assert!(!err.is_duplicate_key());
    }
}
