//! Driver adapters behind the order repository.
//!
//! A [`Backend`] runs one statement per call against an open connection. It
//! knows nothing about tables or orders beyond mapping the three result
//! columns; SQL text is built by the repository.

use async_trait::async_trait;
use orders_core::Order;
use rust_decimal::Decimal;

use crate::dialect::Dialect;
use crate::error::BackendError;

/// A bound statement parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SqlParam<'a> {
    Text(&'a str),
    Decimal(Decimal),
}

#[async_trait]
pub trait Backend: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Runs a statement and returns the number of affected rows.
    async fn execute(&self, sql: &str, params: &[SqlParam<'_>]) -> Result<u64, BackendError>;

    /// Runs a query returning `(order_id, namespace, total)` rows.
    async fn fetch_orders(
        &self,
        sql: &str,
        params: &[SqlParam<'_>],
    ) -> Result<Vec<Order>, BackendError>;

    /// Closes the connection. Later calls fail with [`BackendError::Closed`].
    async fn close(&self) -> Result<(), BackendError>;
}
