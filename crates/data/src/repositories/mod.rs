//! Order repositories.
//!
//! [`OrderStore`] is the contract the router and the HTTP layer depend on.
//! [`SqlOrderRepository`] implements it over a SQL [`crate::backend::Backend`],
//! [`MemoryOrderRepository`] keeps orders in process.

pub mod memory_repo;
pub mod order_repo;

pub use memory_repo::MemoryOrderRepository;
pub use order_repo::SqlOrderRepository;

use async_trait::async_trait;
use orders_core::Order;

use crate::error::OrderStoreError;

/// The five order operations plus teardown.
///
/// Implementations are shared between request tasks and must tolerate
/// concurrent calls. Nothing is retried.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Short backend identifier for diagnostics.
    fn backend_name(&self) -> &'static str;

    /// Stores a new order.
    ///
    /// # Errors
    /// [`OrderStoreError::DuplicateKey`] if `(order_id, namespace)` exists,
    /// [`OrderStoreError::Repository`] for any other failure.
    async fn insert(&self, order: &Order) -> Result<(), OrderStoreError>;

    /// Returns every stored order; empty when there are none.
    ///
    /// # Errors
    /// Returns [`OrderStoreError::Repository`] if the query or row mapping fails.
    async fn list_all(&self) -> Result<Vec<Order>, OrderStoreError>;

    /// Returns the orders whose namespace equals `namespace`.
    ///
    /// # Errors
    /// Returns [`OrderStoreError::Repository`] if the query or row mapping fails.
    async fn list_by_namespace(&self, namespace: &str) -> Result<Vec<Order>, OrderStoreError>;

    /// # Errors
    /// Returns [`OrderStoreError::Repository`] if the statement fails.
    async fn delete_all(&self) -> Result<(), OrderStoreError>;

    /// Deletes only the orders in `namespace`.
    ///
    /// # Errors
    /// Returns [`OrderStoreError::Repository`] if the statement fails.
    async fn delete_by_namespace(&self, namespace: &str) -> Result<(), OrderStoreError>;

    /// Drops the table and closes the connection. Cleanup paths only.
    ///
    /// # Errors
    /// Returns [`OrderStoreError::Teardown`] naming the step(s) that failed.
    async fn teardown(&self) -> Result<(), OrderStoreError>;
}
