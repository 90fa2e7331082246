//! In-process order repository.
//!
//! Keeps the same contract as the SQL repository (composite key, duplicate
//! detection, insertion-ordered listing) without a database. Selected with
//! `kind = "memory"`.

use async_trait::async_trait;
use orders_core::Order;
use tokio::sync::RwLock;

use crate::error::{BackendError, OrderStoreError};
use crate::repositories::OrderStore;

#[derive(Debug, Default)]
struct MemoryState {
    orders: Vec<Order>,
    closed: bool,
}

/// Repository backed by a vector behind an async lock.
#[derive(Debug, Default)]
pub struct MemoryOrderRepository {
    state: RwLock<MemoryState>,
}

impl MemoryOrderRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn check_open(state: &MemoryState, context: &str) -> Result<(), OrderStoreError> {
        if state.closed {
            return Err(OrderStoreError::repository(context, BackendError::Closed));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for MemoryOrderRepository {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn insert(&self, order: &Order) -> Result<(), OrderStoreError> {
        let mut state = self.state.write().await;
        Self::check_open(&state, "while inserting order")?;

        let exists = state
            .orders
            .iter()
            .any(|o| o.order_id() == order.order_id() && o.namespace() == order.namespace());
        if exists {
            return Err(OrderStoreError::DuplicateKey {
                order_id: order.order_id().to_string(),
                namespace: order.namespace().to_string(),
            });
        }

        state.orders.push(order.clone());
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Order>, OrderStoreError> {
        let state = self.state.read().await;
        Self::check_open(&state, "while reading orders")?;
        Ok(state.orders.clone())
    }

    async fn list_by_namespace(&self, namespace: &str) -> Result<Vec<Order>, OrderStoreError> {
        let state = self.state.read().await;
        Self::check_open(&state, "while reading orders")?;
        Ok(state
            .orders
            .iter()
            .filter(|o| o.namespace() == namespace)
            .cloned()
            .collect())
    }

    async fn delete_all(&self) -> Result<(), OrderStoreError> {
        let mut state = self.state.write().await;
        Self::check_open(&state, "while deleting orders")?;
        state.orders.clear();
        Ok(())
    }

    async fn delete_by_namespace(&self, namespace: &str) -> Result<(), OrderStoreError> {
        let mut state = self.state.write().await;
        Self::check_open(&state, "while deleting orders")?;
        state.orders.retain(|o| o.namespace() != namespace);
        Ok(())
    }

    async fn teardown(&self) -> Result<(), OrderStoreError> {
        let mut state = self.state.write().await;
        if state.closed {
            return Err(OrderStoreError::Teardown {
                drop: Some(BackendError::Closed),
                close: Some(BackendError::Closed),
            });
        }
        state.orders.clear();
        state.closed = true;
        Ok(())
    }
}
