//! SQL order repository.
//!
//! Binds one [`Backend`] to one table. The table name is sanitized right
//! before each statement is built; order fields and namespaces are always
//! bound parameters.

use async_trait::async_trait;
use orders_core::{sanitize_identifier, Order};
use std::sync::Arc;

use crate::backend::{Backend, SqlParam};
use crate::dialect::Dialect;
use crate::error::OrderStoreError;
use crate::repositories::OrderStore;

/// Repository for the orders table on a SQL backend.
#[derive(Clone)]
pub struct SqlOrderRepository {
    backend: Arc<dyn Backend>,
    table: String,
}

impl std::fmt::Debug for SqlOrderRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlOrderRepository")
            .field("dialect", &self.backend.dialect())
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl SqlOrderRepository {
    /// Creates a repository over an open backend.
    ///
    /// The table is expected to exist already; see
    /// [`crate::connector::Connector::ensure_table`].
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, table: impl Into<String>) -> Self {
        Self {
            backend,
            table: table.into(),
        }
    }

    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.backend.dialect()
    }

    /// Configured table name, before sanitization.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    fn safe_table(&self) -> String {
        sanitize_identifier(&self.table)
    }
}

#[async_trait]
impl OrderStore for SqlOrderRepository {
    fn backend_name(&self) -> &'static str {
        self.dialect().driver_name()
    }

    async fn insert(&self, order: &Order) -> Result<(), OrderStoreError> {
        let sql = self.dialect().insert_sql(&self.safe_table());
        tracing::debug!("Running insert order query: {:?}", sql);

        let params = [
            SqlParam::Text(order.order_id()),
            SqlParam::Text(order.namespace()),
            SqlParam::Decimal(order.total()),
        ];
        match self.backend.execute(&sql, &params).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_unique_violation() => Err(OrderStoreError::DuplicateKey {
                order_id: order.order_id().to_string(),
                namespace: order.namespace().to_string(),
            }),
            Err(e) => Err(OrderStoreError::repository("while inserting order", e)),
        }
    }

    async fn list_all(&self) -> Result<Vec<Order>, OrderStoreError> {
        let sql = self.dialect().select_all_sql(&self.safe_table());
        tracing::debug!("Querying orders: {:?}", sql);

        self.backend
            .fetch_orders(&sql, &[])
            .await
            .map_err(|e| OrderStoreError::repository("while reading orders from DB", e))
    }

    async fn list_by_namespace(&self, namespace: &str) -> Result<Vec<Order>, OrderStoreError> {
        let sql = self.dialect().select_by_namespace_sql(&self.safe_table());
        tracing::debug!("Querying orders for namespace {}: {:?}", namespace, sql);

        self.backend
            .fetch_orders(&sql, &[SqlParam::Text(namespace)])
            .await
            .map_err(|e| {
                OrderStoreError::repository(
                    format!("while reading orders for namespace {namespace:?} from DB"),
                    e,
                )
            })
    }

    async fn delete_all(&self) -> Result<(), OrderStoreError> {
        let sql = self.dialect().delete_all_sql(&self.safe_table());
        tracing::debug!("Deleting orders: {:?}", sql);

        let deleted = self
            .backend
            .execute(&sql, &[])
            .await
            .map_err(|e| OrderStoreError::repository("while deleting orders", e))?;
        tracing::debug!("Deleted {} orders", deleted);
        Ok(())
    }

    async fn delete_by_namespace(&self, namespace: &str) -> Result<(), OrderStoreError> {
        let sql = self.dialect().delete_by_namespace_sql(&self.safe_table());
        tracing::debug!("Deleting orders in namespace {}: {:?}", namespace, sql);

        let deleted = self
            .backend
            .execute(&sql, &[SqlParam::Text(namespace)])
            .await
            .map_err(|e| {
                OrderStoreError::repository(
                    format!("while deleting orders in namespace {namespace:?}"),
                    e,
                )
            })?;
        tracing::debug!("Deleted {} orders in namespace {}", deleted, namespace);
        Ok(())
    }

    async fn teardown(&self) -> Result<(), OrderStoreError> {
        let sql = self.dialect().drop_table_sql(&self.safe_table());
        tracing::debug!("Removing DB table: {:?}", sql);

        let drop = self.backend.execute(&sql, &[]).await.err();
        let close = self.backend.close().await.err();

        if drop.is_none() && close.is_none() {
            Ok(())
        } else {
            Err(OrderStoreError::Teardown { drop, close })
        }
    }
}
