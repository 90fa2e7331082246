//! Order storage for the orders service.
//!
//! This crate provides:
//! - SQL dialects for Postgres and SQL Server
//! - Connectors that open, ping and bootstrap a backend
//! - The order repositories (SQL and in-memory)
//! - The header-based router over two bound repositories

pub mod backend;
pub mod connector;
pub mod dialect;
pub mod error;
pub mod repositories;
pub mod router;

pub use backend::{Backend, SqlParam};
pub use connector::{
    bind, connect_store, connection_string, redact_connection_string, Connector,
    PostgresConnector, SqlServerConnector,
};
pub use dialect::Dialect;
pub use error::{BackendError, OrderStoreError};
pub use repositories::{MemoryOrderRepository, OrderStore, SqlOrderRepository};
pub use router::{BackendRouter, Route};
