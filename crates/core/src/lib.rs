//! Core types for the orders service.
//!
//! - Configuration types and the figment-based loader
//! - The validated [`Order`] model
//! - The SQL identifier sanitizer shared by every backend

pub mod config;
pub mod config_loader;
pub mod order;
pub mod sanitize;

pub use config::{
    AppConfig, BackendConfig, BackendKind, BackendsConfig, ConfigError, MissingSelector,
    RoutingConfig, ServerConfig, StorageConfig,
};
pub use config_loader::ConfigLoader;
pub use order::{Order, OrderRequest, ValidationError, DEFAULT_NAMESPACE};
pub use sanitize::sanitize_identifier;
