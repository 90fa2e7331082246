use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::sanitize::sanitize_identifier;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("backend `{backend}` is missing `{field}`")]
    MissingField {
        backend: &'static str,
        field: &'static str,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub routing: RoutingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    pub backends: BackendsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    #[serde(deserialize_with = "text")]
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8017,
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// What to do with a request that carries no routing header at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingSelector {
    /// Route to the secondary backend, like any other non-matching value.
    #[default]
    Fallback,
    /// Answer 400 without touching either backend.
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Request header that carries the selector value.
    #[serde(default = "default_routing_header", deserialize_with = "text")]
    pub header: String,
    /// Exact value that routes a request to the primary backend.
    #[serde(deserialize_with = "text")]
    pub selector: String,
    #[serde(default)]
    pub missing_selector: MissingSelector,
}

fn default_routing_header() -> String {
    "end-user".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Logical table name; sanitized before every use.
    #[serde(deserialize_with = "text")]
    pub table: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            table: "orders".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendsConfig {
    pub primary: BackendConfig,
    pub secondary: BackendConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Postgres,
    #[serde(alias = "mssql")]
    SqlServer,
    Memory,
}

impl BackendKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::SqlServer => "sqlserver",
            Self::Memory => "memory",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection settings for one backend.
///
/// Either `url` is set, or the DSN is assembled from the individual fields.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    pub kind: BackendKind,
    #[serde(default, deserialize_with = "optional_secret")]
    pub url: Option<SecretString>,
    #[serde(default, deserialize_with = "optional_text")]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default, deserialize_with = "optional_text")]
    pub user: Option<String>,
    #[serde(default, deserialize_with = "optional_secret")]
    pub password: Option<SecretString>,
    #[serde(default, deserialize_with = "optional_text")]
    pub database: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

const fn default_max_connections() -> u32 {
    10
}

impl BackendConfig {
    #[must_use]
    pub fn memory() -> Self {
        Self {
            kind: BackendKind::Memory,
            url: None,
            host: None,
            port: None,
            user: None,
            password: None,
            database: None,
            max_connections: default_max_connections(),
        }
    }

    fn validate(&self, backend: &'static str) -> Result<(), ConfigError> {
        if self.kind == BackendKind::Memory || self.url.is_some() {
            return Ok(());
        }
        let required = [
            ("host", self.host.is_some()),
            ("user", self.user.is_some()),
            ("password", self.password.is_some()),
            ("database", self.database.is_some()),
        ];
        for (field, present) in required {
            if !present {
                return Err(ConfigError::MissingField { backend, field });
            }
        }
        Ok(())
    }
}

/// Scalar setting as it reaches serde. Unquoted environment values such as
/// `12345` or `true` arrive typed, but every field using it is text.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Bool(bool),
}

impl From<Scalar> for String {
    fn from(value: Scalar) -> Self {
        match value {
            Scalar::Text(s) => s,
            Scalar::Unsigned(n) => n.to_string(),
            Scalar::Signed(n) => n.to_string(),
            Scalar::Float(n) => n.to_string(),
            Scalar::Bool(b) => b.to_string(),
        }
    }
}

fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Scalar::deserialize(deserializer).map(String::from)
}

fn optional_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(String::from))
}

fn optional_secret<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<SecretString>, D::Error> {
    Ok(optional_text(deserializer)?.map(SecretString::from))
}

impl AppConfig {
    /// Checks the settings that would otherwise only fail at request time.
    ///
    /// # Errors
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.routing.header.trim().is_empty() {
            return Err(ConfigError::Invalid("routing.header is empty".into()));
        }
        if self.routing.selector.is_empty() {
            return Err(ConfigError::Invalid("routing.selector is empty".into()));
        }
        if sanitize_identifier(&self.storage.table).is_empty() {
            return Err(ConfigError::Invalid(format!(
                "storage.table {:?} has no usable identifier characters",
                self.storage.table
            )));
        }
        self.backends.primary.validate("primary")?;
        self.backends.secondary.validate("secondary")?;
        Ok(())
    }
}
