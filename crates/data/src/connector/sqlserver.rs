//! SQL Server connector over a single `tiberius` client.
//!
//! Tiberius clients are not pooled; statements are serialized through an
//! async mutex. The client is taken out of the mutex on close, so later
//! calls report [`BackendError::Closed`].

use async_trait::async_trait;
use orders_core::{BackendConfig, Order};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tiberius::{Client, Config, Row, ToSql};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use super::{required, Connector};
use crate::backend::{Backend, SqlParam};
use crate::dialect::Dialect;
use crate::error::{BackendError, OrderStoreError};

const DEFAULT_PORT: u16 = 1433;

type MssqlClient = Client<Compat<TcpStream>>;

pub struct SqlServerConnector {
    dsn: SecretString,
}

impl SqlServerConnector {
    /// # Errors
    /// Returns [`OrderStoreError::Config`] if no URL is given and a
    /// credential field is missing.
    pub fn from_config(config: &BackendConfig) -> Result<Self, OrderStoreError> {
        Ok(Self {
            dsn: Self::build_connection_string(config)?,
        })
    }

    /// ADO.NET style string, or the configured `url` verbatim.
    ///
    /// # Errors
    /// Returns [`OrderStoreError::Config`] if a required field is missing.
    pub fn build_connection_string(config: &BackendConfig) -> Result<SecretString, OrderStoreError> {
        if let Some(url) = &config.url {
            return Ok(url.clone());
        }

        let host = required(config.host.as_deref(), "host")?;
        let user = required(config.user.as_deref(), "user")?;
        let password = required(config.password.as_ref(), "password")?;
        let database = required(config.database.as_deref(), "database")?;
        let port = config.port.unwrap_or(DEFAULT_PORT);

        Ok(SecretString::from(format!(
            "server=tcp:{host},{port};database={};user id={};password={};TrustServerCertificate=true",
            ado_value(database),
            ado_value(user),
            ado_value(password.expose_secret()),
        )))
    }
}

/// Quotes an ADO value with braces when it would otherwise break parsing.
fn ado_value(value: &str) -> String {
    let needs_quoting = value.contains(&[';', '{', '}', '=', '\'', '"'][..])
        || value.starts_with(' ')
        || value.ends_with(' ');
    if needs_quoting {
        format!("{{{}}}", value.replace('}', "}}"))
    } else {
        value.to_string()
    }
}

#[async_trait]
impl Connector for SqlServerConnector {
    fn dialect(&self) -> Dialect {
        Dialect::SqlServer
    }

    fn connection_string(&self) -> &SecretString {
        &self.dsn
    }

    async fn open(&self) -> Result<Arc<dyn Backend>, OrderStoreError> {
        let config =
            Config::from_ado_string(self.dsn.expose_secret()).map_err(|e| self.connection_error(e))?;

        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(|e| self.connection_error(e))?;
        tcp.set_nodelay(true).map_err(|e| self.connection_error(e))?;

        let mut client = Client::connect(config, tcp.compat_write())
            .await
            .map_err(|e| self.connection_error(e))?;

        tracing::debug!("Testing connection");
        client
            .simple_query("SELECT 1")
            .await
            .map_err(|e| self.connection_error(e))?
            .into_row()
            .await
            .map_err(|e| self.connection_error(e))?;

        Ok(Arc::new(SqlServerBackend {
            client: Mutex::new(Some(client)),
        }))
    }
}

/// Open SQL Server connection.
pub struct SqlServerBackend {
    client: Mutex<Option<MssqlClient>>,
}

fn bind_params<'a>(params: &'a [SqlParam<'_>]) -> Vec<&'a dyn ToSql> {
    params
        .iter()
        .map(|param| match param {
            SqlParam::Text(s) => s as &dyn ToSql,
            SqlParam::Decimal(d) => d as &dyn ToSql,
        })
        .collect()
}

fn order_from_row(row: &Row) -> Result<Order, BackendError> {
    let order_id: &str = column(row, "order_id")?;
    let namespace: &str = column(row, "namespace")?;
    let total: Decimal = column(row, "total")?;
    Ok(Order::from_row(
        order_id.to_string(),
        namespace.to_string(),
        total,
    ))
}

fn column<'a, T>(row: &'a Row, name: &str) -> Result<T, BackendError>
where
    T: tiberius::FromSql<'a>,
{
    row.try_get::<T, _>(name)
        .map_err(|e| BackendError::RowMapping(Box::new(e)))?
        .ok_or_else(|| BackendError::RowMapping(format!("column {name} is NULL").into()))
}

#[async_trait]
impl Backend for SqlServerBackend {
    fn dialect(&self) -> Dialect {
        Dialect::SqlServer
    }

    async fn execute(&self, sql: &str, params: &[SqlParam<'_>]) -> Result<u64, BackendError> {
        let mut guard = self.client.lock().await;
        let client = guard.as_mut().ok_or(BackendError::Closed)?;

        let params = bind_params(params);
        let result = client.execute(sql, &params).await.map_err(classify)?;
        Ok(result.total())
    }

    async fn fetch_orders(
        &self,
        sql: &str,
        params: &[SqlParam<'_>],
    ) -> Result<Vec<Order>, BackendError> {
        let mut guard = self.client.lock().await;
        let client = guard.as_mut().ok_or(BackendError::Closed)?;

        let params = bind_params(params);
        let rows = client
            .query(sql, &params)
            .await
            .map_err(classify)?
            .into_first_result()
            .await
            .map_err(classify)?;

        rows.iter().map(order_from_row).collect()
    }

    async fn close(&self) -> Result<(), BackendError> {
        let client = self.client.lock().await.take();
        match client {
            Some(client) => client.close().await.map_err(BackendError::driver),
            None => Err(BackendError::Closed),
        }
    }
}

fn classify(err: tiberius::error::Error) -> BackendError {
    let unique = matches!(
        &err,
        tiberius::error::Error::Server(token)
            if Dialect::SqlServer.is_duplicate_error_number(token.code())
    );
    if unique {
        return BackendError::UniqueViolation(Box::new(err));
    }

    match err {
        e @ tiberius::error::Error::Conversion(_) => BackendError::RowMapping(Box::new(e)),
        e => BackendError::driver(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orders_core::BackendKind;
    use rust_decimal_macros::dec;

    fn config() -> BackendConfig {
        BackendConfig {
            kind: BackendKind::SqlServer,
            host: Some("mssql".to_string()),
            port: None,
            user: Some("sa".to_string()),
            password: Some(SecretString::from("Str0ng!pass")),
            database: Some("orders".to_string()),
            ..BackendConfig::memory()
        }
    }

    #[test]
    fn test_ado_connection_string() {
        let dsn = SqlServerConnector::build_connection_string(&config()).unwrap();
        assert_eq!(
            dsn.expose_secret(),
            "server=tcp:mssql,1433;database=orders;user id=sa;password=Str0ng!pass;TrustServerCertificate=true"
        );
    }

    #[test]
    fn test_ado_string_parses() {
        let dsn = SqlServerConnector::build_connection_string(&config()).unwrap();
        let parsed = Config::from_ado_string(dsn.expose_secret()).unwrap();
        assert_eq!(parsed.get_addr(), "mssql:1433");
    }

    #[test]
    fn test_password_with_separator_is_quoted() {
        let mut config = config();
        config.password = Some(SecretString::from("a;b}c"));
        let dsn = SqlServerConnector::build_connection_string(&config).unwrap();
        assert!(dsn.expose_secret().contains("password={a;b}}c};"));
    }

    #[test]
    fn test_explicit_url_wins() {
        let mut config = config();
        config.url = Some(SecretString::from("server=tcp:other,1433;user=x;password=y"));
        let dsn = SqlServerConnector::build_connection_string(&config).unwrap();
        assert_eq!(dsn.expose_secret(), "server=tcp:other,1433;user=x;password=y");
    }

    #[test]
    fn test_missing_host_is_config_error() {
        let mut config = config();
        config.host = None;
        assert!(matches!(
            SqlServerConnector::build_connection_string(&config),
            Err(OrderStoreError::Config(_))
        ));
    }

    #[test]
    fn test_redacted_target_hides_credentials() {
        let connector = SqlServerConnector::from_config(&config()).unwrap();
        let target = connector.redacted_target();
        assert!(!target.contains("Str0ng"));
        assert!(target.contains("user id=***"));
        assert!(target.contains("server=tcp:mssql,1433"));
    }

    #[test]
    fn test_bind_params_keeps_order() {
        let params = [SqlParam::Text("66"), SqlParam::Decimal(dec!(1.50))];
        assert_eq!(bind_params(&params).len(), 2);
    }

    #[tokio::test]
    async fn test_closed_backend_rejects_calls() {
        let backend = SqlServerBackend {
            client: Mutex::new(None),
        };
        assert!(matches!(backend.execute("SELECT 1", &[]).await, Err(BackendError::Closed)));
        assert!(matches!(backend.close().await, Err(BackendError::Closed)));
    }
}
