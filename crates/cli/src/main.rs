use anyhow::Context;
use clap::{Parser, Subcommand};
use orders_core::{AppConfig, BackendConfig, ConfigLoader};
use orders_data::{connect_store, connection_string, redact_connection_string, BackendRouter};
use orders_web_api::{ApiServer, AppState};
use secrecy::ExposeSecret;

#[derive(Parser)]
#[command(name = "orders")]
#[command(about = "Order service backed by two interchangeable databases", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect both backends and serve the HTTP API
    Serve {
        /// Config file path
        #[arg(short, long, default_value = "config/Config.toml", env = "ORDERS_CONFIG")]
        config: String,
        /// Profile overlay, e.g. `test` loads `config/Config.test.toml` on top
        #[arg(short, long, env = "ORDERS_PROFILE")]
        profile: Option<String>,
        /// Server address, overrides `[server]` from the config file
        #[arg(short, long)]
        addr: Option<String>,
    },
    /// Connect both backends, then drop their tables and close them
    Teardown {
        /// Config file path
        #[arg(short, long, default_value = "config/Config.toml", env = "ORDERS_CONFIG")]
        config: String,
        /// Profile overlay
        #[arg(short, long, env = "ORDERS_PROFILE")]
        profile: Option<String>,
    },
    /// Print the effective configuration with credentials masked
    Config {
        /// Config file path
        #[arg(short, long, default_value = "config/Config.toml", env = "ORDERS_CONFIG")]
        config: String,
        /// Profile overlay
        #[arg(short, long, env = "ORDERS_PROFILE")]
        profile: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Serve {
            config,
            profile,
            addr,
        } => {
            let config = load_config(&config, profile.as_deref())?;
            run_server(&config, addr).await?;
        }
        Commands::Teardown { config, profile } => {
            let config = load_config(&config, profile.as_deref())?;
            run_teardown(&config).await?;
        }
        Commands::Config { config, profile } => {
            let config = load_config(&config, profile.as_deref())?;
            for line in describe_config(&config)? {
                println!("{line}");
            }
        }
    }

    Ok(())
}

fn load_config(path: &str, profile: Option<&str>) -> anyhow::Result<AppConfig> {
    let config = match profile {
        Some(profile) => ConfigLoader::load_with_profile(path, profile)?,
        None => ConfigLoader::load(path)?,
    };
    tracing::info!("Loaded configuration from {}", path);
    Ok(config)
}

/// Connects primary then secondary. Either failure aborts startup.
async fn bootstrap(config: &AppConfig) -> anyhow::Result<BackendRouter> {
    let table = &config.storage.table;

    let primary = connect_store(&config.backends.primary, table)
        .await
        .context("Unable to connect to primary backend")?;
    let secondary = connect_store(&config.backends.secondary, table)
        .await
        .context("Unable to connect to secondary backend")?;

    Ok(BackendRouter::new(
        primary,
        secondary,
        config.routing.selector.clone(),
    ))
}

async fn run_server(config: &AppConfig, addr: Option<String>) -> anyhow::Result<()> {
    let router = bootstrap(config).await?;
    let state = AppState::new(router, &config.routing)?;
    let addr = addr.unwrap_or_else(|| config.server.addr());

    tracing::info!(
        "Starting web API server on {} (routing header {:?})",
        addr,
        config.routing.header
    );
    ApiServer::new(state).serve(&addr, shutdown_signal()).await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

async fn run_teardown(config: &AppConfig) -> anyhow::Result<()> {
    let router = bootstrap(config).await?;
    router
        .teardown()
        .await
        .context("Teardown did not complete")?;
    tracing::info!("Dropped table {} on both backends", config.storage.table);
    Ok(())
}

fn describe_backend(name: &str, backend: &BackendConfig) -> anyhow::Result<String> {
    let target = match connection_string(backend)? {
        Some(dsn) => redact_connection_string(dsn.expose_secret()),
        None => "in-process".to_string(),
    };
    Ok(format!("{name}: {} {target}", backend.kind))
}

fn describe_config(config: &AppConfig) -> anyhow::Result<Vec<String>> {
    Ok(vec![
        format!("server: {}", config.server.addr()),
        format!(
            "routing: header={} selector={} missing_selector={:?}",
            config.routing.header, config.routing.selector, config.routing.missing_selector
        ),
        format!("table: {}", config.storage.table),
        describe_backend("primary", &config.backends.primary)?,
        describe_backend("secondary", &config.backends.secondary)?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use orders_core::{
        BackendKind, BackendsConfig, MissingSelector, Order, RoutingConfig, ServerConfig,
        StorageConfig,
    };
    use orders_data::OrderStore;
    use secrecy::SecretString;

    fn memory_config() -> AppConfig {
        AppConfig {
            server: ServerConfig::default(),
            routing: RoutingConfig {
                header: "end-user".to_string(),
                selector: "alice".to_string(),
                missing_selector: MissingSelector::Fallback,
            },
            storage: StorageConfig::default(),
            backends: BackendsConfig {
                primary: BackendConfig::memory(),
                secondary: BackendConfig::memory(),
            },
        }
    }

    #[test]
    fn test_cli_parses_serve() {
        let cli = Cli::try_parse_from(["orders", "serve", "--addr", "127.0.0.1:9000"]).unwrap();
        match cli.command {
            Commands::Serve { addr, .. } => assert_eq!(addr.as_deref(), Some("127.0.0.1:9000")),
            _ => panic!("expected serve"),
        }
    }

    #[tokio::test]
    async fn test_bootstrap_memory_backends_are_independent() {
        let router = bootstrap(&memory_config()).await.unwrap();
        let order = Order::new("1", "", 1.into()).unwrap();

        router.select(Some("alice")).insert(&order).await.unwrap();

        assert_eq!(router.select(Some("alice")).list_all().await.unwrap().len(), 1);
        assert!(router.select(None).list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_teardown_memory_backends() {
        run_teardown(&memory_config()).await.unwrap();
    }

    #[test]
    fn test_describe_config_masks_credentials() {
        let mut config = memory_config();
        config.backends.secondary = BackendConfig {
            kind: BackendKind::SqlServer,
            host: Some("mssql".to_string()),
            user: Some("sa".to_string()),
            password: Some(SecretString::from("Str0ng!pass")),
            database: Some("orders".to_string()),
            ..BackendConfig::memory()
        };

        let lines = describe_config(&config).unwrap().join("\n");

        assert!(lines.contains("primary: memory in-process"));
        assert!(lines.contains("secondary: sqlserver server=tcp:mssql,1433"));
        assert!(!lines.contains("Str0ng"));
        assert!(!lines.contains("=sa;"));
    }
}
