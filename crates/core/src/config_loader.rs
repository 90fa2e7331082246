use crate::config::AppConfig;
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};

/// Prefix for environment overrides, e.g. `ORDERS_ROUTING__SELECTOR`.
pub const ENV_PREFIX: &str = "ORDERS_";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration from a TOML file merged with `ORDERS_*` environment variables.
    ///
    /// Nested keys use a double underscore: `ORDERS_BACKENDS__PRIMARY__URL`.
    ///
    /// # Errors
    ///
    /// Returns an error if the sources cannot be parsed or the result fails validation.
    pub fn load(path: &str) -> Result<AppConfig> {
        Self::extract(Self::figment(path))
    }

    /// Loads configuration with a profile file layered over the base file.
    ///
    /// For `config/Config.toml` and profile `test` the overlay is `config/Config.test.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error if the sources cannot be parsed or the result fails validation.
    pub fn load_with_profile(path: &str, profile: &str) -> Result<AppConfig> {
        let overlay = match path.strip_suffix(".toml") {
            Some(stem) => format!("{stem}.{profile}.toml"),
            None => format!("{path}.{profile}"),
        };
        let figment = Figment::new()
            .merge(Toml::file(path))
            .merge(Toml::file(overlay))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::extract(figment)
    }

    fn figment(path: &str) -> Figment {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    fn extract(figment: Figment) -> Result<AppConfig> {
        let config: AppConfig = figment
            .extract()
            .context("failed to load configuration")?;
        config.validate()?;
        tracing::debug!(
            primary = %config.backends.primary.kind,
            secondary = %config.backends.secondary.kind,
            table = %config.storage.table,
            "configuration loaded"
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackendKind, MissingSelector};
    use figment::Jail;
    use secrecy::ExposeSecret;

    const BASE: &str = r#"
        [routing]
        selector = "alice"

        [backends.primary]
        kind = "memory"

        [backends.secondary]
        kind = "memory"
    "#;

    #[test]
    fn test_defaults_applied() {
        Jail::expect_with(|jail| {
            jail.create_file("Config.toml", BASE)?;
            let config = ConfigLoader::load("Config.toml").map_err(|e| e.to_string())?;

            assert_eq!(config.server.port, 8017);
            assert_eq!(config.server.host, "0.0.0.0");
            assert_eq!(config.routing.header, "end-user");
            assert_eq!(config.routing.missing_selector, MissingSelector::Fallback);
            assert_eq!(config.storage.table, "orders");
            assert_eq!(config.backends.primary.max_connections, 10);
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("Config.toml", BASE)?;
            jail.set_env("ORDERS_ROUTING__SELECTOR", "bob");
            jail.set_env("ORDERS_SERVER__PORT", "9000");
            jail.set_env("ORDERS_BACKENDS__PRIMARY__KIND", "postgres");
            jail.set_env("ORDERS_BACKENDS__PRIMARY__URL", "postgres://u:p@db/orders");

            let config = ConfigLoader::load("Config.toml").map_err(|e| e.to_string())?;

            assert_eq!(config.routing.selector, "bob");
            assert_eq!(config.server.port, 9000);
            assert_eq!(config.backends.primary.kind, BackendKind::Postgres);
            assert_eq!(
                config
                    .backends
                    .primary
                    .url
                    .as_ref()
                    .map(|u| u.expose_secret().to_string()),
                Some("postgres://u:p@db/orders".to_string())
            );
            Ok(())
        });
    }

    #[test]
    fn test_numeric_env_values_kept_as_text() {
        Jail::expect_with(|jail| {
            jail.create_file("Config.toml", BASE)?;
            jail.set_env("ORDERS_ROUTING__SELECTOR", "12345");
            jail.set_env("ORDERS_BACKENDS__PRIMARY__KIND", "postgres");
            jail.set_env("ORDERS_BACKENDS__PRIMARY__HOST", "db");
            jail.set_env("ORDERS_BACKENDS__PRIMARY__USER", "1001");
            jail.set_env("ORDERS_BACKENDS__PRIMARY__PASSWORD", "424242");
            jail.set_env("ORDERS_BACKENDS__PRIMARY__DATABASE", "orders");

            let config = ConfigLoader::load("Config.toml").map_err(|e| e.to_string())?;

            assert_eq!(config.routing.selector, "12345");
            assert_eq!(config.backends.primary.user.as_deref(), Some("1001"));
            assert_eq!(
                config
                    .backends
                    .primary
                    .password
                    .as_ref()
                    .map(|p| p.expose_secret().to_string()),
                Some("424242".to_string())
            );
            Ok(())
        });
    }

    #[test]
    fn test_profile_overlay() {
        Jail::expect_with(|jail| {
            jail.create_file("Config.toml", BASE)?;
            jail.create_file(
                "Config.test.toml",
                r#"
                [storage]
                table = "orders_test"

                [routing]
                missing_selector = "reject"
                "#,
            )?;

            let config = ConfigLoader::load_with_profile("Config.toml", "test")
                .map_err(|e| e.to_string())?;

            assert_eq!(config.storage.table, "orders_test");
            assert_eq!(config.routing.selector, "alice");
            assert_eq!(config.routing.missing_selector, MissingSelector::Reject);
            Ok(())
        });
    }

    #[test]
    fn test_invalid_config_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "Config.toml",
                r#"
                [routing]
                selector = "alice"

                [backends.primary]
                kind = "sqlserver"
                host = "db"

                [backends.secondary]
                kind = "memory"
                "#,
            )?;

            assert!(ConfigLoader::load("Config.toml").is_err());
            Ok(())
        });
    }
}
