pub mod toml_config;

#[cfg(feature = "cli")]
use crate::core::ConfigProvider;
#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use crate::utils::validation::{self, Validate};
#[cfg(feature = "cli")]
use clap::Parser;

pub const DEFAULT_BIND: &str = "127.0.0.1:8788";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "question-patch")]
#[command(about = "Question patch store with an append-only audit log")]
pub struct CliConfig {
    /// Listen address [default: 127.0.0.1:8788]; overrides `[server].bind` in --config
    #[arg(long)]
    pub bind: Option<String>,

    /// SQLite URL, e.g. sqlite://data/patch.db; without it /api/patch answers 500
    #[arg(long)]
    pub database_url: Option<String>,

    #[arg(long, default_value_t = DEFAULT_MAX_CONNECTIONS)]
    pub max_connections: u32,

    /// Do not run CREATE TABLE IF NOT EXISTS on startup
    #[arg(long)]
    pub skip_bootstrap: bool,

    /// Path to TOML configuration file (CLI --bind / --database-url override it)
    #[arg(short, long)]
    pub config: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn bind_addr(&self) -> &str {
        self.bind.as_deref().unwrap_or(DEFAULT_BIND)
    }

    fn database_url(&self) -> Option<&str> {
        self.database_url.as_deref()
    }

    fn max_connections(&self) -> u32 {
        self.max_connections
    }

    fn bootstrap_schema(&self) -> bool {
        !self.skip_bootstrap
    }

    fn json_logs(&self) -> bool {
        self.json_logs
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_bind_addr("bind", self.bind_addr())?;
        if let Some(url) = &self.database_url {
            validation::validate_database_url("database_url", url)?;
        }
        validation::validate_range("max_connections", self.max_connections, 1, 64)?;

        tracing::info!("✅ CLI configuration validation passed");
        Ok(())
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let config = CliConfig::parse_from(["question-patch"]);
        assert_eq!(config.bind_addr(), DEFAULT_BIND);
        assert_eq!(config.database_url(), None);
        assert_eq!(config.max_connections(), DEFAULT_MAX_CONNECTIONS);
        assert!(config.bootstrap_schema());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cli_overrides() {
        let config = CliConfig::parse_from([
            "question-patch",
            "--bind",
            "0.0.0.0:9000",
            "--database-url",
            "sqlite://patch.db",
            "--skip-bootstrap",
            "--json-logs",
        ]);
        assert_eq!(config.bind_addr(), "0.0.0.0:9000");
        assert_eq!(config.database_url(), Some("sqlite://patch.db"));
        assert!(!config.bootstrap_schema());
        assert!(config.json_logs());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cli_rejects_bad_database_url() {
        let config =
            CliConfig::parse_from(["question-patch", "--database-url", "mysql://db/patch"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_explicit_default_bind_is_kept_as_override() {
        let config = CliConfig::parse_from(["question-patch"]);
        assert_eq!(config.bind, None);

        let cli = CliConfig::parse_from(["question-patch", "--bind", DEFAULT_BIND]);
        assert_eq!(cli.bind.as_deref(), Some(DEFAULT_BIND));

        // 明確指定預設值也要蓋過 TOML 裡的 bind
        let config = toml_config::TomlConfig::from_toml_str("[server]\nbind = \"127.0.0.1:9001\"\n")
            .unwrap()
            .with_overrides(cli.bind.as_deref(), cli.database_url.as_deref());
        assert_eq!(config.bind_addr(), DEFAULT_BIND);
    }
}
