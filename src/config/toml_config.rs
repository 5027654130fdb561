use crate::config::{DEFAULT_BIND, DEFAULT_MAX_CONNECTIONS};
use crate::core::ConfigProvider;
use crate::utils::error::{PatchError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub database: Option<DatabaseConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: Option<u32>,
    pub bootstrap_schema: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub json: Option<bool>,
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

fn env_placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid")
    })
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(PatchError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| PatchError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${DATABASE_URL})；未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> String {
        env_placeholder()
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .to_string()
    }

    /// 套用命令列覆蓋設定
    pub fn with_overrides(mut self, bind: Option<&str>, database_url: Option<&str>) -> Self {
        if let Some(bind) = bind {
            self.server.bind = bind.to_string();
        }
        if let Some(url) = database_url {
            let database = self.database.get_or_insert(DatabaseConfig {
                url: None,
                max_connections: None,
                bootstrap_schema: None,
            });
            database.url = Some(url.to_string());
        }
        self
    }

    /// 取得日誌等級
    pub fn log_level(&self) -> Option<&str> {
        self.logging.as_ref().and_then(|l| l.level.as_deref())
    }
}

impl ConfigProvider for TomlConfig {
    fn bind_addr(&self) -> &str {
        &self.server.bind
    }

    fn database_url(&self) -> Option<&str> {
        self.database.as_ref().and_then(|db| db.url.as_deref())
    }

    fn max_connections(&self) -> u32 {
        self.database
            .as_ref()
            .and_then(|db| db.max_connections)
            .unwrap_or(DEFAULT_MAX_CONNECTIONS)
    }

    fn bootstrap_schema(&self) -> bool {
        self.database
            .as_ref()
            .and_then(|db| db.bootstrap_schema)
            .unwrap_or(true)
    }

    fn json_logs(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.json).unwrap_or(false)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_bind_addr("server.bind", &self.server.bind)?;

        // 有 [database] 區段時必須提供 url
        if let Some(database) = &self.database {
            let url = validation::validate_required_field("database.url", &database.url)?;
            validation::validate_database_url("database.url", url)?;
        }

        validation::validate_range("database.max_connections", self.max_connections(), 1, 64)?;

        if let Some(level) = self.log_level() {
            if !["trace", "debug", "info", "warn", "error"].contains(&level) {
                return Err(PatchError::InvalidConfigValueError {
                    field: "logging.level".to_string(),
                    value: level.to_string(),
                    reason: "Valid levels: trace, debug, info, warn, error".to_string(),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_basic_toml_config() {
        let toml_content = r#"
[server]
bind = "0.0.0.0:8080"

[database]
url = "sqlite://data/patch.db"
max_connections = 2

[logging]
level = "debug"
json = true
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.database_url(), Some("sqlite://data/patch.db"));
        assert_eq!(config.max_connections(), 2);
        assert!(config.bootstrap_schema());
        assert!(config.json_logs());
        assert_eq!(config.log_level(), Some("debug"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert_eq!(config.bind_addr(), DEFAULT_BIND);
        assert_eq!(config.database_url(), None);
        assert_eq!(config.max_connections(), DEFAULT_MAX_CONNECTIONS);
        assert!(!config.json_logs());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("QP_TEST_DATABASE_URL", "sqlite://from-env.db");

        let toml_content = r#"
[database]
url = "${QP_TEST_DATABASE_URL}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.database_url(), Some("sqlite://from-env.db"));

        std::env::remove_var("QP_TEST_DATABASE_URL");
    }

    #[test]
    fn test_unknown_env_var_is_left_in_place() {
        let toml_content = r#"
[database]
url = "${QP_TEST_SURELY_UNSET_VARIABLE}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(
            config.database_url(),
            Some("${QP_TEST_SURELY_UNSET_VARIABLE}")
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation() {
        let missing_url = TomlConfig::from_toml_str("[database]\nmax_connections = 3\n").unwrap();
        assert!(matches!(
            missing_url.validate(),
            Err(PatchError::MissingConfigError { .. })
        ));

        let bad_bind = TomlConfig::from_toml_str("[server]\nbind = \"nowhere\"\n").unwrap();
        assert!(bad_bind.validate().is_err());

        let bad_level = TomlConfig::from_toml_str("[logging]\nlevel = \"loud\"\n").unwrap();
        assert!(bad_level.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let config = TomlConfig::from_toml_str("")
            .unwrap()
            .with_overrides(Some("127.0.0.1:0"), Some("sqlite::memory:"));
        assert_eq!(config.bind_addr(), "127.0.0.1:0");
        assert_eq!(config.database_url(), Some("sqlite::memory:"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[server]
bind = "127.0.0.1:9001"
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:9001");
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            TomlConfig::from_toml_str("[server\nbind ="),
            Err(PatchError::ConfigError { .. })
        ));
    }
}
