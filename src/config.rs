use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::error::{AppError, Result};

static CONFIG: OnceLock<Config> = OnceLock::new();

pub const APP_DIR_NAME: &str = "okrtracker";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub permissions: PermissionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StorageBackend,
    pub db_name: String,
    /// Full sqlx connection string; overrides `db_name` when set.
    #[serde(default)]
    pub url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum PermissionMode {
    AllowAll,
    AllowList,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionConfig {
    pub mode: PermissionMode,
    #[serde(default)]
    pub editors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub filter: String,
}

fn env_or(key: &str, fallback: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| fallback.to_string())
}

fn env_is_set(key: &str) -> bool {
    std::env::var(key).is_ok()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                backend: match env_or("OKR_DATABASE_BACKEND", "sqlite").as_str() {
                    "memory" => StorageBackend::Memory,
                    _ => StorageBackend::Sqlite,
                },
                db_name: env_or("OKR_DATABASE_NAME", "okrtracker.db"),
                url: std::env::var("OKR_DATABASE_URL").ok(),
                max_connections: env_or("OKR_DATABASE_MAX_CONNECTIONS", "5")
                    .parse()
                    .unwrap_or(5),
            },
            permissions: PermissionConfig {
                mode: match env_or("OKR_PERMISSION_MODE", "allow_all").as_str() {
                    "allow_list" => PermissionMode::AllowList,
                    _ => PermissionMode::AllowAll,
                },
                editors: env_or("OKR_EDITORS", "")
                    .split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(String::from)
                    .collect(),
            },
            logging: LoggingConfig {
                filter: env_or("OKR_LOG_FILTER", "info"),
            },
        }
    }
}

impl Config {
    /// `<config_dir>/okrtracker/config.toml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join("config.toml"))
    }

    /// Builds the effective configuration: file values, overridden by any
    /// environment variable that is set. Unreadable files fall back to the
    /// environment alone.
    pub fn load(path: Option<&Path>) -> Config {
        let env_config = Config::default();

        let path = match path {
            Some(path) if path.exists() => path,
            _ => return env_config,
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(file_config) => Self::merge_configs(file_config, env_config),
                Err(e) => {
                    eprintln!("Failed to parse {}: {}", path.display(), e);
                    env_config
                }
            },
            Err(e) => {
                eprintln!("Failed to read {}: {}", path.display(), e);
                env_config
            }
        }
    }

    pub fn init(config: Config) -> Result<()> {
        CONFIG
            .set(config)
            .map_err(|_| AppError::Configuration("Config already initialized".to_string()))
    }

    pub fn get() -> &'static Config {
        CONFIG.get_or_init(Config::default)
    }

    pub fn validate(&self) -> std::result::Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.database.max_connections == 0 {
            errors.push("Database max connections must be greater than 0".to_string());
        }

        if self.database.backend == StorageBackend::Sqlite
            && self.database.url.is_none()
            && self.database.db_name.trim().is_empty()
        {
            errors.push("Database name must not be empty".to_string());
        }

        if let Some(url) = &self.database.url {
            if !url.starts_with("sqlite:") {
                errors.push("Database URL must start with sqlite:".to_string());
            }
        }

        if self.permissions.mode == PermissionMode::AllowList && self.permissions.editors.is_empty()
        {
            errors.push("allow_list permission mode needs at least one editor".to_string());
        }

        if self.logging.filter.trim().is_empty() {
            errors.push("Log filter must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn merge_configs(file_config: Config, env_config: Config) -> Config {
        fn pick<T>(key: &str, env_value: T, file_value: T) -> T {
            if env_is_set(key) {
                env_value
            } else {
                file_value
            }
        }

        Config {
            database: DatabaseConfig {
                backend: pick(
                    "OKR_DATABASE_BACKEND",
                    env_config.database.backend,
                    file_config.database.backend,
                ),
                db_name: pick(
                    "OKR_DATABASE_NAME",
                    env_config.database.db_name,
                    file_config.database.db_name,
                ),
                url: pick(
                    "OKR_DATABASE_URL",
                    env_config.database.url,
                    file_config.database.url,
                ),
                max_connections: pick(
                    "OKR_DATABASE_MAX_CONNECTIONS",
                    env_config.database.max_connections,
                    file_config.database.max_connections,
                ),
            },
            permissions: PermissionConfig {
                mode: pick(
                    "OKR_PERMISSION_MODE",
                    env_config.permissions.mode,
                    file_config.permissions.mode,
                ),
                editors: pick(
                    "OKR_EDITORS",
                    env_config.permissions.editors,
                    file_config.permissions.editors,
                ),
            },
            logging: LoggingConfig {
                filter: pick(
                    "OKR_LOG_FILTER",
                    env_config.logging.filter,
                    file_config.logging.filter,
                ),
            },
        }
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| AppError::Configuration(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, toml_string)?;
        Ok(())
    }
}

impl DatabaseConfig {
    /// sqlx connection string for the sqlite backend. Without an explicit
    /// URL the file lives under the platform data directory.
    pub fn connection_url(&self) -> Result<String> {
        if let Some(url) = &self.url {
            return Ok(url.clone());
        }

        let data_dir = dirs::data_dir()
            .ok_or_else(|| AppError::Configuration("Could not find data directory".to_string()))?
            .join(APP_DIR_NAME);
        std::fs::create_dir_all(&data_dir)?;

        Ok(format!(
            "sqlite:{}?mode=rwc",
            data_dir.join(&self.db_name).display()
        ))
    }
}
