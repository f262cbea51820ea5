//! Configuration management
//!
//! Configuration is read from `config.yml` and may be overridden through
//! `NEWSDESK_*` environment variables. Every key is optional; anything left
//! out falls back to a default suitable for local development.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Site presentation configuration
    #[serde(default)]
    pub site: SiteConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    4321
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/newsdesk.db".to_string()
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// SQLite (default)
    #[default]
    Sqlite,
    /// MySQL
    Mysql,
}

/// Site presentation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Site name shown in page titles and the header
    #[serde(default = "default_site_name")]
    pub name: String,
    /// Directory with `*.html` templates that replace the built-in ones
    #[serde(default)]
    pub templates_path: Option<PathBuf>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: default_site_name(),
            templates_path: None,
        }
    }
}

fn default_site_name() -> String {
    "Newsdesk".to_string()
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError {
        path: String,
        message: String,
    },
}

impl Config {
    /// Load configuration from file
    ///
    /// A missing or empty file yields the default configuration. A file with
    /// invalid YAML is an error that names the offending line and column.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            }
        })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Recognised variables:
    /// - NEWSDESK_SERVER_HOST
    /// - NEWSDESK_SERVER_PORT
    /// - NEWSDESK_DATABASE_DRIVER
    /// - NEWSDESK_DATABASE_URL
    /// - NEWSDESK_SITE_NAME
    /// - NEWSDESK_SITE_TEMPLATES_PATH
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("NEWSDESK_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("NEWSDESK_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }

        if let Ok(driver) = std::env::var("NEWSDESK_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(url) = std::env::var("NEWSDESK_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(name) = std::env::var("NEWSDESK_SITE_NAME") {
            self.site.name = name;
        }
        if let Ok(path) = std::env::var("NEWSDESK_SITE_TEMPLATES_PATH") {
            self.site.templates_path = Some(PathBuf::from(path));
        }
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Tests that touch the process environment serialize on this mutex.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
const ENV_KEYS: &[&str] = &[
    "NEWSDESK_SERVER_HOST",
    "NEWSDESK_SERVER_PORT",
    "NEWSDESK_DATABASE_DRIVER",
    "NEWSDESK_DATABASE_URL",
    "NEWSDESK_SITE_NAME",
    "NEWSDESK_SITE_TEMPLATES_PATH",
];
