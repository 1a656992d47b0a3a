//! TOML-based configuration for Quarry.
//!
//! Supports a config file (quarry.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [server]
//! base_url = "https://reports.example.com/api/"
//! csrf_token = "${QUARRY_CSRF_TOKEN}"
//! timeout_seconds = 60
//!
//! [endpoints]
//! execute_report = "reports/execute"
//!
//! [catalog]
//! search_debounce_ms = 250
//!
//! [export]
//! output_dir = "./exports"
//!
//! [storage]
//! mode = "local"
//! path = "~/.quarry/reports.db"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub endpoints: EndpointSettings,
    pub catalog: CatalogSettings,
    pub export: ExportSettings,
    pub storage: StorageSettings,
}

/// Backend server settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Base URL that endpoint paths are resolved against.
    pub base_url: String,

    /// CSRF token sent on every POST (supports ${ENV_VAR} expansion).
    pub csrf_token: Option<String>,

    /// Header carrying the CSRF token.
    pub csrf_header: String,

    /// Per-request timeout.
    pub timeout_seconds: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/".to_string(),
            csrf_token: None,
            csrf_header: "X-CSRFToken".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl ServerSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// The CSRF token with environment variables expanded.
    pub fn resolved_csrf_token(&self) -> Result<Option<String>, SettingsError> {
        self.csrf_token.as_deref().map(expand_env_vars).transpose()
    }
}

/// Endpoint paths, relative to `server.base_url`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointSettings {
    pub connections: String,
    pub tables: String,
    pub table_columns: String,
    pub execute_report: String,
    pub save_report: String,
    pub load_reports: String,
    pub load_report: String,
    pub export_report: String,
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            connections: "connections".to_string(),
            tables: "tables".to_string(),
            table_columns: "tableColumns".to_string(),
            execute_report: "executeReport".to_string(),
            save_report: "saveReport".to_string(),
            load_reports: "loadReports".to_string(),
            load_report: "loadReport".to_string(),
            export_report: "export-report".to_string(),
        }
    }
}

/// Schema catalog settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// Trailing-edge delay for catalog search.
    pub search_debounce_ms: u64,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            search_debounce_ms: 300,
        }
    }
}

impl CatalogSettings {
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

/// Export settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Directory exports are saved in; current directory when unset.
    pub output_dir: Option<String>,
}

impl ExportSettings {
    pub fn resolved_output_dir(&self) -> Result<PathBuf, SettingsError> {
        match &self.output_dir {
            Some(dir) => Ok(expand_path(&expand_env_vars(dir)?)),
            None => Ok(PathBuf::from(".")),
        }
    }
}

/// Where saved reports are kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    #[default]
    Remote,
    Local,
}

/// Saved report storage settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageSettings {
    pub mode: StorageMode,

    /// SQLite file for local mode; `~/.quarry/reports.db` when unset.
    pub path: Option<String>,
}

impl StorageSettings {
    pub fn resolved_path(&self) -> Result<Option<PathBuf>, SettingsError> {
        self.path
            .as_deref()
            .map(|p| expand_env_vars(p).map(|p| expand_path(&p)))
            .transpose()
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `QUARRY_CONFIG`
    /// 2. `./quarry.toml`
    /// 3. `~/.config/quarry/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("QUARRY_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("quarry.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("quarry").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.server.base_url.trim().is_empty() {
            return Err(SettingsError::InvalidConfig(
                "server.base_url must not be empty".to_string(),
            ));
        }
        if self.server.timeout_seconds == 0 {
            return Err(SettingsError::InvalidConfig(
                "server.timeout_seconds must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Expand a leading `~/` to the home directory.
fn expand_path(s: &str) -> PathBuf {
    match (s.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(s),
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let var_name = if chars.peek() == Some(&'{') {
            chars.next();
            let mut name = String::new();
            for ch in chars.by_ref() {
                if ch == '}' {
                    break;
                }
                name.push(ch);
            }
            name
        } else {
            let mut name = String::new();
            while let Some(ch) = chars.next_if(|ch| ch.is_alphanumeric() || *ch == '_') {
                name.push(ch);
            }
            if name.is_empty() {
                // Lone '$'
                result.push('$');
                continue;
            }
            name
        };

        let value = env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name))?;
        result.push_str(&value);
    }

    Ok(result)
}
