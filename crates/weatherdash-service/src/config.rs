//! Server configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use time::UtcOffset;
use weatherdash_core::AnalyticsConfig;

/// Server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server settings.
    pub server: ServerConfig,
    /// Storage settings.
    pub storage: StorageConfig,
    /// The monitored location.
    pub location: LocationConfig,
    /// Background collection from Open-Meteo.
    pub collector: CollectorConfig,
    /// API key gate.
    pub security: SecurityConfig,
    /// Query defaults.
    pub analytics: AnalyticsSettings,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Save configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration, reporting every problem at once.
    ///
    /// # Example
    ///
    /// ```
    /// use weatherdash_service::Config;
    ///
    /// let config = Config::default();
    /// config.validate().expect("Default config should be valid");
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        errors.extend(self.server.validate());
        errors.extend(self.storage.validate());
        errors.extend(self.location.validate());
        errors.extend(self.collector.validate());
        errors.extend(self.security.validate());
        errors.extend(self.analytics.validate());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load and validate configuration from a file.
    pub fn load_validated<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Engine settings derived from the location and analytics sections.
    pub fn analytics_config(&self) -> AnalyticsConfig {
        AnalyticsConfig::new(
            self.location.name.clone(),
            self.location.latitude,
            self.location.longitude,
        )
        .with_utc_offset(self.location.utc_offset())
        .with_default_page_limit(self.analytics.default_page_limit)
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

impl ServerConfig {
    /// Validate server configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.bind.is_empty() {
            errors.push(ValidationError::new("server.bind", "bind address cannot be empty"));
            return errors;
        }

        match self.bind.rsplit_once(':') {
            None => errors.push(ValidationError::new(
                "server.bind",
                format!(
                    "invalid bind address '{}': expected format 'host:port'",
                    self.bind
                ),
            )),
            Some((_, port)) => match port.parse::<u16>() {
                Ok(0) => errors.push(ValidationError::new("server.bind", "port cannot be 0")),
                Err(_) => errors.push(ValidationError::new(
                    "server.bind",
                    format!("invalid port '{}': must be a number 1-65535", port),
                )),
                Ok(_) => {}
            },
        }

        errors
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file path.
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: weatherdash_store::default_db_path(),
        }
    }
}

impl StorageConfig {
    /// Validate storage configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.path.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "storage.path",
                "database path cannot be empty",
            ));
        }

        errors
    }
}

/// The location whose weather is collected and summarized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    /// Label stored on collected records and shown in summaries.
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Local offset from UTC in whole hours, used for times in alerts.
    pub utc_offset_hours: i8,
}

/// Smallest UTC offset in use anywhere.
pub const MIN_UTC_OFFSET_HOURS: i8 = -12;
/// Largest UTC offset in use anywhere.
pub const MAX_UTC_OFFSET_HOURS: i8 = 14;

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            name: "Recife, Brasil".to_string(),
            latitude: -8.05,
            longitude: -34.9,
            utc_offset_hours: -3,
        }
    }
}

impl LocationConfig {
    /// The configured offset; UTC if it is out of range.
    pub fn utc_offset(&self) -> UtcOffset {
        UtcOffset::from_hms(self.utc_offset_hours, 0, 0).unwrap_or(UtcOffset::UTC)
    }

    /// Validate location configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push(ValidationError::new(
                "location.name",
                "location name cannot be empty",
            ));
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            errors.push(ValidationError::new(
                "location.latitude",
                format!("latitude {} is outside -90..=90", self.latitude),
            ));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            errors.push(ValidationError::new(
                "location.longitude",
                format!("longitude {} is outside -180..=180", self.longitude),
            ));
        }
        if !(MIN_UTC_OFFSET_HOURS..=MAX_UTC_OFFSET_HOURS).contains(&self.utc_offset_hours) {
            errors.push(ValidationError::new(
                "location.utc_offset_hours",
                format!(
                    "offset {} is outside {}..={}",
                    self.utc_offset_hours, MIN_UTC_OFFSET_HOURS, MAX_UTC_OFFSET_HOURS
                ),
            ));
        }

        errors
    }
}

/// Minimum collection interval in seconds (1 minute).
pub const MIN_COLLECT_INTERVAL: u64 = 60;
/// Maximum collection interval in seconds (1 day).
pub const MAX_COLLECT_INTERVAL: u64 = 86_400;

/// Default Open-Meteo forecast endpoint.
pub const DEFAULT_OPEN_METEO_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// Background collector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Whether to poll Open-Meteo in the background.
    pub enabled: bool,
    /// Seconds between polls.
    pub interval_secs: u64,
    /// Open-Meteo forecast endpoint, also used for the forecast route.
    pub base_url: String,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 3600,
            base_url: DEFAULT_OPEN_METEO_URL.to_string(),
        }
    }
}

impl CollectorConfig {
    /// Validate collector configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.interval_secs < MIN_COLLECT_INTERVAL {
            errors.push(ValidationError::new(
                "collector.interval_secs",
                format!(
                    "interval {} is too short (minimum {} seconds)",
                    self.interval_secs, MIN_COLLECT_INTERVAL
                ),
            ));
        } else if self.interval_secs > MAX_COLLECT_INTERVAL {
            errors.push(ValidationError::new(
                "collector.interval_secs",
                format!(
                    "interval {} is too long (maximum {} seconds / 1 day)",
                    self.interval_secs, MAX_COLLECT_INTERVAL
                ),
            ));
        }

        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            errors.push(ValidationError::new(
                "collector.base_url",
                format!("'{}' is not an http(s) URL", self.base_url),
            ));
        }

        errors
    }
}

/// Minimum API key length when the key gate is enabled.
pub const MIN_API_KEY_LENGTH: usize = 16;

/// API key authentication settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Require an API key on every route except `/api/health`.
    pub api_key_enabled: bool,
    /// The expected key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl SecurityConfig {
    /// Validate security configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.api_key_enabled {
            match &self.api_key {
                None => errors.push(ValidationError::new(
                    "security.api_key",
                    "api_key is required when api_key_enabled is true",
                )),
                Some(key) if key.len() < MIN_API_KEY_LENGTH => {
                    errors.push(ValidationError::new(
                        "security.api_key",
                        format!(
                            "api_key is too short (minimum {} characters)",
                            MIN_API_KEY_LENGTH
                        ),
                    ))
                }
                Some(_) => {}
            }
        }

        errors
    }
}

/// Largest page size a client may request.
pub const MAX_PAGE_LIMIT: u32 = 1000;

/// Query defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsSettings {
    /// Page size when a listing request gives no `limit`.
    pub default_page_limit: u32,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            default_page_limit: weatherdash_core::DEFAULT_PAGE_LIMIT,
        }
    }
}

impl AnalyticsSettings {
    /// Validate analytics configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if !(1..=MAX_PAGE_LIMIT).contains(&self.default_page_limit) {
            errors.push(ValidationError::new(
                "analytics.default_page_limit",
                format!(
                    "page limit {} is outside 1..={}",
                    self.default_page_limit, MAX_PAGE_LIMIT
                ),
            ));
        }

        errors
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field path (e.g., `server.bind` or `collector.interval_secs`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("weatherdash")
        .join("server.toml")
}
