//! Configuration for LCCN

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LccnConfig {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub subscriptions: SubscriptionConfig,
}

impl LccnConfig {
    pub fn from_file(path: &str) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::InternalError(format!("Failed to read config: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| crate::Error::InternalError(format!("Failed to parse config: {}", e)))
    }

    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("LCCN_DATABASE_URL") {
            config.database.url = url;
        }
        if let Ok(max) = std::env::var("LCCN_DATABASE_MAX_CONNECTIONS") {
            if let Ok(m) = max.parse() {
                config.database.max_connections = m;
            }
        }
        if let Ok(level) = std::env::var("LCCN_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(format) = std::env::var("LCCN_LOG_FORMAT") {
            config.logging.format = format;
        }
        if std::env::var("LCCN_STRICT_VOCABULARY")
            .map(|v| v == "true")
            .unwrap_or(false)
        {
            config.subscriptions.strict_vocabulary = true;
        }

        config
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.database.url.is_empty() {
            return Err(crate::Error::InvalidArgument(
                "database.url must not be empty".into(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(crate::Error::InvalidArgument(
                "database.max_connections must be at least 1".into(),
            ));
        }
        if self.database.min_connections > self.database.max_connections {
            return Err(crate::Error::InvalidArgument(
                "database.min_connections exceeds database.max_connections".into(),
            ));
        }
        self.subscriptions.validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// How long a writer waits for the database lock
    #[serde(default = "default_busy_timeout_secs")]
    pub busy_timeout_secs: u64,
}

fn default_busy_timeout_secs() -> u64 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:///var/lib/lccn/lccn.db?mode=rwc".to_string(),
            max_connections: 16,
            min_connections: 1,
            busy_timeout_secs: default_busy_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Registration policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionConfig {
    /// Reject notification/operation types and states outside the SOL003 vocabulary
    #[serde(default)]
    pub strict_vocabulary: bool,
    /// URI schemes accepted for callback endpoints
    #[serde(default = "default_allowed_schemes")]
    pub allowed_schemes: Vec<String>,
}

fn default_allowed_schemes() -> Vec<String> {
    vec!["http".to_string(), "https".to_string()]
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            strict_vocabulary: false,
            allowed_schemes: default_allowed_schemes(),
        }
    }
}

impl SubscriptionConfig {
    pub fn validate(&self) -> crate::Result<()> {
        if self.allowed_schemes.is_empty() {
            return Err(crate::Error::InvalidArgument(
                "subscriptions.allowed_schemes must not be empty".into(),
            ));
        }
        Ok(())
    }
}
