use domain::services::ViewLimits;
use serde::Deserialize;
use std::net::{AddrParseError, SocketAddr};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub fcm: FcmConfig,
    #[serde(default)]
    pub views: ViewsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl DatabaseConfig {
    /// Pool settings for the persistence layer.
    pub fn pool_config(&self) -> persistence::db::DatabaseConfig {
        persistence::db::DatabaseConfig {
            url: self.url.clone(),
            max_connections: self.max_connections,
            min_connections: self.min_connections,
            connect_timeout_secs: self.connect_timeout_secs,
            idle_timeout_secs: self.idle_timeout_secs,
        }
    }
}

/// Which document store backs the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    /// Process-local store; data is lost on restart.
    Memory,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

/// Session cookie settings. Cookie names are the session marker keys.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Where the guard sends callers without the required role.
    #[serde(default = "default_login_page")]
    pub login_page: String,

    #[serde(default = "default_cookie_path")]
    pub cookie_path: String,

    #[serde(default)]
    pub secure: bool,

    #[serde(default = "default_same_site")]
    pub same_site: String,

    /// Cookie lifetime; markers never expire server-side.
    #[serde(default = "default_session_max_age")]
    pub max_age_secs: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            login_page: default_login_page(),
            cookie_path: default_cookie_path(),
            secure: false,
            same_site: default_same_site(),
            max_age_secs: default_session_max_age(),
        }
    }
}

/// Firebase Cloud Messaging settings.
#[derive(Debug, Clone, Deserialize)]
pub struct FcmConfig {
    /// When false a logging gateway is used and nothing is delivered.
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub project_id: String,

    /// Service account JSON, inline or as a file path.
    #[serde(default)]
    pub credentials: String,

    #[serde(default = "default_fcm_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_fcm_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_true")]
    pub high_priority: bool,

    /// Topic every registered token joins and broadcasts go to.
    #[serde(default = "default_topic")]
    pub default_topic: String,
}

impl Default for FcmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            project_id: String::new(),
            credentials: String::new(),
            timeout_ms: default_fcm_timeout_ms(),
            max_retries: default_fcm_max_retries(),
            high_priority: true,
            default_topic: default_topic(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ViewsConfig {
    #[serde(default = "default_recent_window_days")]
    pub recent_window_days: i64,

    #[serde(default = "default_dashboard_incident_limit")]
    pub dashboard_incident_limit: usize,

    #[serde(default = "default_list_limit")]
    pub list_limit: usize,

    #[serde(default = "default_user_dashboard_cards")]
    pub user_dashboard_cards: usize,
}

impl Default for ViewsConfig {
    fn default() -> Self {
        Self {
            recent_window_days: default_recent_window_days(),
            dashboard_incident_limit: default_dashboard_incident_limit(),
            list_limit: default_list_limit(),
            user_dashboard_cards: default_user_dashboard_cards(),
        }
    }
}

impl ViewsConfig {
    pub fn limits(&self) -> ViewLimits {
        ViewLimits {
            recent_window_days: self.recent_window_days,
            dashboard_incident_limit: self.dashboard_incident_limit,
            list_limit: self.list_limit,
            user_dashboard_cards: self.user_dashboard_cards,
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    30
}
fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    5
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_login_page() -> String {
    "/login.html".to_string()
}
fn default_cookie_path() -> String {
    "/".to_string()
}
fn default_same_site() -> String {
    "Lax".to_string()
}
fn default_session_max_age() -> i64 {
    604800 // 7 days
}
fn default_fcm_timeout_ms() -> u64 {
    10000
}
fn default_fcm_max_retries() -> u32 {
    3
}
fn default_true() -> bool {
    true
}
fn default_topic() -> String {
    domain::services::messaging::DEFAULT_TOPIC.to_string()
}
fn default_recent_window_days() -> i64 {
    30
}
fn default_dashboard_incident_limit() -> usize {
    25
}
fn default_list_limit() -> usize {
    50
}
fn default_user_dashboard_cards() -> usize {
    10
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with CAMPUSCARE__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("CAMPUSCARE").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration for tests from embedded defaults and overrides,
    /// without touching the file system. Validation is skipped.
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [server]
            host = "127.0.0.1"
            port = 8080
            request_timeout_secs = 30

            [database]
            url = ""
            max_connections = 5
            min_connections = 1
            connect_timeout_secs = 10
            idle_timeout_secs = 600

            [storage]
            backend = "memory"

            [logging]
            level = "debug"
            format = "pretty"

            [security]
            cors_origins = []

            [session]
            login_page = "/login.html"
            cookie_path = "/"
            secure = false
            same_site = "Lax"

            [fcm]
            enabled = false
            default_topic = "all"

            [views]
            recent_window_days = 30
            dashboard_incident_limit = 25
            list_limit = 50
            user_dashboard_cards = 10
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.storage.backend == StorageBackend::Postgres && self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "CAMPUSCARE__DATABASE__URL environment variable must be set".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "Server port cannot be 0".to_string(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigValidationError::InvalidValue(
                "min_connections cannot exceed max_connections".to_string(),
            ));
        }

        if self.fcm.enabled && (self.fcm.project_id.is_empty() || self.fcm.credentials.is_empty())
        {
            return Err(ConfigValidationError::MissingRequired(
                "fcm.project_id and fcm.credentials are required when FCM is enabled".to_string(),
            ));
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }
}
