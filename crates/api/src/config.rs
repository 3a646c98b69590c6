use serde::Deserialize;
use std::net::{AddrParseError, SocketAddr};

/// Database URL scheme that selects the in-process store.
pub const MEMORY_DATABASE_SCHEME: &str = "memory://";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub tokens: TokenConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Base URL for links in outgoing email. When empty it is derived from
    /// the incoming request.
    #[serde(default)]
    pub public_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
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
    pub fn is_memory(&self) -> bool {
        self.url.starts_with(MEMORY_DATABASE_SCHEME)
    }

    pub fn pool_config(&self) -> persistence::DatabaseConfig {
        persistence::DatabaseConfig {
            url: self.url.clone(),
            max_connections: self.max_connections,
            min_connections: self.min_connections,
            connect_timeout_secs: self.connect_timeout_secs,
            idle_timeout_secs: self.idle_timeout_secs,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Per-client limit on the public account and contact routes. 0 disables it.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: u32,

    /// Honour X-Forwarded-* headers when deriving the request base URL and
    /// the client address. Enable only behind a proxy that overwrites them.
    #[serde(default)]
    pub trust_forwarded_headers: bool,

    /// Send Strict-Transport-Security. Enable only when TLS terminates in front of the service.
    #[serde(default)]
    pub hsts_enabled: bool,
}

/// Outbound email configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// When false, messages are logged and dropped.
    #[serde(default)]
    pub enabled: bool,

    /// console, smtp or sendgrid
    #[serde(default = "default_email_provider")]
    pub provider: String,

    #[serde(default)]
    pub smtp_host: String,

    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    #[serde(default)]
    pub smtp_username: String,

    #[serde(default)]
    pub smtp_password: String,

    #[serde(default = "default_smtp_tls")]
    pub smtp_use_tls: bool,

    #[serde(default)]
    pub sendgrid_api_key: String,

    /// Directory holding template overrides. Built-in templates are used for
    /// any file that is missing.
    #[serde(default)]
    pub templates_dir: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_email_provider(),
            smtp_host: String::new(),
            smtp_port: default_smtp_port(),
            smtp_username: String::new(),
            smtp_password: String::new(),
            smtp_use_tls: default_smtp_tls(),
            sendgrid_api_key: String::new(),
            templates_dir: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    /// Upper bound on generate-and-check rounds when issuing a user token.
    #[serde(default = "default_max_issue_attempts")]
    pub max_issue_attempts: u32,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            max_issue_attempts: default_max_issue_attempts(),
        }
    }
}

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
fn default_rate_limit() -> u32 {
    60
}
fn default_email_provider() -> String {
    "console".to_string()
}
fn default_smtp_port() -> u16 {
    587
}
fn default_smtp_tls() -> bool {
    true
}
fn default_max_issue_attempts() -> u32 {
    16
}

const EMAIL_PROVIDERS: [&str; 3] = ["console", "smtp", "sendgrid"];

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
    /// 1. config/default.toml
    /// 2. config/local.toml (optional, not in git)
    /// 3. Environment variables with the APP__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Builds a config from embedded defaults plus overrides, without files.
    #[cfg(test)]
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [server]
            host = "0.0.0.0"
            port = 8080
            request_timeout_secs = 30
            public_base_url = ""

            [database]
            url = ""
            max_connections = 20
            min_connections = 5
            connect_timeout_secs = 10
            idle_timeout_secs = 600

            [logging]
            level = "info"
            format = "json"

            [security]
            cors_origins = []
            rate_limit_per_minute = 60
            trust_forwarded_headers = false
            hsts_enabled = false

            [email]
            enabled = false
            provider = "console"

            [tokens]
            max_issue_attempts = 16
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        builder.build()?.try_deserialize()
    }

    fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "APP__DATABASE__URL environment variable must be set".to_string(),
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

        if self.tokens.max_issue_attempts == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "tokens.max_issue_attempts must be at least 1".to_string(),
            ));
        }

        if !EMAIL_PROVIDERS.contains(&self.email.provider.as_str()) {
            return Err(ConfigValidationError::InvalidValue(format!(
                "Unknown email provider '{}'",
                self.email.provider
            )));
        }

        let base_url = self.server.public_base_url.trim();
        if !base_url.is_empty()
            && !(base_url.starts_with("http://") || base_url.starts_with("https://"))
        {
            return Err(ConfigValidationError::InvalidValue(
                "server.public_base_url must start with http:// or https://".to_string(),
            ));
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }
}
