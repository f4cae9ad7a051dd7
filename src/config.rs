use anyhow::{anyhow, bail, Context};
use serde::{Deserialize, Serialize};

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// How long in-flight requests may drain after a shutdown signal
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}
fn default_request_timeout() -> u64 {
    60
}
fn default_shutdown_grace() -> u64 {
    30
}
fn default_body_limit() -> usize {
    1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            request_timeout_secs: default_request_timeout(),
            shutdown_grace_secs: default_shutdown_grace(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

/// Argon2id cost parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordHashingConfig {
    #[serde(default = "default_memory_kib")]
    pub memory_kib: u32,
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    #[serde(default = "default_parallelism")]
    pub parallelism: u32,
}

fn default_memory_kib() -> u32 {
    argon2::Params::DEFAULT_M_COST
}
fn default_iterations() -> u32 {
    argon2::Params::DEFAULT_T_COST
}
fn default_parallelism() -> u32 {
    argon2::Params::DEFAULT_P_COST
}

impl Default for PasswordHashingConfig {
    fn default() -> Self {
        Self {
            memory_kib: default_memory_kib(),
            iterations: default_iterations(),
            parallelism: default_parallelism(),
        }
    }
}

/// Admin account created on startup if missing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitialAdminConfig {
    pub email: String,
    pub password: String,
    #[serde(default = "default_admin_name")]
    pub name: String,
}

fn default_admin_name() -> String {
    "Administrator".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl")]
    pub token_ttl_hours: i64,
    #[serde(default)]
    pub password_hashing: PasswordHashingConfig,
    pub initial_admin: Option<InitialAdminConfig>,
}

fn default_token_ttl() -> i64 {
    24
}

/// Longest accepted token lifetime: 366 days.
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 366;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_max_page_size")]
    pub max_page_size: i64,
}

fn default_max_page_size() -> i64 {
    100
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            max_page_size: default_max_page_size(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "moviehub=info,tower_http=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Application configuration - loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default)]
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_environment() -> String {
    "development".to_string()
}

impl AppConfig {
    fn validate(&self) -> anyhow::Result<()> {
        if self.auth.jwt_secret.trim().is_empty() {
            bail!("auth.jwt_secret must not be empty");
        }
        if self.auth.token_ttl_hours <= 0 {
            bail!("auth.token_ttl_hours must be positive");
        }
        if self.auth.token_ttl_hours > MAX_TOKEN_TTL_HOURS {
            bail!(
                "auth.token_ttl_hours must not exceed {}",
                MAX_TOKEN_TTL_HOURS
            );
        }
        if self.catalog.max_page_size <= 0 {
            bail!("catalog.max_page_size must be positive");
        }
        Ok(())
    }
}

/// Load config from a YAML file. `${VAR}` placeholders are filled from the
/// environment and `MOVIEHUB__SECTION__KEY` variables override file values.
pub fn load_config(path: &str) -> anyhow::Result<AppConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path))?;
    load_config_from_str(&raw).with_context(|| format!("Invalid config in: {}", path))
}

pub fn load_config_from_str(raw: &str) -> anyhow::Result<AppConfig> {
    parse_config(raw, |name| std::env::var(name).ok())
}

fn parse_config<F>(raw: &str, lookup: F) -> anyhow::Result<AppConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let text = interpolate_env(raw, lookup)?;
    let config: AppConfig = config::Config::builder()
        .add_source(config::File::from_str(&text, config::FileFormat::Yaml))
        .add_source(
            config::Environment::with_prefix("MOVIEHUB")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build config")?
        .try_deserialize()
        .context("Failed to deserialize config")?;
    config.validate()?;
    Ok(config)
}

/// Expand `${NAME}` placeholders through `lookup`; an unset name is an error.
/// Comment lines are copied untouched.
fn interpolate_env<F>(raw: &str, lookup: F) -> anyhow::Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(raw.len());
    for line in raw.lines() {
        if line.trim_start().starts_with('#') {
            out.push_str(line);
        } else {
            let expanded = shellexpand::env_with_context(line, |name| {
                lookup(name).map(Some).ok_or(std::env::VarError::NotPresent)
            })
            .map_err(|e| {
                anyhow!(
                    "Environment variable {} referenced in config is not set",
                    e.var_name
                )
            })?;
            out.push_str(&expanded);
        }
        out.push('\n');
    }
    Ok(out)
}
