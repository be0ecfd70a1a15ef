use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "https://app.daytona.io/api";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(2 * 60 * 60);
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(60);

pub const TOKEN_ENV: &str = "DAYTONA_TOKEN";
pub const ORGANIZATION_ENV: &str = "DAYTONA_ORGANIZATION_ID";
pub const API_URL_ENV: &str = "DAYTONA_API_URL";
pub const POLL_INTERVAL_ENV: &str = "DAYTONA_POLL_INTERVAL_MS";
pub const OPERATION_TIMEOUT_ENV: &str = "DAYTONA_OPERATION_TIMEOUT_SECS";
pub const HTTP_TIMEOUT_ENV: &str = "DAYTONA_HTTP_TIMEOUT_SECS";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "The provider requires an API token to authenticate with Daytona. \
         Set it in the provider configuration or use the DAYTONA_TOKEN environment variable."
    )]
    MissingToken,
    #[error("Organization ID to use for requests is required (DAYTONA_ORGANIZATION_ID)")]
    MissingOrganization,
    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
    #[error("Unable to build HTTP client: {0}")]
    HttpClient(String),
}

impl ConfigError {
    pub fn summary(&self) -> &'static str {
        match self {
            ConfigError::MissingToken => "Missing API Token",
            ConfigError::MissingOrganization => "Missing Organization ID",
            ConfigError::Invalid { .. } => "Invalid Provider Configuration",
            ConfigError::HttpClient(_) => "HTTP Client Error",
        }
    }
}

/// Values supplied in the provider block; the environment fills the gaps.
#[derive(Debug, Clone, Default)]
pub struct ProviderSettings {
    pub token: Option<String>,
    pub organization_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub token: String,
    pub organization_id: String,
    pub api_url: String,
    pub poll_interval: Duration,
    pub operation_timeout: Duration,
    pub http_timeout: Duration,
}

impl ProviderConfig {
    pub fn from_env(settings: ProviderSettings) -> Result<Self, ConfigError> {
        Self::resolve(settings, |key| std::env::var(key).ok())
    }

    /// The token from the environment takes precedence over the provider
    /// block; the organization from the provider block takes precedence over
    /// the environment.
    pub fn resolve(
        settings: ProviderSettings,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let token = non_empty(lookup(TOKEN_ENV))
            .or_else(|| non_empty(settings.token))
            .ok_or(ConfigError::MissingToken)?;

        let organization_id = non_empty(settings.organization_id)
            .or_else(|| non_empty(lookup(ORGANIZATION_ENV)))
            .ok_or(ConfigError::MissingOrganization)?;

        let api_url = non_empty(lookup(API_URL_ENV))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            token,
            organization_id,
            api_url,
            poll_interval: duration(&lookup, POLL_INTERVAL_ENV, Duration::from_millis)?
                .unwrap_or(DEFAULT_POLL_INTERVAL),
            operation_timeout: duration(&lookup, OPERATION_TIMEOUT_ENV, Duration::from_secs)?
                .unwrap_or(DEFAULT_OPERATION_TIMEOUT),
            http_timeout: duration(&lookup, HTTP_TIMEOUT_ENV, Duration::from_secs)?
                .unwrap_or(DEFAULT_HTTP_TIMEOUT),
        })
    }
}

fn duration(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    unit: fn(u64) -> Duration,
) -> Result<Option<Duration>, ConfigError> {
    match lookup(name) {
        None => Ok(None),
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(0) | Err(_) => Err(ConfigError::Invalid { name, value: raw }),
            Ok(n) => Ok(Some(unit(n))),
        },
    }
}
