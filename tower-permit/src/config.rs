//! Client configuration.
//!
//! A [`ClientConfig`] can be deserialized from any serde format, built in code,
//! or read from `PERMIT_GATE_*` environment variables.

use std::env;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::time::Duration;

use http::Uri;
use permit_gate::RateWindow;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::ConfigError;

/// Document creation endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "https://ismp.crpt.ru/api/v3/lk/documents/create";

pub const ENV_ENDPOINT: &str = "PERMIT_GATE_ENDPOINT";
pub const ENV_LIMIT: &str = "PERMIT_GATE_LIMIT";
pub const ENV_PERIOD_MS: &str = "PERMIT_GATE_PERIOD_MS";
pub const ENV_INITIAL_DELAY_MS: &str = "PERMIT_GATE_INITIAL_DELAY_MS";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "PERMIT_GATE_REQUEST_TIMEOUT_MS";

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_limit() -> usize {
    10
}

fn default_period_ms() -> u64 {
    1_000
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

/// Everything needed to build a [`crate::GatedClient`] over HTTP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Endpoint receiving the POSTed documents
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Maximum admissions per window
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Window length in milliseconds
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,
    /// Delay before the first reset in milliseconds; defaults to one period
    #[serde(default)]
    pub initial_delay_ms: Option<u64>,
    /// Per-request transport timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            limit: default_limit(),
            period_ms: default_period_ms(),
            initial_delay_ms: None,
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        debug!("Loading client configuration from environment variables");
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(endpoint) = lookup(ENV_ENDPOINT) {
            config.endpoint = endpoint;
        }
        if let Some(limit) = lookup(ENV_LIMIT) {
            config.limit = parse_value(ENV_LIMIT, &limit)?;
        }
        if let Some(period) = lookup(ENV_PERIOD_MS) {
            config.period_ms = parse_value(ENV_PERIOD_MS, &period)?;
        }
        if let Some(delay) = lookup(ENV_INITIAL_DELAY_MS) {
            config.initial_delay_ms = Some(parse_value(ENV_INITIAL_DELAY_MS, &delay)?);
        }
        if let Some(timeout) = lookup(ENV_REQUEST_TIMEOUT_MS) {
            config.request_timeout_ms = parse_value(ENV_REQUEST_TIMEOUT_MS, &timeout)?;
        }

        Ok(config)
    }

    /// The validated admission window.
    pub fn window(&self) -> Result<RateWindow, ConfigError> {
        let limit = NonZeroUsize::new(self.limit).ok_or(ConfigError::ZeroLimit)?;
        let window = RateWindow::new(limit, Duration::from_millis(self.period_ms))?;
        Ok(match self.initial_delay_ms {
            Some(delay) => window.with_initial_delay(Duration::from_millis(delay))?,
            None => window,
        })
    }

    /// The validated endpoint; only absolute `http` and `https` URIs are accepted.
    pub fn endpoint_uri(&self) -> Result<Uri, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            reason: reason.to_string(),
        };

        let uri: Uri = self
            .endpoint
            .parse()
            .map_err(|err: http::uri::InvalidUri| invalid(&err.to_string()))?;
        match uri.scheme_str() {
            Some("http") | Some("https") => {}
            _ => return Err(invalid("scheme must be http or https")),
        }
        if uri.authority().is_none() {
            return Err(invalid("missing host"));
        }
        Ok(uri)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn parse_value<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|err: T::Err| ConfigError::InvalidValue {
            key,
            reason: err.to_string(),
        })
}
