//! Configuration loading and representation.
//!
//! Values come from environment-style `KEY=value` pairs. Loading goes through
//! a lookup function so tests can feed a map instead of the process env.

use std::str::FromStr;
use std::time::Duration;

use crate::pacing::DelayPolicy;
use crate::payload::DEFAULT_COUNTRY_CODE;
use crate::retry::RetryPolicy;

pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{var}: cannot parse {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    pub fn invalid(var: &'static str, value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            var,
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// Read a variable, treating blank values as unset.
pub fn lookup_string(lookup: &dyn Fn(&str) -> Option<String>, var: &str) -> Option<String> {
    lookup(var)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a variable or fall back to `default` when unset.
pub fn lookup_parsed<T>(
    lookup: &dyn Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup_string(lookup, var) {
        Some(raw) => raw
            .parse()
            .map_err(|e: T::Err| ConfigError::invalid(var, raw, e.to_string())),
        None => Ok(default),
    }
}

/// Pacing and retry tunables of the bulk sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendSettings {
    pub batch_size: usize,
    pub delays: DelayPolicy,
    pub retry: RetryPolicy,
}

impl Default for SendSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            delays: DelayPolicy::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl SendSettings {
    /// No pacing at all; used by tests and local dry runs.
    pub fn immediate() -> Self {
        Self {
            delays: DelayPolicy::none(),
            ..Self::default()
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&|k| std::env::var(k).ok())
    }

    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let batch_size: usize = lookup_parsed(lookup, "SEND_BATCH_SIZE", defaults.batch_size)?;
        if batch_size == 0 {
            return Err(ConfigError::invalid("SEND_BATCH_SIZE", "0", "must be at least 1"));
        }

        let min_ms: u64 = lookup_parsed(
            lookup,
            "SEND_MIN_DELAY_MS",
            defaults.delays.min_message_delay.as_millis() as u64,
        )?;
        let max_ms: u64 = lookup_parsed(
            lookup,
            "SEND_MAX_DELAY_MS",
            defaults.delays.max_message_delay.as_millis() as u64,
        )?;
        if max_ms < min_ms {
            return Err(ConfigError::invalid(
                "SEND_MAX_DELAY_MS",
                max_ms.to_string(),
                format!("must not be below SEND_MIN_DELAY_MS ({min_ms})"),
            ));
        }
        let batch_ms: u64 = lookup_parsed(
            lookup,
            "SEND_BATCH_DELAY_MS",
            defaults.delays.batch_delay.as_millis() as u64,
        )?;
        let max_attempts: u32 =
            lookup_parsed(lookup, "SEND_MAX_RETRIES", defaults.retry.max_attempts)?;

        Ok(Self {
            batch_size,
            delays: DelayPolicy {
                min_message_delay: Duration::from_millis(min_ms),
                max_message_delay: Duration::from_millis(max_ms),
                batch_delay: Duration::from_millis(batch_ms),
            },
            retry: defaults.retry.with_max_attempts(max_attempts),
        })
    }
}

/// Where and how to reach the messaging provider.
///
/// Credentials are optional at load time; a service without them still
/// starts and reports the missing configuration per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    pub endpoint: Option<String>,
    pub access_token: Option<String>,
    pub country_code: String,
    pub request_timeout: Duration,
    pub business_base_url: Option<String>,
    pub business_account_id: Option<String>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            access_token: None,
            country_code: DEFAULT_COUNTRY_CODE.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            business_base_url: None,
            business_account_id: None,
        }
    }
}

impl ProviderSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&|k| std::env::var(k).ok())
    }

    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let country_code = lookup_string(lookup, "WHATSAPP_COUNTRY_CODE")
            .unwrap_or_else(|| DEFAULT_COUNTRY_CODE.to_string());
        if !country_code.chars().all(|c| c.is_ascii_digit()) {
            return Err(ConfigError::invalid(
                "WHATSAPP_COUNTRY_CODE",
                country_code,
                "must contain digits only",
            ));
        }

        Ok(Self {
            endpoint: lookup_string(lookup, "WHATSAPP_END_POINT"),
            access_token: lookup_string(lookup, "WHATSAPP_ACCESS_TOKEN"),
            country_code,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            business_base_url: lookup_string(lookup, "WHATSAPP_BUSINESS_ACCOUNT_BASE_URL"),
            business_account_id: lookup_string(lookup, "WHATSAPP_BUSINESS_ACCOUNT_ID"),
        })
    }

    /// Endpoint and token, only when both are present.
    pub fn messages_endpoint(&self) -> Option<(&str, &str)> {
        Some((self.endpoint.as_deref()?, self.access_token.as_deref()?))
    }

    pub fn templates_url(&self) -> Option<String> {
        let base = self.business_base_url.as_deref()?.trim_end_matches('/');
        let account = self.business_account_id.as_deref()?;
        Some(format!("{base}/{account}/message_templates"))
    }
}
