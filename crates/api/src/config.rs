//! Process configuration, read once at startup.

use wabulk_infra::config::{ConfigError, ProviderSettings, SendSettings, lookup_parsed};
use wabulk_infra::jobs::DEFAULT_LEDGER_CAPACITY;

pub const DEFAULT_PORT: u16 = 3002;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub send: SendSettings,
    pub provider: ProviderSettings,
    pub ledger_capacity: usize,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            send: SendSettings::default(),
            provider: ProviderSettings::default(),
            ledger_capacity: DEFAULT_LEDGER_CAPACITY,
            port: DEFAULT_PORT,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&|k| std::env::var(k).ok())
    }

    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let ledger_capacity: usize =
            lookup_parsed(lookup, "JOB_LEDGER_CAPACITY", DEFAULT_LEDGER_CAPACITY)?;
        if ledger_capacity == 0 {
            return Err(ConfigError::invalid(
                "JOB_LEDGER_CAPACITY",
                "0",
                "must be at least 1",
            ));
        }

        Ok(Self {
            send: SendSettings::from_lookup(lookup)?,
            provider: ProviderSettings::from_lookup(lookup)?,
            ledger_capacity,
            port: lookup_parsed(lookup, "PORT", DEFAULT_PORT)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = AppConfig::from_lookup(&lookup_from(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.port, 3002);
        assert_eq!(config.ledger_capacity, 50);
    }

    #[test]
    fn reads_port_and_capacity() {
        let config = AppConfig::from_lookup(&lookup_from(&[
            ("PORT", "8080"),
            ("JOB_LEDGER_CAPACITY", "5"),
            ("SEND_BATCH_SIZE", "10"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.ledger_capacity, 5);
        assert_eq!(config.send.batch_size, 10);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(AppConfig::from_lookup(&lookup_from(&[("PORT", "http")])).is_err());
        assert!(AppConfig::from_lookup(&lookup_from(&[("JOB_LEDGER_CAPACITY", "0")])).is_err());
    }
}
