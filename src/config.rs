use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use tracing::{info, warn};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    pub store_path: PathBuf,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid {key} value {value:?}: {reason}")]
    Invalid { key: &'static str, value: String, reason: String },
}

impl Config {
    /// Reads `WFF_BIND`, `WFF_PORT` and `WFF_STORE_PATH`, falling back to defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
        where F: Fn(&str) -> Option<String> {
        Ok(Self {
            bind: try_load(&lookup, "WFF_BIND", "0.0.0.0")?,
            port: try_load(&lookup, "WFF_PORT", "8080")?,
            store_path: try_load(&lookup, "WFF_STORE_PATH", "store")?,
        })
    }
}

fn try_load<T, F>(lookup: &F, key: &'static str, default: &str) -> Result<T, ConfigError>
    where T: FromStr, T::Err: Display, F: Fn(&str) -> Option<String> {
    let value = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    value.parse().map_err(|e: T::Err| {
        warn!("Invalid {key} value: {e}");
        ConfigError::Invalid { key, value: value.clone(), reason: e.to_string() }
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config, Config { bind: "0.0.0.0".to_string(), port: 8080, store_path: PathBuf::from("store") });
    }

    #[test]
    fn reads_overrides() {
        let vars = HashMap::from([("WFF_PORT", "9000"), ("WFF_STORE_PATH", "/var/lib/wff")]);
        let config = Config::from_lookup(|key| vars.get(key).map(|x| x.to_string())).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.store_path, PathBuf::from("/var/lib/wff"));
    }

    #[test]
    fn rejects_bad_port() {
        let result = Config::from_lookup(|key| (key == "WFF_PORT").then(|| "http".to_string()));
        assert!(matches!(result, Err(ConfigError::Invalid { key: "WFF_PORT", .. })));
    }
}
