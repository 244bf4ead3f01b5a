//! Process configuration
//!
//! Everything is read from the environment once at start-up and then passed
//! around as an immutable [`AppConfig`].

use crate::error::ConfigError;
use std::time::Duration;
use tracing::Level;

/// Table name variable
pub const TABLE_NAME_VAR: &str = "DYNAMODB_TABLE_NAME";
pub const BACKEND_VAR: &str = "STORE_BACKEND";
pub const ENDPOINT_URL_VAR: &str = "DYNAMODB_ENDPOINT_URL";
pub const REGION_VAR: &str = "AWS_REGION";
pub const TIMEOUT_VAR: &str = "STORE_TIMEOUT_MS";
pub const PORT_VAR: &str = "PORT";
pub const LOG_LEVEL_VAR: &str = "LOG_LEVEL";
/// Set by the Lambda runtime inside a function sandbox
pub const LAMBDA_RUNTIME_VAR: &str = "AWS_LAMBDA_RUNTIME_API";

pub const DEFAULT_TIMEOUT_MS: u64 = 3000;
pub const DEFAULT_PORT: u16 = 8080;

/// Which record store backs the repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    DynamoDb {
        table_name: String,
        endpoint_url: Option<String>,
        region: Option<String>,
    },
    Memory,
}

/// How requests reach the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Lambda,
    Http { port: u16 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub backend: StoreBackend,
    pub store_timeout: Duration,
    pub mode: RunMode,
    pub log_level: Level,
}

impl AppConfig {
    /// Reads the configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, treating empty values as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let backend = match get(BACKEND_VAR).as_deref() {
            None | Some("dynamodb") => StoreBackend::DynamoDb {
                table_name: get(TABLE_NAME_VAR).ok_or(ConfigError::Missing(TABLE_NAME_VAR))?,
                endpoint_url: get(ENDPOINT_URL_VAR),
                region: get(REGION_VAR),
            },
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: BACKEND_VAR,
                    value: other.to_string(),
                })
            }
        };

        let store_timeout = match get(TIMEOUT_VAR) {
            Some(raw) => match raw.parse::<u64>() {
                Ok(ms) if ms > 0 => Duration::from_millis(ms),
                _ => {
                    return Err(ConfigError::Invalid {
                        name: TIMEOUT_VAR,
                        value: raw,
                    })
                }
            },
            None => Duration::from_millis(DEFAULT_TIMEOUT_MS),
        };

        let mode = if get(LAMBDA_RUNTIME_VAR).is_some() {
            RunMode::Lambda
        } else {
            let port = match get(PORT_VAR) {
                Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                    name: PORT_VAR,
                    value: raw,
                })?,
                None => DEFAULT_PORT,
            };
            RunMode::Http { port }
        };

        let log_level = match get(LOG_LEVEL_VAR) {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                name: LOG_LEVEL_VAR,
                value: raw,
            })?,
            None => Level::INFO,
        };

        Ok(Self {
            backend,
            store_timeout,
            mode,
            log_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let env: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| env.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[(TABLE_NAME_VAR, "users")]).unwrap();
        assert_eq!(
            config.backend,
            StoreBackend::DynamoDb {
                table_name: "users".to_string(),
                endpoint_url: None,
                region: None,
            }
        );
        assert_eq!(config.store_timeout, Duration::from_millis(DEFAULT_TIMEOUT_MS));
        assert_eq!(config.mode, RunMode::Http { port: DEFAULT_PORT });
        assert_eq!(config.log_level, Level::INFO);
    }

    #[test]
    fn test_table_name_required_for_dynamodb() {
        assert_eq!(config(&[]).unwrap_err(), ConfigError::Missing(TABLE_NAME_VAR));
        assert_eq!(
            config(&[(TABLE_NAME_VAR, "  ")]).unwrap_err(),
            ConfigError::Missing(TABLE_NAME_VAR)
        );
    }

    #[test]
    fn test_memory_backend_needs_no_table() {
        let config = config(&[(BACKEND_VAR, "memory")]).unwrap();
        assert_eq!(config.backend, StoreBackend::Memory);
    }

    #[test]
    fn test_lambda_mode_detected() {
        let config = config(&[
            (TABLE_NAME_VAR, "users"),
            (LAMBDA_RUNTIME_VAR, "127.0.0.1:9001"),
            (PORT_VAR, "not-a-port"),
        ])
        .unwrap();
        assert_eq!(config.mode, RunMode::Lambda);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            config(&[(TABLE_NAME_VAR, "t"), (TIMEOUT_VAR, "0")]),
            Err(ConfigError::Invalid { name: TIMEOUT_VAR, .. })
        ));
        assert!(matches!(
            config(&[(TABLE_NAME_VAR, "t"), (PORT_VAR, "70000")]),
            Err(ConfigError::Invalid { name: PORT_VAR, .. })
        ));
        assert!(matches!(
            config(&[(BACKEND_VAR, "redis")]),
            Err(ConfigError::Invalid { name: BACKEND_VAR, .. })
        ));
        assert!(matches!(
            config(&[(TABLE_NAME_VAR, "t"), (LOG_LEVEL_VAR, "loud")]),
            Err(ConfigError::Invalid { name: LOG_LEVEL_VAR, .. })
        ));
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            (TABLE_NAME_VAR, "users"),
            (ENDPOINT_URL_VAR, "http://localhost:8000"),
            (REGION_VAR, "sa-east-1"),
            (TIMEOUT_VAR, "250"),
            (PORT_VAR, "9000"),
            (LOG_LEVEL_VAR, "debug"),
        ])
        .unwrap();
        assert_eq!(
            config.backend,
            StoreBackend::DynamoDb {
                table_name: "users".to_string(),
                endpoint_url: Some("http://localhost:8000".to_string()),
                region: Some("sa-east-1".to_string()),
            }
        );
        assert_eq!(config.store_timeout, Duration::from_millis(250));
        assert_eq!(config.mode, RunMode::Http { port: 9000 });
        assert_eq!(config.log_level, Level::DEBUG);
    }
}
