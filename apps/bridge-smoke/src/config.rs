//! Environment-backed configuration for `bridge-smoke`.

use std::{env, error::Error, fmt, time::Duration};

use bridge_core::{BridgeInitConfig, DEFAULT_API_BASE, DEFAULT_STREAM_BASE};

const DEFAULT_RUN_SECONDS: u64 = 60;

/// Runtime configuration used by the smoke binary.
#[derive(Debug, Clone, PartialEq)]
pub struct SmokeConfig {
    /// Pushbullet access token.
    pub access_token: String,
    /// Endpoints and timeouts forwarded to `spawn_runtime`.
    pub init_config: BridgeInitConfig,
    /// Post the doorbell push once the bridge is initialized.
    pub ring_doorbell: bool,
    /// How long to print events before exiting.
    pub run_for: Duration,
}

impl SmokeConfig {
    /// Parse configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(mut lookup: F) -> Result<Self, ConfigError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let access_token = optional_trimmed_env("PUSHBELL_ACCESS_TOKEN", &mut lookup).ok_or(
            ConfigError::MissingValue {
                key: "PUSHBELL_ACCESS_TOKEN",
            },
        )?;

        let api_base = optional_trimmed_env("PUSHBELL_API_BASE", &mut lookup)
            .unwrap_or_else(|| DEFAULT_API_BASE.to_owned());
        let stream_base = optional_trimmed_env("PUSHBELL_STREAM_BASE", &mut lookup)
            .unwrap_or_else(|| DEFAULT_STREAM_BASE.to_owned());
        require_scheme("PUSHBELL_API_BASE", &api_base, &["https://", "http://"])?;
        require_scheme("PUSHBELL_STREAM_BASE", &stream_base, &["wss://", "ws://"])?;

        let request_timeout_ms = parse_optional_u64("PUSHBELL_REQUEST_TIMEOUT_MS", &mut lookup)?;
        if request_timeout_ms == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "PUSHBELL_REQUEST_TIMEOUT_MS",
                value: "0".to_owned(),
                reason: "must be at least 1".to_owned(),
            });
        }

        let ring_doorbell = parse_optional_bool("PUSHBELL_SMOKE_DOORBELL", &mut lookup)?;
        let run_seconds = parse_optional_u64("PUSHBELL_SMOKE_SECONDS", &mut lookup)?
            .unwrap_or(DEFAULT_RUN_SECONDS);

        Ok(Self {
            access_token,
            init_config: BridgeInitConfig {
                api_base,
                stream_base,
                request_timeout_ms,
            },
            ring_doorbell,
            run_for: Duration::from_secs(run_seconds),
        })
    }
}

/// Errors produced while parsing runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required environment variable is unset or blank.
    MissingValue { key: &'static str },
    /// An environment variable could not be parsed.
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingValue { key } => write!(f, "{key} must be set"),
            Self::InvalidValue { key, value, reason } => {
                write!(f, "invalid {key}='{value}': {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

fn optional_trimmed_env<F>(key: &'static str, lookup: &mut F) -> Option<String>
where
    F: FnMut(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_optional_u64<F>(key: &'static str, lookup: &mut F) -> Result<Option<u64>, ConfigError>
where
    F: FnMut(&str) -> Option<String>,
{
    let Some(value) = optional_trimmed_env(key, lookup) else {
        return Ok(None);
    };
    value
        .parse::<u64>()
        .map(Some)
        .map_err(|err| ConfigError::InvalidValue {
            key,
            value,
            reason: err.to_string(),
        })
}

fn parse_optional_bool<F>(key: &'static str, lookup: &mut F) -> Result<bool, ConfigError>
where
    F: FnMut(&str) -> Option<String>,
{
    let Some(value) = optional_trimmed_env(key, lookup) else {
        return Ok(false);
    };
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value,
            reason: "expected true or false".to_owned(),
        }),
    }
}

fn require_scheme(key: &'static str, value: &str, schemes: &[&str]) -> Result<(), ConfigError> {
    if schemes.iter().any(|scheme| value.starts_with(scheme)) {
        return Ok(());
    }
    Err(ConfigError::InvalidValue {
        key,
        value: value.to_owned(),
        reason: format!("must start with one of {}", schemes.join(", ")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from_pairs(pairs: &[(&str, &str)]) -> Result<SmokeConfig, ConfigError> {
        let map = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect::<HashMap<_, _>>();
        SmokeConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn parses_token_and_defaults() {
        let cfg = config_from_pairs(&[("PUSHBELL_ACCESS_TOKEN", " o.token ")])
            .expect("config should parse");

        assert_eq!(cfg.access_token, "o.token");
        assert_eq!(cfg.init_config, BridgeInitConfig::default());
        assert!(!cfg.ring_doorbell);
        assert_eq!(cfg.run_for, Duration::from_secs(DEFAULT_RUN_SECONDS));
    }

    #[test]
    fn access_token_is_required() {
        let err = config_from_pairs(&[("PUSHBELL_ACCESS_TOKEN", "  ")])
            .expect_err("blank token must fail");
        assert_eq!(
            err,
            ConfigError::MissingValue {
                key: "PUSHBELL_ACCESS_TOKEN"
            }
        );
        assert_eq!(err.to_string(), "PUSHBELL_ACCESS_TOKEN must be set");
    }

    #[test]
    fn parses_endpoint_overrides_and_timeout() {
        let cfg = config_from_pairs(&[
            ("PUSHBELL_ACCESS_TOKEN", "o.token"),
            ("PUSHBELL_API_BASE", "http://127.0.0.1:8080/v2"),
            ("PUSHBELL_STREAM_BASE", "ws://127.0.0.1:8081/websocket"),
            ("PUSHBELL_REQUEST_TIMEOUT_MS", "2500"),
            ("PUSHBELL_SMOKE_DOORBELL", "yes"),
            ("PUSHBELL_SMOKE_SECONDS", "5"),
        ])
        .expect("config should parse");

        assert_eq!(cfg.init_config.api_base, "http://127.0.0.1:8080/v2");
        assert_eq!(cfg.init_config.stream_base, "ws://127.0.0.1:8081/websocket");
        assert_eq!(cfg.init_config.request_timeout_ms, Some(2_500));
        assert!(cfg.ring_doorbell);
        assert_eq!(cfg.run_for, Duration::from_secs(5));
    }

    #[test]
    fn rejects_invalid_timeout() {
        let err = config_from_pairs(&[
            ("PUSHBELL_ACCESS_TOKEN", "o.token"),
            ("PUSHBELL_REQUEST_TIMEOUT_MS", "soon"),
        ])
        .expect_err("invalid timeout must fail");
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "PUSHBELL_REQUEST_TIMEOUT_MS",
                ..
            }
        ));

        let err = config_from_pairs(&[
            ("PUSHBELL_ACCESS_TOKEN", "o.token"),
            ("PUSHBELL_REQUEST_TIMEOUT_MS", "0"),
        ])
        .expect_err("zero timeout must fail");
        assert_eq!(
            err.to_string(),
            "invalid PUSHBELL_REQUEST_TIMEOUT_MS='0': must be at least 1"
        );
    }

    #[test]
    fn rejects_stream_base_with_http_scheme() {
        let err = config_from_pairs(&[
            ("PUSHBELL_ACCESS_TOKEN", "o.token"),
            ("PUSHBELL_STREAM_BASE", "https://stream.pushbullet.com/websocket"),
        ])
        .expect_err("http stream base must fail");
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "PUSHBELL_STREAM_BASE",
                ..
            }
        ));
    }

    #[test]
    fn rejects_unrecognized_doorbell_flag() {
        let err = config_from_pairs(&[
            ("PUSHBELL_ACCESS_TOKEN", "o.token"),
            ("PUSHBELL_SMOKE_DOORBELL", "maybe"),
        ])
        .expect_err("unknown flag must fail");
        assert!(err.to_string().contains("expected true or false"));
    }
}
