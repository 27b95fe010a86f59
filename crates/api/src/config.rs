use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderValue;
use congestion_core::thresholds::{
    ThresholdPolicy, Thresholds, DEFAULT_HEAVY_THRESHOLD, DEFAULT_MODERATE_THRESHOLD,
};
use congestion_detect::DEFAULT_DETECT_URL;

/// Default upload limit: 512 MiB.
const DEFAULT_MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

/// A configuration variable held a value that could not be used.
#[derive(Debug, thiserror::Error)]
#[error("{var} must be {expected}, got '{value}'")]
pub struct ConfigError {
    pub var: &'static str,
    pub expected: &'static str,
    pub value: String,
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for running next to a local
/// detection service.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `127.0.0.1`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for in-flight submissions (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Largest accepted request body, in bytes.
    pub max_upload_bytes: usize,
    pub detect: DetectConfig,
    pub form: FormConfig,
}

/// Where and how the detection collaborator is called.
#[derive(Debug, Clone)]
pub struct DetectConfig {
    pub url: String,
    /// `None` waits for the collaborator indefinitely.
    pub timeout_secs: Option<u64>,
}

impl DetectConfig {
    /// Build the HTTP client used for detection calls.
    pub fn build_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = self.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        builder.build()
    }
}

/// Initial form values and submission checks.
#[derive(Debug, Clone, Copy)]
pub struct FormConfig {
    pub default_thresholds: Thresholds,
    pub policy: ThresholdPolicy,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                            |
    /// |------------------------------|------------------------------------|
    /// | `HOST`                       | `127.0.0.1`                        |
    /// | `PORT`                       | `3000`                             |
    /// | `CORS_ORIGINS`               | `http://localhost:5173`            |
    /// | `REQUEST_TIMEOUT_SECS`       | `30`                               |
    /// | `SHUTDOWN_TIMEOUT_SECS`      | `30`                               |
    /// | `MAX_UPLOAD_BYTES`           | `536870912`                        |
    /// | `DETECT_URL`                 | `http://localhost:5000/api/detect` |
    /// | `DETECT_TIMEOUT_SECS`        | unset (no timeout)                 |
    /// | `STRICT_THRESHOLDS`          | `false`                            |
    /// | `DEFAULT_MODERATE_THRESHOLD` | `10`                               |
    /// | `DEFAULT_HEAVY_THRESHOLD`    | `15`                               |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".into());
        let port: u16 = parse_or(&lookup, "PORT", 3000, "a valid u16")?;

        let cors_origins: Vec<String> = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if let Some(bad) = cors_origins
            .iter()
            .find(|origin| origin.parse::<HeaderValue>().is_err())
        {
            return Err(ConfigError {
                var: "CORS_ORIGINS",
                expected: "a comma-separated list of origins",
                value: bad.clone(),
            });
        }

        let request_timeout_secs: u64 =
            parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 30, "a valid u64")?;
        let shutdown_timeout_secs: u64 =
            parse_or(&lookup, "SHUTDOWN_TIMEOUT_SECS", 30, "a valid u64")?;
        let max_upload_bytes: usize = parse_or(
            &lookup,
            "MAX_UPLOAD_BYTES",
            DEFAULT_MAX_UPLOAD_BYTES,
            "a byte count",
        )?;

        let detect = DetectConfig {
            url: lookup("DETECT_URL").unwrap_or_else(|| DEFAULT_DETECT_URL.into()),
            timeout_secs: parse_optional(&lookup, "DETECT_TIMEOUT_SECS", "a valid u64")?,
        };

        let policy = if parse_flag(&lookup, "STRICT_THRESHOLDS")? {
            ThresholdPolicy::Ordered
        } else {
            ThresholdPolicy::Unchecked
        };
        let default_thresholds = Thresholds::new(
            parse_or(
                &lookup,
                "DEFAULT_MODERATE_THRESHOLD",
                DEFAULT_MODERATE_THRESHOLD,
                "an integer",
            )?,
            parse_or(
                &lookup,
                "DEFAULT_HEAVY_THRESHOLD",
                DEFAULT_HEAVY_THRESHOLD,
                "an integer",
            )?,
        );

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            max_upload_bytes,
            detect,
            form: FormConfig {
                default_thresholds,
                policy,
            },
        })
    }
}

fn parse_optional<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    expected: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError {
                var,
                expected,
                value,
            }),
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
    expected: &'static str,
) -> Result<T, ConfigError> {
    Ok(parse_optional(lookup, var, expected)?.unwrap_or(default))
}

fn parse_flag(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<bool, ConfigError> {
    match lookup(var) {
        None => Ok(false),
        Some(value) => {
            let normalized = value.trim().to_ascii_lowercase();
            match normalized.as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" | "" => Ok(false),
                _ => Err(ConfigError {
                    var,
                    expected: "a boolean",
                    value,
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 3000);
        assert_eq!(config.cors_origins, vec!["http://localhost:5173"]);
        assert_eq!(config.detect.url, "http://localhost:5000/api/detect");
        assert_eq!(config.detect.timeout_secs, None);
        assert_eq!(config.max_upload_bytes, 512 * 1024 * 1024);
        assert_eq!(config.form.default_thresholds, Thresholds::new(10, 15));
        assert_eq!(config.form.policy, ThresholdPolicy::Unchecked);
    }

    #[test]
    fn reads_overrides() {
        let config = load(&[
            ("PORT", "8080"),
            ("CORS_ORIGINS", "http://a.test, http://b.test,"),
            ("DETECT_URL", "http://detector:5000/api/detect"),
            ("DETECT_TIMEOUT_SECS", "120"),
            ("STRICT_THRESHOLDS", "true"),
            ("DEFAULT_MODERATE_THRESHOLD", "4"),
            ("DEFAULT_HEAVY_THRESHOLD", "8"),
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.cors_origins, vec!["http://a.test", "http://b.test"]);
        assert_eq!(config.detect.url, "http://detector:5000/api/detect");
        assert_eq!(config.detect.timeout_secs, Some(120));
        assert_eq!(config.form.policy, ThresholdPolicy::Ordered);
        assert_eq!(config.form.default_thresholds, Thresholds::new(4, 8));
    }

    #[test]
    fn invalid_port_names_the_variable() {
        let err = load(&[("PORT", "eighty")]).unwrap_err();
        assert_eq!(err.var, "PORT");
        assert_eq!(err.to_string(), "PORT must be a valid u16, got 'eighty'");
    }

    #[test]
    fn invalid_cors_origin_is_rejected() {
        assert_matches!(
            load(&[("CORS_ORIGINS", "http://ok.test,bad\norigin")]),
            Err(ConfigError { var: "CORS_ORIGINS", value, .. }) if value == "bad\norigin"
        );
    }

    #[test]
    fn invalid_flag_is_rejected() {
        assert_matches!(
            load(&[("STRICT_THRESHOLDS", "maybe")]),
            Err(ConfigError { var: "STRICT_THRESHOLDS", expected: "a boolean", .. })
        );
    }
}
