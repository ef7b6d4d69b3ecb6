//! Store connection settings, read once at process start.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::ConfigError;

pub const URL_KEY: &str = "STORE_URL";
pub const API_KEY_KEY: &str = "STORE_API_KEY";
pub const TIMEOUT_KEY: &str = "STORE_TIMEOUT_SECS";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything needed to reach the hosted store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Project endpoint, e.g. `https://abc.example.co`.
    pub url: Url,
    /// Access credential sent as `apikey` and bearer token.
    pub api_key: SecretString,
    /// Per-request timeout applied by the HTTP client.
    pub timeout: Duration,
}

impl StoreConfig {
    /// Read the configuration from the process environment.
    ///
    /// # Errors
    /// - [`ConfigError::Missing`] if `STORE_URL` or `STORE_API_KEY` is unset or blank.
    /// - [`ConfigError::Invalid`] if a value does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing { key })
        };

        let raw_url = required(URL_KEY)?;
        let url = Url::parse(&raw_url).map_err(|e| ConfigError::Invalid {
            key: URL_KEY,
            message: e.to_string(),
        })?;
        if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                key: URL_KEY,
                message: format!("'{raw_url}' is not an absolute http(s) URL"),
            });
        }

        let api_key = SecretString::from(required(API_KEY_KEY)?);

        let timeout = match lookup(TIMEOUT_KEY).map(|v| v.trim().to_owned()) {
            None => DEFAULT_TIMEOUT,
            Some(v) if v.is_empty() => DEFAULT_TIMEOUT,
            Some(v) => {
                let secs: u64 = v.parse().map_err(|_| ConfigError::Invalid {
                    key: TIMEOUT_KEY,
                    message: format!("'{v}' is not a whole number of seconds"),
                })?;
                if secs == 0 {
                    return Err(ConfigError::Invalid {
                        key: TIMEOUT_KEY,
                        message: "timeout must be at least one second".to_owned(),
                    });
                }
                Duration::from_secs(secs)
            }
        };

        Ok(Self { url, api_key, timeout })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn reads_required_values_and_default_timeout() {
        let cfg = StoreConfig::from_lookup(lookup(&[
            (URL_KEY, "https://project.example.co"),
            (API_KEY_KEY, "anon-key"),
        ]))
        .expect("valid config");

        assert_eq!(cfg.url.as_str(), "https://project.example.co/");
        assert_eq!(cfg.api_key.expose_secret(), "anon-key");
        assert_eq!(cfg.timeout, Duration::from_secs(30));
    }

    #[test]
    fn missing_url_is_fatal() {
        let err = StoreConfig::from_lookup(lookup(&[(API_KEY_KEY, "anon-key")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { key: URL_KEY }));
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let err = StoreConfig::from_lookup(lookup(&[
            (URL_KEY, "https://project.example.co"),
            (API_KEY_KEY, "   "),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing { key: API_KEY_KEY }));
    }

    #[test]
    fn malformed_values_are_rejected() {
        let err = StoreConfig::from_lookup(lookup(&[
            (URL_KEY, "not a url"),
            (API_KEY_KEY, "anon-key"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: URL_KEY, .. }));

        let err = StoreConfig::from_lookup(lookup(&[
            (URL_KEY, "https://project.example.co"),
            (API_KEY_KEY, "anon-key"),
            (TIMEOUT_KEY, "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: TIMEOUT_KEY, .. }));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = StoreConfig::from_lookup(lookup(&[
            (URL_KEY, "https://project.example.co"),
            (API_KEY_KEY, "anon-key"),
            (TIMEOUT_KEY, "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: TIMEOUT_KEY, .. }));

        let cfg = StoreConfig::from_lookup(lookup(&[
            (URL_KEY, "https://project.example.co"),
            (API_KEY_KEY, "anon-key"),
            (TIMEOUT_KEY, " 5 "),
        ]))
        .expect("valid config");
        assert_eq!(cfg.timeout, Duration::from_secs(5));
    }
}
