//! Provider configuration.
//!
//! The host passes the provider block as JSON. Any field left out falls back
//! to an environment variable:
//!
//! | Field                  | Environment variable        |
//! |------------------------|-----------------------------|
//! | `host`                 | `AAP_HOST`                  |
//! | `username`             | `AAP_USERNAME`              |
//! | `password`             | `AAP_PASSWORD`              |
//! | `insecure_skip_verify` | `AAP_INSECURE_SKIP_VERIFY`  |
//! | `timeout`              | `AAP_TIMEOUT`               |

use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::client::AapClient;
use crate::diagnostics::{has_errors, Diagnostic};
use crate::error::ProviderError;

/// Request timeout in seconds when none is configured.
pub const DEFAULT_TIMEOUT_SECS: i64 = 5;

/// Provider block settings.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    /// Base URL of the AAP server.
    pub host: Option<String>,
    /// Basic auth username.
    pub username: Option<String>,
    /// Basic auth password.
    pub password: Option<String>,
    /// Skip TLS certificate verification.
    pub insecure_skip_verify: Option<bool>,
    /// Request timeout in seconds.
    pub timeout: Option<i64>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("insecure_skip_verify", &self.insecure_skip_verify)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ProviderConfig {
    /// Parse the provider block. `null` yields an empty config.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ProviderError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Fill unset fields from the process environment.
    pub fn with_env_fallbacks(self) -> Self {
        self.with_fallbacks(|name| std::env::var(name).ok())
    }

    /// Fill unset fields from `lookup`, keyed by environment variable name.
    ///
    /// Values that do not parse are ignored with a warning.
    pub fn with_fallbacks<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if self.host.is_none() {
            self.host = lookup("AAP_HOST");
        }
        if self.username.is_none() {
            self.username = lookup("AAP_USERNAME");
        }
        if self.password.is_none() {
            self.password = lookup("AAP_PASSWORD");
        }
        if self.insecure_skip_verify.is_none() {
            self.insecure_skip_verify = lookup("AAP_INSECURE_SKIP_VERIFY").and_then(|raw| {
                parse_bool(&raw).or_else(|| {
                    warn!(value = %raw, "ignoring AAP_INSECURE_SKIP_VERIFY, expected a boolean");
                    None
                })
            });
        }
        if self.timeout.is_none() {
            self.timeout = lookup("AAP_TIMEOUT").and_then(|raw| {
                raw.trim().parse().ok().or_else(|| {
                    warn!(value = %raw, "ignoring AAP_TIMEOUT, expected an integer");
                    None
                })
            });
        }
        self
    }

    /// Check the settings, returning error and warning diagnostics.
    pub fn validate(&self) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        match self.host.as_deref().map(str::trim) {
            None | Some("") => diagnostics.push(
                Diagnostic::error("Missing AAP host")
                    .with_detail(
                        "Set the host attribute in the provider block or the AAP_HOST \
                         environment variable.",
                    )
                    .with_attribute("host"),
            ),
            Some(_) => {},
        }

        if let Some(timeout) = self.timeout {
            if timeout <= 0 {
                diagnostics.push(
                    Diagnostic::error("Invalid timeout")
                        .with_detail(format!(
                            "The timeout must be a positive number of seconds, got {}.",
                            timeout
                        ))
                        .with_attribute("timeout"),
                );
            }
        }

        match (&self.username, &self.password) {
            (Some(_), None) => diagnostics.push(
                Diagnostic::warning("Password not set")
                    .with_detail("A username was given without a password; requests will be sent without credentials.")
                    .with_attribute("password"),
            ),
            (None, Some(_)) => diagnostics.push(
                Diagnostic::warning("Username not set")
                    .with_detail("A password was given without a username; requests will be sent without credentials.")
                    .with_attribute("username"),
            ),
            _ => {},
        }

        diagnostics
    }

    /// The effective request timeout.
    pub fn timeout(&self) -> Duration {
        let secs = self.timeout.filter(|t| *t > 0).unwrap_or(DEFAULT_TIMEOUT_SECS);
        Duration::from_secs(secs.unsigned_abs())
    }

    /// Build an API client from validated settings.
    pub fn build_client(&self) -> Result<AapClient, ProviderError> {
        if has_errors(&self.validate()) {
            return Err(ProviderError::Configuration(
                "provider configuration is invalid".to_string(),
            ));
        }
        let host = self.host.as_deref().unwrap_or_default();
        AapClient::new(
            host,
            self.username.clone(),
            self.password.clone(),
            self.insecure_skip_verify.unwrap_or(false),
            self.timeout(),
        )
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "t" | "true" => Some(true),
        "0" | "f" | "false" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticSeverity;
    use serde_json::json;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_from_value() {
        let config = ProviderConfig::from_value(json!({
            "host": "https://aap.example.com",
            "username": "admin",
            "password": "secret",
            "insecure_skip_verify": true,
            "timeout": 30
        }))
        .unwrap();
        assert_eq!(config.host.as_deref(), Some("https://aap.example.com"));
        assert_eq!(config.insecure_skip_verify, Some(true));
        assert_eq!(config.timeout(), Duration::from_secs(30));

        assert_eq!(
            ProviderConfig::from_value(json!(null)).unwrap(),
            ProviderConfig::default()
        );
        assert!(ProviderConfig::from_value(json!({"hots": "typo"})).is_err());
    }

    #[test]
    fn test_env_fallbacks_fill_only_missing_fields() {
        let config = ProviderConfig {
            host: Some("https://configured".to_string()),
            ..Default::default()
        }
        .with_fallbacks(env(&[
            ("AAP_HOST", "https://from-env"),
            ("AAP_USERNAME", "env-user"),
            ("AAP_PASSWORD", "env-pass"),
            ("AAP_INSECURE_SKIP_VERIFY", "true"),
            ("AAP_TIMEOUT", "12"),
        ]));

        assert_eq!(config.host.as_deref(), Some("https://configured"));
        assert_eq!(config.username.as_deref(), Some("env-user"));
        assert_eq!(config.password.as_deref(), Some("env-pass"));
        assert_eq!(config.insecure_skip_verify, Some(true));
        assert_eq!(config.timeout, Some(12));
    }

    #[test]
    fn test_env_fallbacks_ignore_bad_values() {
        let config = ProviderConfig::default().with_fallbacks(env(&[
            ("AAP_HOST", ""),
            ("AAP_INSECURE_SKIP_VERIFY", "maybe"),
            ("AAP_TIMEOUT", "soon"),
        ]));
        assert_eq!(config, ProviderConfig::default());
    }

    #[test]
    fn test_validate() {
        let diagnostics = ProviderConfig::default().validate();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("host"));

        let diagnostics = ProviderConfig {
            host: Some("https://aap".to_string()),
            username: Some("admin".to_string()),
            timeout: Some(0),
            ..Default::default()
        }
        .validate();
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].severity, DiagnosticSeverity::Error);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("timeout"));
        assert_eq!(diagnostics[1].severity, DiagnosticSeverity::Warning);
        assert_eq!(diagnostics[1].attribute.as_deref(), Some("password"));
    }

    #[test]
    fn test_default_timeout() {
        assert_eq!(
            ProviderConfig::default().timeout(),
            Duration::from_secs(DEFAULT_TIMEOUT_SECS as u64)
        );
    }

    #[test]
    fn test_build_client() {
        let client = ProviderConfig {
            host: Some("https://aap.example.com".to_string()),
            ..Default::default()
        }
        .build_client()
        .unwrap();
        assert_eq!(client.host_url(), "https://aap.example.com/");

        assert!(matches!(
            ProviderConfig::default().build_client(),
            Err(ProviderError::Configuration(_))
        ));
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = ProviderConfig {
            password: Some("hunter2".to_string()),
            ..Default::default()
        };
        assert!(!format!("{:?}", config).contains("hunter2"));
    }
}
