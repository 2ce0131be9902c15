//! Server configuration module.
//!
//! Parses configuration from environment variables for the RSVP server.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `RSVP_ADMIN_TOKEN` | Yes | - | Shared secret resolving to the admin role |
//! | `RSVP_USER_TOKEN` | Yes | - | Shared secret resolving to the user role |
//! | `RSVP_STORE_URL` | No | - | Base URL of the key-value store service |
//! | `RSVP_STORE_TOKEN` | No | - | Bearer token sent to the store service |
//! | `PORT` | No | 8080 | HTTP server port |
//!
//! When `RSVP_STORE_URL` is absent the server falls back to a volatile
//! in-memory store and logs a warning; data does not survive a restart.

use std::env;

use thiserror::Error;

/// Default HTTP server port.
const DEFAULT_PORT: u16 = 8080;

/// Errors that can occur when parsing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Environment variable has invalid format.
    #[error("invalid format for {var}: {message}")]
    InvalidFormat { var: String, message: String },

    /// Port number is invalid.
    #[error("invalid port number: {0}")]
    InvalidPort(#[from] std::num::ParseIntError),

    /// Configuration validation failed.
    #[error("configuration validation failed: {0}")]
    ValidationError(String),
}

/// Server configuration parsed from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Shared secret resolving to the admin role.
    pub admin_token: String,

    /// Shared secret resolving to the user role.
    pub user_token: String,

    /// Base URL of the key-value store service. `None` selects the volatile
    /// in-memory fallback.
    pub store_url: Option<String>,

    /// Bearer token for authenticating against the store service.
    pub store_token: Option<String>,

    /// HTTP server port.
    pub port: u16,
}

impl Config {
    /// Parse configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - `RSVP_ADMIN_TOKEN` or `RSVP_USER_TOKEN` is missing or empty
    /// - The two tokens are identical (the user role would be unreachable,
    ///   since admin is resolved first)
    /// - `PORT` is not a valid u16
    pub fn from_env() -> Result<Self, ConfigError> {
        let admin_token = required_env("RSVP_ADMIN_TOKEN")?;
        let user_token = required_env("RSVP_USER_TOKEN")?;
        let store_url = env::var("RSVP_STORE_URL").ok().filter(|s| !s.is_empty());
        let store_token = env::var("RSVP_STORE_TOKEN").ok().filter(|s| !s.is_empty());
        let port = parse_port()?;

        let config = Self {
            admin_token,
            user_token,
            store_url,
            store_token,
            port,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.admin_token == self.user_token {
            return Err(ConfigError::ValidationError(
                "RSVP_ADMIN_TOKEN and RSVP_USER_TOKEN must differ".to_string(),
            ));
        }

        Ok(())
    }
}

/// Reads a required environment variable, rejecting empty values.
fn required_env(name: &str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::MissingEnvVar(name.to_string())),
    }
}

/// Parse the PORT environment variable.
///
/// Returns the default port if not set.
fn parse_port() -> Result<u16, ConfigError> {
    match env::var("PORT") {
        Ok(port_str) => Ok(port_str.parse()?),
        Err(env::VarError::NotPresent) => Ok(DEFAULT_PORT),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::InvalidFormat {
            var: "PORT".to_string(),
            message: "contains invalid unicode".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    /// Helper to temporarily set environment variables for testing.
    struct EnvGuard {
        vars: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn new() -> Self {
            Self { vars: Vec::new() }
        }

        fn set(&mut self, key: &str, value: &str) {
            let old_value = env::var(key).ok();
            self.vars.push((key.to_string(), old_value));
            env::set_var(key, value);
        }

        fn remove(&mut self, key: &str) {
            let old_value = env::var(key).ok();
            self.vars.push((key.to_string(), old_value));
            env::remove_var(key);
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in &self.vars {
                match value {
                    Some(v) => env::set_var(key, v),
                    None => env::remove_var(key),
                }
            }
        }
    }

    fn guard_with_tokens() -> EnvGuard {
        let mut guard = EnvGuard::new();
        guard.set("RSVP_ADMIN_TOKEN", "admin-secret");
        guard.set("RSVP_USER_TOKEN", "user-secret");
        guard.remove("RSVP_STORE_URL");
        guard.remove("RSVP_STORE_TOKEN");
        guard.remove("PORT");
        guard
    }

    #[test]
    #[serial]
    fn config_parses_minimal_environment() {
        let _guard = guard_with_tokens();

        let config = Config::from_env().expect("should parse config");
        assert_eq!(config.admin_token, "admin-secret");
        assert_eq!(config.user_token, "user-secret");
        assert!(config.store_url.is_none());
        assert!(config.store_token.is_none());
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    #[serial]
    fn config_parses_full_environment() {
        let mut guard = guard_with_tokens();
        guard.set("RSVP_STORE_URL", "http://kv.internal:9000");
        guard.set("RSVP_STORE_TOKEN", "store-secret");
        guard.set("PORT", "9090");

        let config = Config::from_env().expect("should parse config");
        assert_eq!(config.store_url, Some("http://kv.internal:9000".to_string()));
        assert_eq!(config.store_token, Some("store-secret".to_string()));
        assert_eq!(config.port, 9090);
    }

    #[test]
    #[serial]
    fn config_rejects_missing_admin_token() {
        let mut guard = guard_with_tokens();
        guard.remove("RSVP_ADMIN_TOKEN");

        let result = Config::from_env();
        assert!(
            matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "RSVP_ADMIN_TOKEN")
        );
    }

    #[test]
    #[serial]
    fn config_rejects_missing_user_token() {
        let mut guard = guard_with_tokens();
        guard.remove("RSVP_USER_TOKEN");

        let result = Config::from_env();
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "RSVP_USER_TOKEN"));
    }

    #[test]
    #[serial]
    fn config_rejects_empty_token() {
        let mut guard = guard_with_tokens();
        guard.set("RSVP_ADMIN_TOKEN", "");

        let result = Config::from_env();
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(_))));
    }

    #[test]
    #[serial]
    fn config_rejects_identical_tokens() {
        let mut guard = guard_with_tokens();
        guard.set("RSVP_ADMIN_TOKEN", "same-secret");
        guard.set("RSVP_USER_TOKEN", "same-secret");

        let result = Config::from_env();
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    #[serial]
    fn config_treats_empty_store_url_as_absent() {
        let mut guard = guard_with_tokens();
        guard.set("RSVP_STORE_URL", "");

        let config = Config::from_env().expect("should parse config");
        assert!(config.store_url.is_none());
    }

    #[test]
    #[serial]
    fn parse_port_default() {
        let mut guard = EnvGuard::new();
        guard.remove("PORT");

        let port = parse_port().expect("should parse port");
        assert_eq!(port, DEFAULT_PORT);
    }

    #[test]
    #[serial]
    fn parse_port_custom() {
        let mut guard = EnvGuard::new();
        guard.set("PORT", "3000");

        let port = parse_port().expect("should parse port");
        assert_eq!(port, 3000);
    }

    #[test]
    #[serial]
    fn parse_port_invalid() {
        let mut guard = EnvGuard::new();
        guard.set("PORT", "not-a-number");

        let result = parse_port();
        assert!(matches!(result, Err(ConfigError::InvalidPort(_))));
    }

    #[test]
    #[serial]
    fn parse_port_out_of_range() {
        let mut guard = EnvGuard::new();
        guard.set("PORT", "99999");

        let result = parse_port();
        assert!(result.is_err());
    }
}
