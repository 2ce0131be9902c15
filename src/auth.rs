//! Bearer-token authentication.
//!
//! Callers present a shared secret in the `Authorization: Bearer <secret>`
//! header. Exactly two secrets are recognized, one per role; anything else
//! resolves to no role. Comparison is constant-time so the check leaks no
//! timing information about the configured secrets.
//!
//! The resolver is used two ways: the `/api/auth` endpoint reports the
//! resolved role directly, and every other endpoint rejects requests that
//! resolve to no role before touching the store.

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::config::Config;
use crate::types::Role;

/// Errors produced by the auth-check endpoint.
///
/// Both variants map to 401; they differ only in the message exposed to the
/// caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The Authorization header is missing or is not a bearer credential.
    #[error("Missing credentials")]
    MissingCredentials,

    /// A bearer credential was presented but matches neither secret.
    #[error("Invalid password")]
    InvalidCredentials,
}

/// Extracts the bearer credential from the request headers, if present and
/// well-formed.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Resolves the role for a request.
///
/// Returns `None` for a missing or malformed header and for any credential
/// that matches neither configured secret. Never fails; the caller decides
/// the HTTP status.
pub fn resolve_role(headers: &HeaderMap, config: &Config) -> Option<Role> {
    let token = bearer_token(headers)?;
    role_for_token(token, config)
}

/// Resolves the role for an already-extracted credential.
///
/// The admin secret is checked first; config validation guarantees the two
/// secrets are distinct.
pub fn role_for_token(token: &str, config: &Config) -> Option<Role> {
    if constant_time_eq(token, &config.admin_token) {
        Some(Role::Admin)
    } else if constant_time_eq(token, &config.user_token) {
        Some(Role::User)
    } else {
        None
    }
}

/// Compares two strings in constant time.
///
/// `subtle` short-circuits only on length, which is not considered secret
/// here.
fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn test_config() -> Config {
        Config {
            admin_token: "admin-secret".to_string(),
            user_token: "user-secret".to_string(),
            store_url: None,
            store_token: None,
            port: 8080,
        }
    }

    fn headers_with_auth(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn bearer_token_extracts_credential() {
        let headers = headers_with_auth("Bearer some-token");
        assert_eq!(bearer_token(&headers), Some("some-token"));
    }

    #[test]
    fn bearer_token_returns_none_without_header() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn bearer_token_returns_none_for_non_bearer_scheme() {
        let headers = headers_with_auth("Basic dXNlcjpwYXNz");
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn bearer_token_is_case_sensitive_on_scheme() {
        let headers = headers_with_auth("bearer some-token");
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn resolve_role_maps_admin_secret() {
        let headers = headers_with_auth("Bearer admin-secret");
        assert_eq!(resolve_role(&headers, &test_config()), Some(Role::Admin));
    }

    #[test]
    fn resolve_role_maps_user_secret() {
        let headers = headers_with_auth("Bearer user-secret");
        assert_eq!(resolve_role(&headers, &test_config()), Some(Role::User));
    }

    #[test]
    fn resolve_role_rejects_unknown_secret() {
        let headers = headers_with_auth("Bearer wrong-secret");
        assert_eq!(resolve_role(&headers, &test_config()), None);
    }

    #[test]
    fn resolve_role_rejects_missing_header() {
        assert_eq!(resolve_role(&HeaderMap::new(), &test_config()), None);
    }

    #[test]
    fn resolve_role_rejects_empty_credential() {
        let headers = headers_with_auth("Bearer ");
        assert_eq!(resolve_role(&headers, &test_config()), None);
    }

    #[test]
    fn role_for_token_rejects_secret_prefix() {
        assert_eq!(role_for_token("admin-secre", &test_config()), None);
        assert_eq!(role_for_token("admin-secret-x", &test_config()), None);
    }

    #[test]
    fn constant_time_eq_matches_standard_equality() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "abcd"));
        assert!(constant_time_eq("", ""));
    }

    #[test]
    fn auth_error_messages() {
        assert_eq!(
            AuthError::MissingCredentials.to_string(),
            "Missing credentials"
        );
        assert_eq!(
            AuthError::InvalidCredentials.to_string(),
            "Invalid password"
        );
    }
}
