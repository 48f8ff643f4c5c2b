//! Configuration module
//!
//! Session configuration for the Rederly client. The session object is built
//! once at session start (login), injected into the API client and services,
//! and dropped at logout. Nothing in this workspace reads ambient global
//! session state.

use std::env;

use anyhow::{Context, Result};

const DEFAULT_API_URL: &str = "http://localhost:3001";

/// Authentication strategy for the API.
#[derive(Clone, Debug)]
pub enum Auth {
    /// `Authorization: Bearer {token}`
    Bearer(String),
    /// `Cookie: sessionToken={token}`
    Cookie(String),
}

/// Role of the logged-in user. Drives which scopes a regrade check may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRole {
    Student,
    Professor,
    Admin,
}

impl UserRole {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "student" => Some(UserRole::Student),
            "professor" => Some(UserRole::Professor),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }
}

/// Per-session configuration injected into the client and services.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub base_url: String,
    pub auth: Auth,
    pub user_id: Option<i64>,
    pub role: Option<UserRole>,
}

impl SessionConfig {
    pub fn new(base_url: impl Into<String>, auth: Auth) -> Self {
        Self {
            base_url: base_url.into(),
            auth,
            user_id: None,
            role: None,
        }
    }

    pub fn with_user(mut self, user_id: i64, role: UserRole) -> Self {
        self.user_id = Some(user_id);
        self.role = Some(role);
        self
    }

    /// Create a session from environment: REDERLY_API_URL, REDERLY_SESSION_TOKEN,
    /// and optionally REDERLY_USER_ID / REDERLY_USER_ROLE. Uses cookie auth,
    /// matching the browser client.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let base_url = env::var("REDERLY_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let token = env::var("REDERLY_SESSION_TOKEN")
            .context("Missing session token. Set REDERLY_SESSION_TOKEN")?;

        let user_id = env::var("REDERLY_USER_ID")
            .ok()
            .and_then(|v| v.parse::<i64>().ok());
        let role = env::var("REDERLY_USER_ROLE")
            .ok()
            .and_then(|v| UserRole::parse(&v));

        Ok(Self {
            base_url,
            auth: Auth::Cookie(token),
            user_id,
            role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parsing_is_case_insensitive() {
        assert_eq!(UserRole::parse("Professor"), Some(UserRole::Professor));
        assert_eq!(UserRole::parse("STUDENT"), Some(UserRole::Student));
        assert_eq!(UserRole::parse("observer"), None);
    }

    #[test]
    fn with_user_sets_identity() {
        let config = SessionConfig::new("http://localhost:3001", Auth::Bearer("t".to_string()))
            .with_user(7, UserRole::Student);
        assert_eq!(config.user_id, Some(7));
        assert_eq!(config.role, Some(UserRole::Student));
    }
}
