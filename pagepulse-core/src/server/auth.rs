//! Authenticated-caller detection
//!
//! Authenticated users are never tracked. Who counts as authenticated is
//! decided by the host site; the ingest endpoint only asks an [`AuthProbe`].

use axum::http::HeaderMap;

use super::cookies::request_cookies;
use crate::config::AuthConfig;

pub trait AuthProbe: Send + Sync {
    fn is_authenticated(&self, headers: &HeaderMap) -> bool;
}

/// Treats any request carrying a login session cookie as authenticated.
#[derive(Debug, Clone)]
pub struct CookieAuthProbe {
    prefixes: Vec<String>,
}

impl CookieAuthProbe {
    pub fn new(prefixes: Vec<String>) -> Self {
        Self {
            prefixes: prefixes.into_iter().filter(|p| !p.is_empty()).collect(),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.session_cookie_prefixes.clone())
    }
}

impl AuthProbe for CookieAuthProbe {
    fn is_authenticated(&self, headers: &HeaderMap) -> bool {
        request_cookies(headers)
            .keys()
            .any(|name| self.prefixes.iter().any(|p| name.starts_with(p.as_str())))
    }
}
