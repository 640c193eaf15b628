//! Anonymous identity assignment
//!
//! The identity lives in the visitor's `user_id` / `user_id_type` cookies; the
//! server only runs a deterministic read/merge/write on each request:
//!
//! 1. A campaign parameter in the query string always wins: its sanitized value
//!    becomes the identifier, tagged `ad-campaign`, overwriting any cookie.
//! 2. Otherwise a visitor without a `user_id` cookie gets a fresh UUID v4,
//!    tagged `new-user`.
//! 3. Otherwise the existing cookies are left untouched.
//!
//! Assignment only happens in production, or when tracking is explicitly
//! enabled elsewhere. Existing cookies are still read when it does not.

use std::collections::HashMap;

use axum::extract::Query;
use axum::http::{HeaderMap, HeaderValue, Uri};
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::cookies::{request_cookies, set_cookie};
use super::sanitize::sanitize_text;
use crate::config::Config;
use crate::types::{AnonymousIdentity, IdentityType};

pub const USER_ID_COOKIE: &str = "user_id";
pub const USER_ID_TYPE_COOKIE: &str = "user_id_type";

/// The identifier values the rest of a request should see.
///
/// Empty strings when the visitor has no identity and none was assigned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitorIdentity {
    pub user_id: String,
    pub user_id_type: String,
}

impl From<&AnonymousIdentity> for VisitorIdentity {
    fn from(identity: &AnonymousIdentity) -> Self {
        Self {
            user_id: identity.id.clone(),
            user_id_type: identity.id_type.as_str().to_string(),
        }
    }
}

/// Outcome of resolving a request's identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub visitor: VisitorIdentity,
    /// Identity to write back as cookies; `None` leaves the cookies alone
    pub assigned: Option<AnonymousIdentity>,
}

#[derive(Debug, Clone)]
pub struct IdentityAssigner {
    campaign_param: String,
    max_age: Duration,
    enabled: bool,
}

impl IdentityAssigner {
    pub fn new(campaign_param: impl Into<String>, max_age: Duration, enabled: bool) -> Self {
        Self {
            campaign_param: campaign_param.into(),
            max_age,
            enabled,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.identity.campaign_param.clone(),
            Duration::days(i64::from(config.identity.max_age_days)),
            config.tracking.assigns_identity(),
        )
    }

    /// Identity already held in the request's cookies.
    pub fn current(&self, headers: &HeaderMap) -> VisitorIdentity {
        let cookies = request_cookies(headers);
        let read = |name: &str| {
            cookies
                .get(name)
                .map(|v| sanitize_text(v))
                .unwrap_or_default()
        };
        VisitorIdentity {
            user_id: read(USER_ID_COOKIE),
            user_id_type: read(USER_ID_TYPE_COOKIE),
        }
    }

    /// Campaign identifier carried in the request's query string, if any.
    ///
    /// A query string that does not decode as a form carries none.
    fn campaign(&self, uri: &Uri) -> Option<String> {
        let Query(params) = Query::<HashMap<String, String>>::try_from_uri(uri).ok()?;
        params
            .get(&self.campaign_param)
            .map(|v| sanitize_text(v))
            .filter(|v| !v.is_empty())
    }

    /// Resolve the identity for a request with the given headers and URI.
    pub fn resolve(&self, headers: &HeaderMap, uri: &Uri) -> Resolution {
        let existing = self.current(headers);
        if !self.enabled {
            return Resolution {
                visitor: existing,
                assigned: None,
            };
        }

        let assigned = if let Some(id) = self.campaign(uri) {
            Some(AnonymousIdentity {
                id,
                id_type: IdentityType::AdCampaign,
            })
        } else if !request_cookies(headers).contains_key(USER_ID_COOKIE) {
            Some(AnonymousIdentity {
                id: Uuid::new_v4().to_string(),
                id_type: IdentityType::NewUser,
            })
        } else {
            None
        };

        match assigned {
            Some(identity) => {
                tracing::debug!(id_type = %identity.id_type, "Assigned visitor identity");
                Resolution {
                    visitor: VisitorIdentity::from(&identity),
                    assigned: Some(identity),
                }
            }
            None => Resolution {
                visitor: existing,
                assigned: None,
            },
        }
    }

    /// `Set-Cookie` values persisting `identity` site-wide.
    pub fn cookie_headers(
        &self,
        identity: &AnonymousIdentity,
        now: DateTime<Utc>,
    ) -> Vec<HeaderValue> {
        [
            set_cookie(USER_ID_COOKIE, &identity.id, now, self.max_age),
            set_cookie(
                USER_ID_TYPE_COOKIE,
                identity.id_type.as_str(),
                now,
                self.max_age,
            ),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}
