//! Core domain types for pagepulse
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Session** | One page visit, from load to its first qualifying exit signal |
//! | **TrackingEvent** | The payload a session sends to the ingest endpoint, built once |
//! | **EnrichedEvent** | A TrackingEvent plus server-derived fields, relayed downstream |
//! | **AnonymousIdentity** | A durable non-PII identifier held in the visitor's cookies |
//! | **Provenance** | Whether an identifier was minted organically or taken from a campaign link |

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================
// Device class
// ============================================

/// Coarse device class derived from a user agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceClass {
    Tablet,
    Mobile,
    Desktop,
    Unknown,
}

impl DeviceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceClass::Tablet => "Tablet",
            DeviceClass::Mobile => "Mobile",
            DeviceClass::Desktop => "Desktop",
            DeviceClass::Unknown => "Unknown",
        }
    }

    /// Phones and tablets, the devices whose browsers may skip unload signals.
    pub fn is_handheld(&self) -> bool {
        matches!(self, DeviceClass::Tablet | DeviceClass::Mobile)
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================
// Identity
// ============================================

/// Provenance of an anonymous identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdentityType {
    /// Minted by the server for a visitor that had no identifier yet
    NewUser,
    /// Taken verbatim (after sanitization) from a campaign link parameter
    AdCampaign,
}

impl IdentityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentityType::NewUser => "new-user",
            IdentityType::AdCampaign => "ad-campaign",
        }
    }
}

impl fmt::Display for IdentityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for IdentityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new-user" => Ok(IdentityType::NewUser),
            "ad-campaign" => Ok(IdentityType::AdCampaign),
            _ => Err(format!("unknown identity type: {}", s)),
        }
    }
}

/// Identifier correlating visits from one browser without authentication.
///
/// Stored client-side in the `user_id` / `user_id_type` cookies; the server only
/// reads, merges and writes it back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnonymousIdentity {
    pub id: String,
    #[serde(rename = "type")]
    pub id_type: IdentityType,
}

// ============================================
// Wire payloads
// ============================================

/// Payload sent by a session to `POST /tracker/v1/log/`.
///
/// Built exactly once per session, at send time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingEvent {
    pub screen_width: u32,
    pub screen_height: u32,
    pub language: String,
    pub timezone: String,
    pub cookies_enabled: bool,
    pub page_title: String,
    /// `"lat, lon"` when geolocation resolved before send, otherwise `"unknown"`
    pub location: String,
    pub operating_system: String,
    /// ISO-8601
    pub start_time: String,
    /// ISO-8601
    pub end_time: String,
    /// Whole seconds, always > 0
    pub time_spent: u64,
    pub browser: String,
    pub user_agent: String,
    /// Page URL, when the host exposes it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}
