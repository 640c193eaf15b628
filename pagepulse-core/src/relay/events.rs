//! Event envelope sent to the downstream collector
//!
//! An [`EnrichedEvent`] is a [`TrackingEvent`] with the raw user agent removed
//! and server-derived fields added:
//!
//! ```text
//! Page (TrackingEvent) → Ingest endpoint (EnrichedEvent) → Collector
//!     startTime/endTime          eventDate                  (not our concern)
//! ```
//!
//! - `startTime`/`endTime`: page clock, as reported by the session
//! - `eventDate`: server clock when the event was ingested

use serde::{Deserialize, Serialize};

use crate::types::DeviceClass;

/// Value forwarded in place of the caller's IP address, always.
pub const ANONYMIZED_IP: &str = "ANONYMIZED";

/// URL reported when neither the page nor the referrer supplied one.
pub const DIRECT_URL: &str = "Direct";

/// Collector envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedEvent {
    /// Anonymous identifier, empty when the visitor has none
    pub user_id: String,
    /// `new-user` or `ad-campaign`, empty when the visitor has no identifier
    pub user_id_type: String,
    /// Always [`ANONYMIZED_IP`]
    pub ip_address: String,
    pub url: String,
    pub device: DeviceClass,
    pub organization: String,
    /// Server time of ingestion, ISO-8601
    pub event_date: String,

    pub screen_width: u64,
    pub screen_height: u64,
    pub language: String,
    pub timezone: String,
    pub cookies_enabled: bool,
    pub page_title: String,
    pub location: String,
    pub operating_system: String,
    pub start_time: String,
    pub end_time: String,
    pub time_spent: u64,
    pub browser: String,
}
