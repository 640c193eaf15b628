//! Ingest endpoint
//!
//! Policy, in order:
//! 1. Authenticated callers are rejected (403)
//! 2. `startTime`, `endTime` and `pageTitle` must be present and non-empty (400)
//! 3. Bot user agents are rejected (403)
//! 4. The device is classified from the user agent
//! 5. The payload is enriched into an [`EnrichedEvent`]
//! 6. Payload filters run, then the event is relayed
//!
//! Decoding is lenient: only the three required fields can fail a request.
//! Everything else falls back to an empty string, zero or `false`.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::REFERER;
use axum::http::{HeaderMap, StatusCode};
use axum::{Extension, Json};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use super::error::{IngestError, IngestResponse};
use super::filter::apply_all;
use super::identity::VisitorIdentity;
use super::sanitize::{lenient_bool, non_negative_int, sanitize_text, text_value};
use super::AppState;
use crate::agent::{classify_device, is_bot};
use crate::config::RelayMode;
use crate::relay::{EnrichedEvent, ANONYMIZED_IP, DIRECT_URL};
use crate::types::DeviceClass;

/// Fields without which an event is rejected.
pub const REQUIRED_FIELDS: [&str; 3] = ["startTime", "endTime", "pageTitle"];

const UNKNOWN_LOCATION: &str = "unknown";

/// Server-side facts stamped onto every event.
#[derive(Debug, Clone)]
pub struct Stamp<'a> {
    pub visitor: &'a VisitorIdentity,
    pub referer: Option<&'a str>,
    pub organization: &'a str,
    pub now: DateTime<Utc>,
}

/// Parse a request body into a JSON object.
pub fn parse_payload(body: &[u8]) -> Result<Map<String, Value>, IngestError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(IngestError::InvalidPayload),
        Err(e) => {
            tracing::debug!(error = %e, "Rejected unparseable tracking payload");
            Err(IngestError::InvalidPayload)
        }
    }
}

/// Check that every required field carries a non-empty value.
pub fn validate(data: &Map<String, Value>) -> Result<(), IngestError> {
    let missing = REQUIRED_FIELDS.iter().find(|field| {
        data.get(**field)
            .and_then(text_value)
            .map_or(true, |v| v.trim().is_empty())
    });
    match missing {
        Some(field) => {
            tracing::debug!(field = *field, "Rejected tracking payload with missing field");
            Err(IngestError::InvalidPayload)
        }
        None => Ok(()),
    }
}

/// User agent reported by the page, empty when absent.
pub fn reported_user_agent(data: &Map<String, Value>) -> String {
    data.get("userAgent")
        .and_then(text_value)
        .unwrap_or_default()
}

fn text(data: &Map<String, Value>, field: &str) -> Option<String> {
    data.get(field).and_then(text_value).map(|v| sanitize_text(&v))
}

fn int(data: &Map<String, Value>, field: &str) -> u64 {
    data.get(field).map(non_negative_int).unwrap_or(0)
}

/// Build the collector envelope from a validated payload.
pub fn enrich(data: &Map<String, Value>, device: DeviceClass, stamp: &Stamp<'_>) -> EnrichedEvent {
    let url = text(data, "url")
        .filter(|u| !u.is_empty())
        .or_else(|| stamp.referer.map(sanitize_text).filter(|u| !u.is_empty()))
        .unwrap_or_else(|| DIRECT_URL.to_string());

    EnrichedEvent {
        user_id: sanitize_text(&stamp.visitor.user_id),
        user_id_type: sanitize_text(&stamp.visitor.user_id_type),
        ip_address: ANONYMIZED_IP.to_string(),
        url,
        device,
        organization: stamp.organization.to_string(),
        event_date: stamp.now.to_rfc3339_opts(SecondsFormat::Secs, false),
        screen_width: int(data, "screenWidth"),
        screen_height: int(data, "screenHeight"),
        language: text(data, "language").unwrap_or_default(),
        timezone: text(data, "timezone").unwrap_or_default(),
        cookies_enabled: data.get("cookiesEnabled").map_or(false, lenient_bool),
        page_title: text(data, "pageTitle").unwrap_or_default(),
        location: text(data, "location").unwrap_or_else(|| UNKNOWN_LOCATION.to_string()),
        operating_system: text(data, "operatingSystem").unwrap_or_default(),
        start_time: text(data, "startTime").unwrap_or_default(),
        end_time: text(data, "endTime").unwrap_or_default(),
        time_spent: int(data, "timeSpent"),
        browser: text(data, "browser").unwrap_or_default(),
    }
}

/// `POST /tracker/v1/log/`
pub async fn ingest(
    State(state): State<AppState>,
    visitor: Option<Extension<VisitorIdentity>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<IngestResponse>), IngestError> {
    if state.auth.is_authenticated(&headers) {
        tracing::debug!("Rejected tracking request from authenticated caller");
        return Err(IngestError::Authenticated);
    }

    let data = parse_payload(&body)?;
    validate(&data)?;

    let user_agent = reported_user_agent(&data);
    if is_bot(&user_agent) {
        tracing::debug!("Rejected tracking request from bot user agent");
        return Err(IngestError::Bot);
    }
    let device = classify_device(&user_agent);

    let visitor = match visitor {
        Some(Extension(visitor)) => visitor,
        None => state.identity.current(&headers),
    };
    let stamp = Stamp {
        visitor: &visitor,
        referer: headers.get(REFERER).and_then(|v| v.to_str().ok()),
        organization: &state.organization,
        now: state.clock.now(),
    };
    let event = apply_all(&state.filters, enrich(&data, device, &stamp), &headers);

    match state.relay_mode {
        RelayMode::Await => {
            let receipt = state
                .relay
                .forward(&event)
                .await
                .map_err(IngestError::Relay)?;
            tracing::debug!(status = receipt.status, device = %device, "Relayed tracking event");
            Ok((StatusCode::OK, Json(IngestResponse::success())))
        }
        RelayMode::Detached => {
            let relay = state.relay.clone();
            tokio::spawn(async move {
                // Failures are already logged by the relay client
                if let Ok(receipt) = relay.forward(&event).await {
                    tracing::debug!(status = receipt.status, "Relayed tracking event");
                }
            });
            Ok((StatusCode::ACCEPTED, Json(IngestResponse::accepted())))
        }
    }
}
