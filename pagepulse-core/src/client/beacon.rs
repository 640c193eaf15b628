//! Fire-and-forget transmission of a session's payload
//!
//! A beacon is issued while the page is going away. The caller never waits on
//! it and never learns its result: the request runs on a detached task whose
//! lifetime is independent of the page, and its outcome is only logged.

use std::sync::Mutex;
use std::time::Duration;

use super::tracker::TrackerSettings;
use crate::types::TrackingEvent;

/// Outbound channel for a finished session.
pub trait Beacon: Send + Sync {
    /// Hand off the payload. Must return without waiting on the network.
    fn dispatch(&self, event: TrackingEvent);
}

/// Beacon posting JSON to the ingest endpoint over HTTP.
pub struct HttpBeacon {
    http_client: reqwest::Client,
    endpoint: String,
}

impl HttpBeacon {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// Beacon posting to the settings' ingest path on `origin`.
    pub fn from_settings(origin: &str, settings: &TrackerSettings) -> Self {
        Self::new(format!(
            "{}/{}",
            origin.trim_end_matches('/'),
            settings.rest_url.trim_start_matches('/')
        ))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Beacon for HttpBeacon {
    fn dispatch(&self, event: TrackingEvent) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("No async runtime available, dropping beacon");
            return;
        };

        let request = self
            .http_client
            .post(&self.endpoint)
            .timeout(Duration::from_secs(10))
            .json(&event);
        let endpoint = self.endpoint.clone();

        // Detached: the JoinHandle is dropped on purpose.
        runtime.spawn(async move {
            match request.send().await {
                Ok(response) => {
                    tracing::debug!(endpoint = %endpoint, status = %response.status(), "Beacon delivered");
                }
                Err(e) => {
                    tracing::debug!(endpoint = %endpoint, error = %e, "Beacon lost");
                }
            }
        });
    }
}

/// Beacon that keeps every payload in memory.
#[derive(Debug, Default)]
pub struct RecordingBeacon {
    sent: Mutex<Vec<TrackingEvent>>,
}

impl RecordingBeacon {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<TrackingEvent> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Beacon for RecordingBeacon {
    fn dispatch(&self, event: TrackingEvent) {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> TrackingEvent {
        TrackingEvent {
            screen_width: 0,
            screen_height: 0,
            language: String::new(),
            timezone: String::new(),
            cookies_enabled: false,
            page_title: "t".to_string(),
            location: "unknown".to_string(),
            operating_system: String::new(),
            start_time: "2025-01-01T00:00:00.000Z".to_string(),
            end_time: "2025-01-01T00:00:01.000Z".to_string(),
            time_spent: 1,
            browser: "Unknown".to_string(),
            user_agent: String::new(),
            url: None,
        }
    }

    #[test]
    fn test_http_beacon_without_runtime_is_silent() {
        let beacon = HttpBeacon::new("http://127.0.0.1:9/tracker/v1/log/");
        beacon.dispatch(event());
    }

    #[tokio::test]
    async fn test_http_beacon_unreachable_endpoint_does_not_block() {
        let beacon = HttpBeacon::new("http://127.0.0.1:9/tracker/v1/log/");
        let started = std::time::Instant::now();
        beacon.dispatch(event());
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn test_endpoint_from_settings() {
        let settings = TrackerSettings::default();
        let beacon = HttpBeacon::from_settings("http://127.0.0.1:8080/", &settings);
        assert_eq!(beacon.endpoint(), "http://127.0.0.1:8080/tracker/v1/log/");

        let settings = TrackerSettings {
            rest_url: "collect".to_string(),
            ..TrackerSettings::default()
        };
        let beacon = HttpBeacon::from_settings("https://shop.example.com", &settings);
        assert_eq!(beacon.endpoint(), "https://shop.example.com/collect");
    }

    #[test]
    fn test_recording_beacon_collects() {
        let beacon = RecordingBeacon::new();
        beacon.dispatch(event());
        beacon.dispatch(event());
        assert_eq!(beacon.count(), 2);
    }
}
