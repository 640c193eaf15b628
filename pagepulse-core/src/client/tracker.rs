//! Session tracker
//!
//! Owns one page visit. A tracker only exists in the **Armed** state: it is
//! created by [`SessionTracker::start`] once the environment, bot and throttle
//! checks pass. The first exit signal that produces a payload moves it to
//! **Sent**, which is terminal.
//!
//! ```text
//!   start() ──(production, not a bot, throttle open)──► Armed ──first send──► Sent
//! ```
//!
//! Several host signals compete to end the session (visibility hidden, two
//! unload signals, and page-hide on handheld devices). Every one of them goes
//! through [`SessionTracker::handle`], which claims the `sent` flag with a
//! single compare-and-swap before doing any work, so at most one payload is
//! ever transmitted no matter how many signals fire or on which thread.
//!
//! Every armed session writes its start time to the page's store, replacing
//! the previous one. Each load measures its own visit; a host that wants to
//! know when the page's latest session began reads it back with
//! [`SessionTracker::stored_start_time`].
//!
//! Geolocation runs alongside the session and is never awaited by the exit
//! path: a payload built before it resolves carries `"unknown"`, and a
//! resolution arriving after the send is discarded.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use tokio::task::JoinHandle;

use super::beacon::Beacon;
use super::store::{LocalStore, START_TIME_KEY};
use super::throttle::{ThrottleGate, DEFAULT_WINDOW_MS};
use crate::agent::{browser_name, classify_device, is_bot};
use crate::clock::Clock;
use crate::config::{Config, PRODUCTION};
use crate::types::{DeviceClass, TrackingEvent};

/// Location reported when geolocation has not resolved by send time.
pub const UNKNOWN_LOCATION: &str = "unknown";

/// Page-level settings the server hands to the tracker.
#[derive(Debug, Clone)]
pub struct TrackerSettings {
    pub environment: String,
    pub rest_url: String,
    pub throttle_window: Duration,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            environment: PRODUCTION.to_string(),
            rest_url: crate::server::INGEST_PATH.to_string(),
            throttle_window: Duration::milliseconds(DEFAULT_WINDOW_MS),
        }
    }
}

impl From<&Config> for TrackerSettings {
    fn from(config: &Config) -> Self {
        Self {
            environment: config.tracking.environment.clone(),
            rest_url: config.client.rest_url.clone(),
            throttle_window: Duration::milliseconds(
                i64::try_from(config.client.throttle_window_ms).unwrap_or(i64::MAX),
            ),
        }
    }
}

/// Facts about the page and browser, captured at load.
#[derive(Debug, Clone, Default)]
pub struct PageFacts {
    pub screen_width: u32,
    pub screen_height: u32,
    pub language: String,
    pub timezone: String,
    pub cookies_enabled: bool,
    pub page_title: String,
    /// Browser-reported platform string
    pub platform: String,
    pub user_agent: String,
    pub url: Option<String>,
}

/// Host services the tracker depends on.
#[derive(Clone)]
pub struct TrackerHost {
    pub store: Arc<dyn LocalStore>,
    pub clock: Arc<dyn Clock>,
    pub beacon: Arc<dyn Beacon>,
}

/// Why no session was started for a page load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotArmed {
    /// Tracking only runs in production
    NotProduction,
    /// User agent matched the bot filter
    Bot,
    /// A session already sent within the throttle window
    Throttled,
}

/// Page lifecycle signals that can end a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitSignal {
    /// Document visibility became hidden
    VisibilityHidden,
    /// The page is about to unload
    BeforeUnload,
    /// The page is unloading
    Unload,
    /// Page hidden for navigation; only listened to on handheld devices
    PageHide,
}

/// Result of handling one exit signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// This call transmitted the session's payload
    Sent,
    /// An earlier signal already transmitted it
    AlreadySent,
    /// Computed duration was not positive; nothing transmitted
    TooShort,
    /// The tracker does not listen to this signal on this device
    NotListening,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Armed,
    Sent,
}

/// Latitude/longitude pair from the host's geolocation service.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    fn label(&self) -> String {
        format!("{}, {}", self.latitude, self.longitude)
    }
}

#[derive(Debug, Default)]
struct SessionShared {
    sent: AtomicBool,
    location: Mutex<Option<String>>,
}

/// Write handle for an asynchronously resolved location.
#[derive(Debug, Clone)]
pub struct LocationSink {
    shared: Arc<SessionShared>,
}

impl LocationSink {
    /// Record the visitor's location. Returns false when the session has
    /// already been sent and the value was discarded.
    pub fn resolve(&self, coords: Coordinates) -> bool {
        if self.shared.sent.load(Ordering::Acquire) {
            return false;
        }
        *self
            .shared
            .location
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(coords.label());
        true
    }
}

pub struct SessionTracker {
    facts: PageFacts,
    device: DeviceClass,
    start_time: DateTime<Utc>,
    shared: Arc<SessionShared>,
    gate: ThrottleGate,
    host: TrackerHost,
}

impl SessionTracker {
    /// Start a session for this page load, if it qualifies.
    ///
    /// Persists the start time, overwriting the one left by an earlier load.
    pub fn start(
        settings: &TrackerSettings,
        facts: PageFacts,
        host: TrackerHost,
    ) -> Result<Self, NotArmed> {
        if settings.environment != PRODUCTION {
            return Err(NotArmed::NotProduction);
        }
        if is_bot(&facts.user_agent) {
            return Err(NotArmed::Bot);
        }

        let gate = ThrottleGate::new(
            host.store.clone(),
            host.clock.clone(),
            settings.throttle_window,
        );
        if !gate.should_emit() {
            return Err(NotArmed::Throttled);
        }

        let start_time = host.clock.now();
        if let Some(previous) = Self::stored_start_time(host.store.as_ref()) {
            tracing::debug!(previous = %iso(previous), "Replacing earlier session start time");
        }
        if let Err(e) = host.store.set(START_TIME_KEY, &iso(start_time)) {
            tracing::warn!(error = %e, "Failed to persist session start time");
        }

        let device = classify_device(&facts.user_agent);
        tracing::debug!(device = %device, "Session armed");

        Ok(Self {
            facts,
            device,
            start_time,
            shared: Arc::new(SessionShared::default()),
            gate,
            host,
        })
    }

    pub fn state(&self) -> SessionState {
        if self.shared.sent.load(Ordering::Acquire) {
            SessionState::Sent
        } else {
            SessionState::Armed
        }
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// Start time of the latest session armed against `store`, if one was
    /// persisted and still parses.
    pub fn stored_start_time(store: &dyn LocalStore) -> Option<DateTime<Utc>> {
        let raw = store.get(START_TIME_KEY)?;
        DateTime::parse_from_rfc3339(raw.trim())
            .ok()
            .map(|at| at.with_timezone(&Utc))
    }

    pub fn device(&self) -> DeviceClass {
        self.device
    }

    /// Signals the host should wire to [`Self::handle`] for this device.
    pub fn listened_signals(&self) -> Vec<ExitSignal> {
        let mut signals = vec![
            ExitSignal::VisibilityHidden,
            ExitSignal::BeforeUnload,
            ExitSignal::Unload,
        ];
        if self.device.is_handheld() {
            signals.push(ExitSignal::PageHide);
        }
        signals
    }

    pub fn location_sink(&self) -> LocationSink {
        LocationSink {
            shared: self.shared.clone(),
        }
    }

    /// Run a geolocation lookup concurrently with the session.
    ///
    /// Returns `None` when called outside an async runtime.
    pub fn spawn_geolocation<F>(&self, lookup: F) -> Option<JoinHandle<()>>
    where
        F: Future<Output = Option<Coordinates>> + Send + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current().ok()?;
        let sink = self.location_sink();
        Some(runtime.spawn(async move {
            if let Some(coords) = lookup.await {
                if !sink.resolve(coords) {
                    tracing::debug!("Geolocation resolved after send, discarded");
                }
            }
        }))
    }

    /// Handle one exit signal.
    pub fn handle(&self, signal: ExitSignal) -> SendOutcome {
        if signal == ExitSignal::PageHide && !self.device.is_handheld() {
            return SendOutcome::NotListening;
        }
        self.send()
    }

    fn send(&self) -> SendOutcome {
        if self.shared.sent.load(Ordering::Acquire) {
            return SendOutcome::AlreadySent;
        }

        let end_time = self.host.clock.now();
        let time_spent = rounded_seconds(end_time - self.start_time);
        if time_spent <= 0 {
            tracing::debug!(time_spent, "Session too short, not sending");
            return SendOutcome::TooShort;
        }

        if self
            .shared
            .sent
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return SendOutcome::AlreadySent;
        }

        let event = self.build_event(end_time, time_spent as u64);
        self.host.beacon.dispatch(event);

        // Recorded on attempt: delivery is never observable from here.
        if let Err(e) = self.gate.record_attempt() {
            tracing::warn!(error = %e, "Failed to persist throttle timestamp");
        }

        SendOutcome::Sent
    }

    fn build_event(&self, end_time: DateTime<Utc>, time_spent: u64) -> TrackingEvent {
        let location = self
            .shared
            .location
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .unwrap_or_else(|| UNKNOWN_LOCATION.to_string());

        TrackingEvent {
            screen_width: self.facts.screen_width,
            screen_height: self.facts.screen_height,
            language: self.facts.language.clone(),
            timezone: self.facts.timezone.clone(),
            cookies_enabled: self.facts.cookies_enabled,
            page_title: self.facts.page_title.clone(),
            location,
            operating_system: self.facts.platform.clone(),
            start_time: iso(self.start_time),
            end_time: iso(end_time),
            time_spent,
            browser: browser_name(&self.facts.user_agent).to_string(),
            user_agent: self.facts.user_agent.clone(),
            url: self.facts.url.clone(),
        }
    }
}

fn iso(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Elapsed time in whole seconds, rounded half away from zero.
fn rounded_seconds(elapsed: Duration) -> i64 {
    (elapsed.num_milliseconds() as f64 / 1000.0).round() as i64
}
