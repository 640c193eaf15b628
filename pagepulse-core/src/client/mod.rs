//! Page-side session instrumentation
//!
//! Decides whether a page visit is tracked, when it ends, and makes sure it
//! produces at most one [`crate::types::TrackingEvent`]:
//!
//! - [`ThrottleGate`] limits sessions to one per window across reloads
//! - [`SessionTracker`] owns the visit and its competing exit signals
//! - [`Beacon`] ships the payload without ever blocking the page
//! - [`LocalStore`] is the only state shared between loads of the page

mod beacon;
mod store;
mod throttle;
mod tracker;

pub use beacon::{Beacon, HttpBeacon, RecordingBeacon};
pub use store::{FileStore, LocalStore, MemoryStore, LAST_SENT_KEY, START_TIME_KEY};
pub use throttle::{ThrottleGate, DEFAULT_WINDOW_MS};
pub use tracker::{
    Coordinates, ExitSignal, LocationSink, NotArmed, PageFacts, SendOutcome, SessionState,
    SessionTracker, TrackerHost, TrackerSettings, UNKNOWN_LOCATION,
};
