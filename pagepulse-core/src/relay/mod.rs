//! Relay to the downstream analytics collector
//!
//! ## Architecture
//!
//! The relay is best-effort:
//! - Each ingested event produces exactly one delivery attempt
//! - Attempts are bounded by `relay.timeout_secs`
//! - Failures are logged here and reported to the ingest endpoint, never retried
//!
//! ## Usage
//!
//! Point the relay at a collector in `~/.config/pagepulse/config.toml`:
//!
//! ```toml
//! [relay]
//! url = "https://collector.example.com/api/UserEvents"
//! timeout_secs = 5
//! organization = "Example Inc"
//! ```

mod client;
mod events;

pub use client::{Forward, RelayClient, RelayReceipt};
pub use events::{EnrichedEvent, ANONYMIZED_IP, DIRECT_URL};
