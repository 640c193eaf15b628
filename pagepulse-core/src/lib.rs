//! # pagepulse-core
//!
//! Core library for pagepulse - anonymous page-visit telemetry.
//!
//! This library provides:
//! - User agent heuristics (bot filter, device classifier)
//! - The page-side session tracker with its throttle gate
//! - The ingest endpoint with anonymous identity assignment
//! - The relay to the downstream collector
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! Data flows from the page to the collector in three hops:
//! - **Page:** [`client::SessionTracker`] builds one [`TrackingEvent`] per visit
//!   and hands it to a fire-and-forget [`client::Beacon`]
//! - **Ingest:** [`server::router`] authorizes, validates and enriches it into
//!   a [`relay::EnrichedEvent`]
//! - **Relay:** [`relay::RelayClient`] posts the envelope to the collector
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pagepulse_core::{server, Config, RelayClient};
//!
//! # async fn run() -> pagepulse_core::Result<()> {
//! let config = Config::load()?;
//! let relay = Arc::new(RelayClient::new(&config.relay)?);
//! let state = server::AppState::from_config(&config, relay);
//!
//! let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
//! server::serve(listener, state).await?;
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use agent::{browser_name, classify_device, is_bot};
pub use config::Config;
pub use error::{Error, Result};
pub use relay::{EnrichedEvent, Forward, RelayClient};
pub use types::*;

// Public modules
pub mod agent;
pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod relay;
pub mod server;
pub mod types;
