//! HTTP surface: identity middleware and the ingest endpoint
//!
//! ## Routes
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | `POST` | `/tracker/v1/log/` | [`ingest::ingest`] |
//! | `POST` | `/tracker/v1/log` | [`ingest::ingest`] |
//! | `GET`  | `/healthz` | liveness |
//!
//! Every route passes through [`assign_identity`], so any page request can
//! mint or overwrite the visitor's identity cookies.

pub mod auth;
pub mod cookies;
pub mod error;
pub mod filter;
pub mod identity;
pub mod ingest;
pub mod sanitize;

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::SET_COOKIE;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;

use crate::clock::{Clock, SystemClock};
use crate::config::{Config, RelayMode};
use crate::error::Result;
use crate::relay::Forward;

pub use auth::{AuthProbe, CookieAuthProbe};
pub use error::{IngestError, IngestResponse};
pub use filter::PayloadFilter;
pub use identity::{IdentityAssigner, VisitorIdentity, USER_ID_COOKIE, USER_ID_TYPE_COOKIE};

/// Path the page-side beacon posts to.
pub const INGEST_PATH: &str = "/tracker/v1/log/";

/// Shared state for every request.
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<dyn Forward>,
    pub auth: Arc<dyn AuthProbe>,
    pub identity: Arc<IdentityAssigner>,
    pub filters: Vec<Arc<dyn PayloadFilter>>,
    pub clock: Arc<dyn Clock>,
    pub organization: String,
    pub relay_mode: RelayMode,
}

impl AppState {
    pub fn from_config(config: &Config, relay: Arc<dyn Forward>) -> Self {
        Self {
            relay,
            auth: Arc::new(CookieAuthProbe::from_config(&config.auth)),
            identity: Arc::new(IdentityAssigner::from_config(config)),
            filters: Vec::new(),
            clock: Arc::new(SystemClock),
            organization: config.relay.organization.clone(),
            relay_mode: config.relay.mode,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_auth(mut self, auth: Arc<dyn AuthProbe>) -> Self {
        self.auth = auth;
        self
    }

    /// Append a payload filter; filters run in the order they were added.
    pub fn with_filter(mut self, filter: impl PayloadFilter + 'static) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }
}

/// Resolve the visitor's identity, expose it to handlers through request
/// extensions and write back any newly assigned cookies.
pub async fn assign_identity(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let resolution = state.identity.resolve(request.headers(), request.uri());
    request.extensions_mut().insert(resolution.visitor);

    let mut response = next.run(request).await;
    if let Some(identity) = resolution.assigned {
        for value in state.identity.cookie_headers(&identity, state.clock.now()) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }
    response
}

async fn healthz() -> &'static str {
    "ok"
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(INGEST_PATH, post(ingest::ingest))
        .route("/tracker/v1/log", post(ingest::ingest))
        .route("/healthz", get(healthz))
        .layer(middleware::from_fn_with_state(state.clone(), assign_identity))
        .with_state(state)
}

/// Serve the router on `listener` until Ctrl-C.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "Ingest endpoint listening");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "Failed to listen for shutdown signal");
            }
        })
        .await?;
    tracing::info!("Ingest endpoint stopped");
    Ok(())
}
