//! Site hooks over the enriched event
//!
//! Filters run in registration order after enrichment and before relay. Each
//! receives the previous filter's output and the request headers.

use axum::http::HeaderMap;

use crate::relay::{EnrichedEvent, ANONYMIZED_IP};

pub trait PayloadFilter: Send + Sync {
    fn apply(&self, event: EnrichedEvent, headers: &HeaderMap) -> EnrichedEvent;
}

impl<F> PayloadFilter for F
where
    F: Fn(EnrichedEvent, &HeaderMap) -> EnrichedEvent + Send + Sync,
{
    fn apply(&self, event: EnrichedEvent, headers: &HeaderMap) -> EnrichedEvent {
        self(event, headers)
    }
}

/// Run `event` through every filter in order.
///
/// The IP marker is restored afterwards; filters cannot forward an address.
pub fn apply_all(
    filters: &[std::sync::Arc<dyn PayloadFilter>],
    event: EnrichedEvent,
    headers: &HeaderMap,
) -> EnrichedEvent {
    let mut event = filters
        .iter()
        .fold(event, |event, filter| filter.apply(event, headers));
    if event.ip_address != ANONYMIZED_IP {
        tracing::warn!("Payload filter replaced the IP marker; restoring it");
        event.ip_address = ANONYMIZED_IP.to_string();
    }
    event
}
