//! Best-effort publication of domain events to NATS.

use tracing::{debug, warn};

use crate::domain::events::DomainEvent;

#[derive(Clone, Default)]
pub struct EventPublisher {
    nats: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn new(nats: Option<async_nats::Client>) -> Self { Self { nats } }

    /// Publisher that drops every event.
    pub fn disabled() -> Self { Self::default() }

    pub async fn connect(url: Option<&str>) -> Self {
        let Some(url) = url else { return Self::disabled() };
        match async_nats::connect(url).await {
            Ok(client) => Self::new(Some(client)),
            Err(e) => {
                warn!(error = %e, "NATS unavailable, domain events will not be published");
                Self::disabled()
            }
        }
    }

    /// Never fails the caller; problems are logged.
    pub async fn publish(&self, event: &DomainEvent) {
        let Some(client) = &self.nats else {
            debug!(subject = event.subject(), "event publishing disabled");
            return;
        };
        let payload = match serde_json::to_vec(event) {
            Ok(p) => p,
            Err(e) => { warn!(error = %e, "could not encode domain event"); return; }
        };
        if let Err(e) = client.publish(event.subject().to_string(), payload.into()).await {
            warn!(error = %e, subject = event.subject(), "failed to publish domain event");
        }
    }
}
