//! Domain event publication.

use tracing::{debug, warn};

use crate::domain::events::DomainEvent;

/// Publishes drained aggregate events to NATS when a client is configured.
/// Publication is best effort; a failure is logged and never fails the
/// operation that raised the event.
#[derive(Clone, Default)]
pub struct EventPublisher { nats: Option<async_nats::Client> }

impl EventPublisher {
    pub fn new(nats: Option<async_nats::Client>) -> Self { Self { nats } }

    pub fn disabled() -> Self { Self::default() }

    pub async fn publish_all(&self, events: Vec<DomainEvent>) {
        for event in events {
            self.publish(&event).await;
        }
    }

    pub async fn publish(&self, event: &DomainEvent) {
        let subject = format!("ecommerce.{}", event.subject());
        let Some(client) = &self.nats else {
            debug!(subject = %subject, ?event, "domain event");
            return;
        };
        let payload = match serde_json::to_vec(event) {
            Ok(p) => p,
            Err(e) => {
                warn!(subject = %subject, error = %e, "could not encode domain event");
                return;
            }
        };
        if let Err(e) = client.publish(subject.clone(), payload.into()).await {
            warn!(subject = %subject, error = %e, "could not publish domain event");
        }
    }
}
