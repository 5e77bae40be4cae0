//! Domain event publishing.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::events::DomainEvent;

pub const SUBJECT_PREFIX: &str = "storefront";

/// Publishing never fails the operation that raised the events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, events: Vec<DomainEvent>);
}

/// Sends each event as JSON on `storefront.<aggregate>.<event>`.
pub struct NatsPublisher {
    client: async_nats::Client,
}

impl NatsPublisher {
    pub fn new(client: async_nats::Client) -> Self { Self { client } }
}

#[async_trait]
impl EventPublisher for NatsPublisher {
    async fn publish(&self, events: Vec<DomainEvent>) {
        for event in events {
            let subject = format!("{SUBJECT_PREFIX}.{}", event.subject());
            let payload = match serde_json::to_vec(&event) {
                Ok(p) => p,
                Err(e) => { warn!(error = %e, subject = %subject, "Failed to encode event"); continue; }
            };
            if let Err(e) = self.client.publish(subject.clone(), payload.into()).await {
                warn!(error = %e, subject = %subject, "Failed to publish event");
            }
        }
    }
}

/// Used when no broker is configured.
#[derive(Default)]
pub struct LogPublisher;

#[async_trait]
impl EventPublisher for LogPublisher {
    async fn publish(&self, events: Vec<DomainEvent>) {
        for event in events {
            debug!(subject = event.subject(), event = ?event, "Domain event");
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Keeps every published event for assertions.
    #[derive(Default)]
    pub struct RecordingPublisher {
        pub events: Mutex<Vec<DomainEvent>>,
    }

    impl RecordingPublisher {
        pub fn subjects(&self) -> Vec<&'static str> {
            self.events.lock().unwrap().iter().map(|e| e.subject()).collect()
        }
    }

    #[async_trait]
    impl EventPublisher for RecordingPublisher {
        async fn publish(&self, events: Vec<DomainEvent>) {
            self.events.lock().unwrap().extend(events);
        }
    }
}
