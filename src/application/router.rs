use async_trait::async_trait;
use tracing::{info, warn};

use crate::{
    application::materializer::Materializer,
    domain::{events::{EventKind, InboundEvent}, user::InsertOutcome},
    shared::errors::DomainError,
};

/// Definite result of handling one message, consumed by the consumer's
/// commit boundary. Every path through the router ends in exactly one of
/// these or in a `DomainError`; nothing is swallowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// The event mutated the store.
    Applied,
    /// A duplicate create; the existing record was left untouched.
    AlreadyExists,
    /// An update for an email with no matching record.
    NoMatch,
    /// Observed but deliberately not materialized (logins, unknown kinds).
    Ignored,
}

/// Message-level callback invoked by the broker consumer for each decoded
/// event.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(
        &self,
        event: &InboundEvent,
        topic: &str,
        partition: i32,
    ) -> Result<EventOutcome, DomainError>;
}

/// Dispatches decoded events to the materializer by kind.
pub struct EventRouter {
    materializer: Materializer,
}

impl EventRouter {
    pub fn new(materializer: Materializer) -> Self {
        Self { materializer }
    }
}

#[async_trait]
impl EventHandler for EventRouter {
    async fn handle(
        &self,
        event: &InboundEvent,
        topic: &str,
        partition: i32,
    ) -> Result<EventOutcome, DomainError> {
        info!(
            event_type = %event.event_type,
            event_id = ?event.event_id,
            topic,
            partition,
            "routing event"
        );

        let Some(kind) = event.kind() else {
            warn!(event_type = %event.event_type, "unknown event type, skipping");
            return Ok(EventOutcome::Ignored);
        };

        match kind {
            EventKind::UserCreated => {
                let outcome = self.materializer.on_created(&event.data).await?;
                Ok(match outcome {
                    InsertOutcome::Inserted => EventOutcome::Applied,
                    InsertOutcome::AlreadyExists => EventOutcome::AlreadyExists,
                })
            }
            EventKind::UserUpdated => {
                let affected = self.materializer.on_updated(&event.data).await?;
                Ok(if affected == 0 {
                    EventOutcome::NoMatch
                } else {
                    EventOutcome::Applied
                })
            }
            EventKind::UserLogin => {
                self.materializer.on_login(&event.data).await;
                Ok(EventOutcome::Ignored)
            }
        }
    }
}
