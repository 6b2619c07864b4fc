use std::{sync::Arc, time::Duration};

use futures::StreamExt;
use rdkafka::{
    ClientConfig, Offset,
    consumer::{CommitMode, Consumer, StreamConsumer},
    message::{BorrowedMessage, Message},
};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::{
    application::router::{EventHandler, EventOutcome},
    config::KafkaConfig,
    domain::events::InboundEvent,
    shared::errors::DomainError,
};

const SEEK_TIMEOUT: Duration = Duration::from_secs(5);

/// What the poll loop does with a message's offset once handling finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitAction {
    /// Handling reached a definite outcome; advance the group past it.
    Commit,
    /// A retryable failure; the partition must be rewound so the message
    /// is redelivered.
    Retry,
}

/// Maps a handler result to the commit decision. Invalid events are
/// committed: they stay invalid on every redelivery, so retrying them
/// would wedge the partition.
pub fn commit_action(result: &Result<EventOutcome, DomainError>) -> CommitAction {
    match result {
        Ok(_) => CommitAction::Commit,
        Err(err) if err.is_retryable() => CommitAction::Retry,
        Err(_) => CommitAction::Commit,
    }
}

/// Decodes a raw message payload into an event. Empty and undecodable
/// payloads are invalid events, never retryable ones.
pub fn decode(payload: Option<&[u8]>) -> Result<InboundEvent, DomainError> {
    let Some(bytes) = payload else {
        return Err(DomainError::InvalidEvent("empty message payload".to_string()));
    };

    serde_json::from_slice(bytes)
        .map_err(|err| DomainError::InvalidEvent(format!("undecodable message: {err}")))
}

/// Position at which consumption resumes after a retryable failure: the
/// failed offset itself, never past it. Offset commits are cumulative per
/// partition, so committing any later offset would mark the failed message
/// processed.
pub fn redelivery_offset(failed: i64) -> Offset {
    Offset::Offset(failed)
}

/// Owns the broker connection, the subscribe/poll loop and the
/// offset-commit boundary. Offsets are committed manually, only after the
/// handler returns a non-retryable result, so a crash mid-message causes
/// redelivery rather than loss.
pub struct BrokerConsumer {
    inner: StreamConsumer,
    topic: String,
    retry_backoff: Duration,
}

impl BrokerConsumer {
    /// Creates the consumer and verifies the broker is reachable by
    /// fetching topic metadata. A failure here is fatal for the process.
    pub fn connect(cfg: &KafkaConfig) -> anyhow::Result<Self> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("group.id", &cfg.group_id)
            .set("bootstrap.servers", &cfg.brokers)
            .set("enable.partition.eof", "false")
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", cfg.session_timeout_ms.to_string())
            .set(
                "heartbeat.interval.ms",
                cfg.heartbeat_interval_ms.to_string(),
            )
            .create()?;

        consumer.fetch_metadata(Some(&cfg.topic), Duration::from_secs(30))?;
        info!(brokers = %cfg.brokers, group = %cfg.group_id, "broker consumer connected");

        Ok(Self {
            inner: consumer,
            topic: cfg.topic.clone(),
            retry_backoff: cfg.retry_backoff(),
        })
    }

    pub fn subscribe(&self) -> anyhow::Result<()> {
        self.inner.subscribe(&[&self.topic])?;
        info!(topic = %self.topic, "subscribed, replaying from earliest retained offset");
        Ok(())
    }

    /// Blocking poll loop. Transient stream errors are logged and the loop
    /// continues. A retryable handler failure rewinds the partition to the
    /// failed offset before the next poll, so no later offset on that
    /// partition can be committed while an earlier one is unresolved. The
    /// loop exits on the shutdown signal, finishing the in-flight message
    /// first; the caller bounds the exit with a grace period and a forced
    /// abort.
    pub async fn run(
        self,
        handler: Arc<dyn EventHandler>,
        mut shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        let mut stream = self.inner.stream();
        let mut result: anyhow::Result<()> = Ok(());

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                message = stream.next() => match message {
                    None => break,
                    Some(Err(err)) => error!("kafka stream error: {err}"),
                    Some(Ok(msg)) => match self.process(handler.as_ref(), &msg).await {
                        CommitAction::Commit => {
                            if let Err(err) = self.inner.commit_message(&msg, CommitMode::Async) {
                                error!(
                                    partition = msg.partition(),
                                    offset = msg.offset(),
                                    "offset commit failed: {err}"
                                );
                            }
                        }
                        CommitAction::Retry => {
                            tokio::time::sleep(self.retry_backoff).await;
                            if let Err(err) = self.inner.seek(
                                msg.topic(),
                                msg.partition(),
                                redelivery_offset(msg.offset()),
                                SEEK_TIMEOUT,
                            ) {
                                // Consuming past an unrewound failure would
                                // let a later commit mark it processed. Stop
                                // instead; the group resumes from the last
                                // committed offset.
                                error!(
                                    partition = msg.partition(),
                                    offset = msg.offset(),
                                    "partition rewind failed, stopping consumer: {err}"
                                );
                                result = Err(err.into());
                                break;
                            }
                        }
                    }
                }
            }
        }

        drop(stream);
        self.disconnect();
        result
    }

    async fn process(
        &self,
        handler: &dyn EventHandler,
        msg: &BorrowedMessage<'_>,
    ) -> CommitAction {
        let partition = msg.partition();
        let offset = msg.offset();

        let event = match decode(msg.payload()) {
            Ok(event) => event,
            Err(err) => {
                warn!(partition, offset, "skipping message: {err}");
                return commit_action(&Err(err));
            }
        };

        let result = handler.handle(&event, msg.topic(), partition).await;
        match &result {
            Ok(outcome) => debug!(partition, offset, ?outcome, "message handled"),
            Err(err) if err.is_retryable() => {
                error!(partition, offset, "handler failed, rewinding for redelivery: {err}");
            }
            Err(err) => warn!(partition, offset, "invalid event, skipping: {err}"),
        }

        commit_action(&result)
    }

    fn disconnect(&self) {
        self.inner.unsubscribe();
        info!("broker consumer disconnected");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successful_outcomes_commit() {
        for outcome in [
            EventOutcome::Applied,
            EventOutcome::AlreadyExists,
            EventOutcome::NoMatch,
            EventOutcome::Ignored,
        ] {
            assert_eq!(commit_action(&Ok(outcome)), CommitAction::Commit);
        }
    }

    #[test]
    fn store_errors_hold_the_offset_for_redelivery() {
        let result = Err(DomainError::Store("connection reset".to_string()));
        assert_eq!(commit_action(&result), CommitAction::Retry);
    }

    #[test]
    fn invalid_events_are_committed_past() {
        let result = Err(DomainError::InvalidEvent("non-numeric userId".to_string()));
        assert_eq!(commit_action(&result), CommitAction::Commit);
    }

    #[test]
    fn redelivery_resumes_at_the_failed_offset_not_past_it() {
        // Offset 5 fails retryably while offset 6 is already fetched.
        // Resuming anywhere past 5 would let a commit of 6 mark 5 processed.
        assert_eq!(redelivery_offset(5), Offset::Offset(5));
    }

    #[test]
    fn malformed_payload_decodes_to_a_committed_skip() {
        let err = decode(Some(b"not-json")).unwrap_err();
        assert!(!err.is_retryable());
        assert_eq!(commit_action(&Err(err)), CommitAction::Commit);
    }

    #[test]
    fn empty_payload_decodes_to_a_committed_skip() {
        let err = decode(None).unwrap_err();
        assert!(!err.is_retryable());
        assert_eq!(commit_action(&Err(err)), CommitAction::Commit);
    }

    #[test]
    fn valid_payload_decodes_to_an_event() {
        let raw = br#"{
            "eventType": "USER_CREATED",
            "timestamp": "2026-08-01T10:00:00Z",
            "data": {
                "userId": 42,
                "fullname": "Jane Doe",
                "email": "jane@x.com",
                "username": "janed"
            }
        }"#;

        let event = decode(Some(raw)).unwrap();
        assert_eq!(event.event_type, "USER_CREATED");
    }
}
