use serde::Deserialize;

use crate::shared::errors::DomainError;

/// Wire envelope published on the `user-events` topic. Transient: decoded,
/// routed, then dropped — the pipeline never re-serializes it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundEvent {
    pub event_type: String,
    pub event_id: Option<String>,
    pub timestamp: String,
    pub data: EventPayload,
    pub metadata: Option<EventMetadata>,
}

impl InboundEvent {
    pub fn kind(&self) -> Option<EventKind> {
        EventKind::parse(&self.event_type)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    pub user_id: ExternalUserId,
    pub fullname: String,
    pub email: String,
    pub username: String,
    pub created_at: Option<String>,
    pub login_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventMetadata {
    pub service: String,
    pub version: String,
}

/// Producers send `userId` as either a JSON number or a numeric string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ExternalUserId {
    Number(i64),
    Text(String),
}

impl ExternalUserId {
    pub fn to_i64(&self) -> Result<i64, DomainError> {
        match self {
            ExternalUserId::Number(n) => Ok(*n),
            ExternalUserId::Text(s) => s
                .parse()
                .map_err(|_| DomainError::InvalidEvent(format!("non-numeric userId `{s}`"))),
        }
    }
}

/// Closed set of event kinds the pipeline materializes. Adding a variant
/// forces a decision at every match site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    UserCreated,
    UserLogin,
    UserUpdated,
}

impl EventKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "USER_CREATED" => Some(Self::UserCreated),
            "USER_LOGIN" => Some(Self::UserLogin),
            "USER_UPDATED" => Some(Self::UserUpdated),
            _ => None,
        }
    }
}
