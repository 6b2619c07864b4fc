use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::shared::errors::DomainError;

/// Materialized user record as persisted in the store.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: i64,
    pub external_user_id: i64,
    pub fullname: String,
    pub username: String,
    pub email: String,
    pub phone: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUserRecord {
    pub external_user_id: i64,
    pub fullname: String,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub fullname: String,
    pub username: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyExists,
}

/// Store contract the pipeline writes through. Both operations must be
/// atomic on the store side: uniqueness of `email` and `username` is
/// enforced by the store, never by a read-then-write in the caller.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts the record unless a row already holds its `email` or
    /// `username`. Safe under concurrent duplicate attempts.
    async fn insert_if_absent(&self, record: NewUserRecord) -> Result<InsertOutcome, DomainError>;

    /// Updates `fullname` and `username` on the row matching `email`,
    /// returning the number of rows affected. Zero is a valid no-op.
    async fn update_by_email(&self, email: &str, update: UserUpdate) -> Result<u64, DomainError>;
}
