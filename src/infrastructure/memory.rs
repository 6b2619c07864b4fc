use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::{
    domain::user::{InsertOutcome, NewUserRecord, UserRecord, UserStore, UserUpdate},
    shared::errors::DomainError,
};

/// In-memory `UserStore` used by the unit tests. The single lock stands in
/// for the database's atomicity: the uniqueness check and the insert happen
/// under one critical section, matching the conditional-insert contract.
#[derive(Default)]
pub struct InMemoryUserStore {
    records: Mutex<Vec<UserRecord>>,
    next_id: Mutex<i64>,
}

impl InMemoryUserStore {
    pub async fn records(&self) -> Vec<UserRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert_if_absent(&self, record: NewUserRecord) -> Result<InsertOutcome, DomainError> {
        let mut records = self.records.lock().await;
        let exists = records
            .iter()
            .any(|r| r.email == record.email || r.username == record.username);
        if exists {
            return Ok(InsertOutcome::AlreadyExists);
        }

        let mut next_id = self.next_id.lock().await;
        *next_id += 1;
        let now = Utc::now();
        records.push(UserRecord {
            id: *next_id,
            external_user_id: record.external_user_id,
            fullname: record.fullname,
            username: record.username,
            email: record.email,
            phone: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        });

        Ok(InsertOutcome::Inserted)
    }

    async fn update_by_email(&self, email: &str, update: UserUpdate) -> Result<u64, DomainError> {
        let mut records = self.records.lock().await;
        match records.iter_mut().find(|r| r.email == email) {
            Some(record) => {
                record.fullname = update.fullname;
                record.username = update.username;
                record.updated_at = Utc::now();
                Ok(1)
            }
            None => Ok(0),
        }
    }
}
