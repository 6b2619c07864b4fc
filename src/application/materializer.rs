use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    domain::{
        events::EventPayload,
        user::{InsertOutcome, NewUserRecord, UserStore, UserUpdate},
    },
    shared::errors::DomainError,
};

/// Applies decoded events to the user-record store. Every operation is
/// idempotent: replaying the same event any number of times, in any
/// interleaving across partitions, leaves the store in the same state.
pub struct Materializer {
    store: Arc<dyn UserStore>,
}

impl Materializer {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// `USER_CREATED`: conditional insert keyed by `email`. A record that
    /// already exists is left untouched.
    pub async fn on_created(&self, payload: &EventPayload) -> Result<InsertOutcome, DomainError> {
        let record = NewUserRecord {
            external_user_id: payload.user_id.to_i64()?,
            fullname: payload.fullname.clone(),
            username: payload.username.clone(),
            email: payload.email.clone(),
        };

        let outcome = self.store.insert_if_absent(record).await?;
        match outcome {
            InsertOutcome::Inserted => info!(email = %payload.email, "user record created"),
            InsertOutcome::AlreadyExists => {
                debug!(email = %payload.email, "user record already exists, skipping")
            }
        }

        Ok(outcome)
    }

    /// `USER_UPDATED`: conditional update by `email`. An unknown email
    /// affects zero rows, which is a valid no-op.
    pub async fn on_updated(&self, payload: &EventPayload) -> Result<u64, DomainError> {
        let update = UserUpdate {
            fullname: payload.fullname.clone(),
            username: payload.username.clone(),
        };

        let affected = self.store.update_by_email(&payload.email, update).await?;
        if affected == 0 {
            debug!(email = %payload.email, "no matching user record for update");
        } else {
            info!(email = %payload.email, "user record updated");
        }

        Ok(affected)
    }

    /// `USER_LOGIN`: observation only. Reserved for login tracking; must
    /// not touch the store.
    pub async fn on_login(&self, payload: &EventPayload) {
        debug!(email = %payload.email, login_at = ?payload.login_at, "user login observed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::ExternalUserId;
    use crate::infrastructure::memory::InMemoryUserStore;

    fn payload(email: &str, username: &str) -> EventPayload {
        EventPayload {
            user_id: ExternalUserId::Number(42),
            fullname: "Jane Doe".to_string(),
            email: email.to_string(),
            username: username.to_string(),
            created_at: None,
            login_at: None,
        }
    }

    #[tokio::test]
    async fn create_is_idempotent_under_replay() {
        let store = Arc::new(InMemoryUserStore::default());
        let materializer = Materializer::new(store.clone());

        let first = materializer
            .on_created(&payload("jane@x.com", "janed"))
            .await
            .unwrap();
        assert_eq!(first, InsertOutcome::Inserted);

        for _ in 0..5 {
            let replay = materializer
                .on_created(&payload("jane@x.com", "janed"))
                .await
                .unwrap();
            assert_eq!(replay, InsertOutcome::AlreadyExists);
        }

        let records = store.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].external_user_id, 42);
        assert!(records[0].is_active);
    }

    #[tokio::test]
    async fn create_never_duplicates_username() {
        let store = Arc::new(InMemoryUserStore::default());
        let materializer = Materializer::new(store.clone());

        materializer
            .on_created(&payload("jane@x.com", "janed"))
            .await
            .unwrap();
        let second = materializer
            .on_created(&payload("other@x.com", "janed"))
            .await
            .unwrap();

        assert_eq!(second, InsertOutcome::AlreadyExists);
        assert_eq!(store.records().await.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_duplicate_creates_resolve_to_one_record() {
        let store = Arc::new(InMemoryUserStore::default());
        let materializer = Arc::new(Materializer::new(store.clone()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let m = materializer.clone();
            handles.push(tokio::spawn(async move {
                m.on_created(&payload("jane@x.com", "janed")).await
            }));
        }

        let mut inserted = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() == InsertOutcome::Inserted {
                inserted += 1;
            }
        }

        assert_eq!(inserted, 1);
        assert_eq!(store.records().await.len(), 1);
    }

    #[tokio::test]
    async fn update_for_absent_email_is_a_noop() {
        let store = Arc::new(InMemoryUserStore::default());
        let materializer = Materializer::new(store.clone());

        let affected = materializer
            .on_updated(&payload("ghost@x.com", "ghost"))
            .await
            .unwrap();

        assert_eq!(affected, 0);
        assert!(store.records().await.is_empty());
    }

    #[tokio::test]
    async fn update_rewrites_fullname_and_username() {
        let store = Arc::new(InMemoryUserStore::default());
        let materializer = Materializer::new(store.clone());

        materializer
            .on_created(&payload("jane@x.com", "janed"))
            .await
            .unwrap();

        let mut changed = payload("jane@x.com", "janed2");
        changed.fullname = "Jane D.".to_string();
        let affected = materializer.on_updated(&changed).await.unwrap();

        assert_eq!(affected, 1);
        let records = store.records().await;
        assert_eq!(records[0].fullname, "Jane D.");
        assert_eq!(records[0].username, "janed2");
    }

    #[tokio::test]
    async fn login_does_not_mutate_the_store() {
        let store = Arc::new(InMemoryUserStore::default());
        let materializer = Materializer::new(store.clone());

        materializer
            .on_created(&payload("jane@x.com", "janed"))
            .await
            .unwrap();
        let before = store.records().await;

        materializer.on_login(&payload("jane@x.com", "janed")).await;

        let after = store.records().await;
        assert_eq!(before.len(), after.len());
        assert_eq!(before[0].fullname, after[0].fullname);
        assert_eq!(before[0].username, after[0].username);
    }

    #[tokio::test]
    async fn non_numeric_user_id_is_rejected_without_mutation() {
        let store = Arc::new(InMemoryUserStore::default());
        let materializer = Materializer::new(store.clone());

        let mut bad = payload("jane@x.com", "janed");
        bad.user_id = ExternalUserId::Text("not-a-number".to_string());

        let err = materializer.on_created(&bad).await.unwrap_err();
        assert!(!err.is_retryable());
        assert!(store.records().await.is_empty());
    }
}
