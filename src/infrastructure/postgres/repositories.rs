use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    domain::user::{InsertOutcome, NewUserRecord, UserStore, UserUpdate},
    shared::errors::DomainError,
};

pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    /// Single-statement conditional insert. `ON CONFLICT DO NOTHING` covers
    /// both unique keys (`email`, `username`), so two partitions racing on
    /// the same event resolve to exactly one row without a read first.
    async fn insert_if_absent(&self, record: NewUserRecord) -> Result<InsertOutcome, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (external_user_id, fullname, username, email, phone, is_active)
            VALUES ($1, $2, $3, $4, NULL, TRUE)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(record.external_user_id)
        .bind(&record.fullname)
        .bind(&record.username)
        .bind(&record.email)
        .execute(&self.pool)
        .await?;

        Ok(if result.rows_affected() == 0 {
            InsertOutcome::AlreadyExists
        } else {
            InsertOutcome::Inserted
        })
    }

    async fn update_by_email(&self, email: &str, update: UserUpdate) -> Result<u64, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET fullname = $1,
                username = $2,
                updated_at = now()
            WHERE email = $3
            "#,
        )
        .bind(&update.fullname)
        .bind(&update.username)
        .bind(email)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
