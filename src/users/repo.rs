use async_trait::async_trait;
use uuid::Uuid;

use super::model::{NewUser, User, UserPatch};
use crate::store::{PgStore, RecordStore, StoreError};

#[async_trait]
impl RecordStore<User> for PgStore {
    /// Find a user by email.
    async fn find_by_key(&self, email: &String) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, password_hash, role, email_verified, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(self.pool())
        .await?;
        Ok(user)
    }

    /// Create a new user; the password arrives already hashed.
    async fn insert(&self, draft: NewUser) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, name, password_hash, role, email_verified)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, email, name, password_hash, role, email_verified, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&draft.email)
        .bind(&draft.name)
        .bind(&draft.password_hash)
        .bind(draft.role)
        .bind(draft.email_verified)
        .fetch_one(self.pool())
        .await?;
        Ok(user)
    }

    /// Patch role, name and verification in place. Columns not named in the
    /// patch keep their stored values.
    async fn update_by_key(&self, email: &String, patch: &UserPatch) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
               SET name = COALESCE($2, name),
                   role = COALESCE($3, role),
                   email_verified = CASE WHEN $4 THEN COALESCE(email_verified, now())
                                         ELSE email_verified END,
                   updated_at = now()
             WHERE email = $1
            RETURNING id, email, name, password_hash, role, email_verified, created_at, updated_at
            "#,
        )
        .bind(email)
        .bind(&patch.name)
        .bind(patch.role)
        .bind(patch.mark_verified)
        .fetch_optional(self.pool())
        .await?;
        user.ok_or_else(|| StoreError::NotFound {
            kind: "user",
            key: email.clone(),
        })
    }
}
