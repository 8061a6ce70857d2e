use async_trait::async_trait;
use uuid::Uuid;

use super::model::{NewPost, Post, PostPatch};
use crate::store::{PgStore, RecordStore, StoreError};

#[async_trait]
impl RecordStore<Post> for PgStore {
    async fn find_by_key(&self, slug: &String) -> Result<Option<Post>, StoreError> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, slug, title, image, created_at, updated_at
            FROM posts
            WHERE slug = $1
            "#,
        )
        .bind(slug)
        .fetch_optional(self.pool())
        .await?;
        Ok(post)
    }

    async fn insert(&self, draft: NewPost) -> Result<Post, StoreError> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (id, slug, title, image)
            VALUES ($1, $2, $3, $4)
            RETURNING id, slug, title, image, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&draft.slug)
        .bind(&draft.title)
        .bind(&draft.image)
        .fetch_one(self.pool())
        .await?;
        Ok(post)
    }

    async fn update_by_key(&self, slug: &String, patch: &PostPatch) -> Result<Post, StoreError> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            UPDATE posts
               SET title = COALESCE($2, title),
                   image = COALESCE($3, image),
                   updated_at = now()
             WHERE slug = $1
            RETURNING id, slug, title, image, created_at, updated_at
            "#,
        )
        .bind(slug)
        .bind(&patch.title)
        .bind(&patch.image)
        .fetch_optional(self.pool())
        .await?;
        post.ok_or_else(|| StoreError::NotFound {
            kind: "post",
            key: slug.clone(),
        })
    }
}
