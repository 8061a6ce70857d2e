use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::store::Record;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Post {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub image: Option<String>, // featured image, site-relative URL
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub slug: String,
    pub title: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostPatch {
    pub title: Option<String>,
    pub image: Option<String>,
}

impl Record for Post {
    type Key = String;
    type Draft = NewPost;
    type Patch = PostPatch;

    const KIND: &'static str = "post";

    fn key(&self) -> &String {
        &self.slug
    }

    fn from_draft(draft: NewPost, now: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            slug: draft.slug,
            title: draft.title,
            image: draft.image,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply(&mut self, patch: &PostPatch, now: OffsetDateTime) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(image) = &patch.image {
            self.image = Some(image.clone());
        }
        self.updated_at = now;
    }
}
