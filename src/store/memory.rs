use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use super::{Record, RecordStore, StoreError};

/// In-process store keyed by natural key. Mirrors the unique constraint of
/// the real schema and can be flipped into an unreachable state.
pub struct MemoryStore<R: Record> {
    records: RwLock<HashMap<R::Key, R>>,
    unavailable: AtomicBool,
    writes: AtomicUsize,
}

impl<R: Record> Default for MemoryStore<R> {
    fn default() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            unavailable: AtomicBool::new(false),
            writes: AtomicUsize::new(0),
        }
    }
}

impl<R: Record> MemoryStore<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = R>) -> Self {
        let map = records
            .into_iter()
            .map(|r| (r.key().clone(), r))
            .collect::<HashMap<_, _>>();
        Self {
            records: RwLock::new(map),
            ..Self::default()
        }
    }

    /// Simulate a lost connection: every call fails with `Unavailable`.
    pub fn set_unavailable(&self, down: bool) {
        self.unavailable.store(down, Ordering::SeqCst);
    }

    /// Number of successful inserts and updates so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    pub async fn get(&self, key: &R::Key) -> Option<R> {
        self.records.read().await.get(key).cloned()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl<R: Record> RecordStore<R> for MemoryStore<R> {
    async fn find_by_key(&self, key: &R::Key) -> Result<Option<R>, StoreError> {
        self.check()?;
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn insert(&self, draft: R::Draft) -> Result<R, StoreError> {
        self.check()?;
        let record = R::from_draft(draft, OffsetDateTime::now_utc());
        let mut records = self.records.write().await;
        if records.contains_key(record.key()) {
            return Err(StoreError::Conflict(format!(
                "{} `{}` already exists",
                R::KIND,
                record.key()
            )));
        }
        records.insert(record.key().clone(), record.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(record)
    }

    async fn update_by_key(&self, key: &R::Key, patch: &R::Patch) -> Result<R, StoreError> {
        self.check()?;
        let mut records = self.records.write().await;
        let record = records.get_mut(key).ok_or_else(|| StoreError::NotFound {
            kind: R::KIND,
            key: key.to_string(),
        })?;
        record.apply(patch, OffsetDateTime::now_utc());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::posts::{NewPost, Post, PostPatch};

    fn draft(slug: &str) -> NewPost {
        NewPost {
            slug: slug.into(),
            title: "Hiring in 2024".into(),
            image: None,
        }
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_key() {
        let store = MemoryStore::<Post>::new();
        store.insert(draft("hiring")).await.expect("first insert");
        let err = store.insert(draft("hiring")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.len().await, 1);
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn update_missing_key_is_not_found() {
        let store = MemoryStore::<Post>::new();
        let patch = PostPatch {
            image: Some("/images/a.png".into()),
            ..Default::default()
        };
        let err = store.update_by_key(&"nope".to_string(), &patch).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { kind: "post", .. }));
    }

    #[tokio::test]
    async fn offline_store_fails_every_call() {
        let store = MemoryStore::<Post>::new();
        store.set_unavailable(true);
        let err = store.find_by_key(&"hiring".to_string()).await.unwrap_err();
        assert!(err.is_unavailable());
        store.set_unavailable(false);
        assert!(store.find_by_key(&"hiring".to_string()).await.unwrap().is_none());
    }
}
