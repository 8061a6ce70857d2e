use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use super::model::{Post, PostPatch};
use crate::store::{RecordStore, StoreError};

/// One `{ "slug": ..., "image": ... }` entry of a backfill manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageAssignment {
    pub slug: String,
    pub image: String,
}

#[derive(Debug, Clone)]
pub enum BackfillOutcome {
    Patched(Post),
    /// No post carries the slug; nothing was written.
    Missing(String),
}

#[derive(Debug, thiserror::Error)]
pub enum BackfillError {
    #[error("image path `{0}` must be a site-relative URL such as /images/blog/cover.png")]
    InvalidPath(String),
    #[error("image `{image}` not found under {}", .root.display())]
    MissingAsset { image: String, root: PathBuf },
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub fn validate_image_path(image: &str) -> Result<(), BackfillError> {
    let ok = image.starts_with('/')
        && !image.starts_with("//")
        && !image.contains("://")
        && !image.contains('\\')
        && !image.chars().any(char::is_whitespace)
        && image.split('/').all(|seg| seg != "..")
        && image.len() > 1;
    if ok {
        Ok(())
    } else {
        Err(BackfillError::InvalidPath(image.to_string()))
    }
}

async fn ensure_asset_exists(image: &str, root: &Path) -> Result<(), BackfillError> {
    let file = root.join(image.trim_start_matches('/'));
    match tokio::fs::metadata(&file).await {
        Ok(meta) if meta.is_file() => Ok(()),
        _ => Err(BackfillError::MissingAsset {
            image: image.to_string(),
            root: root.to_path_buf(),
        }),
    }
}

/// Point an existing post at a featured image. Posts are located by slug and
/// never created here.
#[instrument(skip(store, static_root), fields(slug = %assignment.slug))]
pub async fn assign_image<S>(
    store: &S,
    assignment: &ImageAssignment,
    static_root: Option<&Path>,
) -> Result<BackfillOutcome, BackfillError>
where
    S: RecordStore<Post> + ?Sized,
{
    validate_image_path(&assignment.image)?;
    if let Some(root) = static_root {
        ensure_asset_exists(&assignment.image, root).await?;
    }

    if store.find_by_key(&assignment.slug).await?.is_none() {
        warn!("no post with that slug");
        return Ok(BackfillOutcome::Missing(assignment.slug.clone()));
    }

    let patch = PostPatch {
        image: Some(assignment.image.clone()),
        ..Default::default()
    };
    let post = store.update_by_key(&assignment.slug, &patch).await?;
    info!(post_id = %post.id, image = %assignment.image, "featured image assigned");
    Ok(BackfillOutcome::Patched(post))
}

/// Apply a whole manifest. Every path (and asset, with a static root) is
/// checked before the first write, so a bad entry leaves storage untouched.
pub async fn assign_images<S>(
    store: &S,
    entries: &[ImageAssignment],
    static_root: Option<&Path>,
) -> Result<Vec<BackfillOutcome>, BackfillError>
where
    S: RecordStore<Post> + ?Sized,
{
    for entry in entries {
        validate_image_path(&entry.image)?;
        if let Some(root) = static_root {
            ensure_asset_exists(&entry.image, root).await?;
        }
    }

    let mut outcomes = Vec::with_capacity(entries.len());
    for entry in entries {
        outcomes.push(assign_image(store, entry, static_root).await?);
    }
    Ok(outcomes)
}

pub async fn load_manifest(path: &Path) -> anyhow::Result<Vec<ImageAssignment>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("read manifest {}", path.display()))?;
    let entries: Vec<ImageAssignment> = serde_json::from_str(&raw)
        .with_context(|| format!("parse manifest {}", path.display()))?;
    Ok(entries)
}
