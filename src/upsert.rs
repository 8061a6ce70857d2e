use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::store::{Record, RecordStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    Created,
    Updated,
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disposition::Created => f.write_str("created"),
            Disposition::Updated => f.write_str("updated"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Upserted<R> {
    pub disposition: Disposition,
    pub record: R,
}

/// Make sure a record exists under `key`.
///
/// An existing record gets `patch` applied and nothing else touched. A
/// missing one is built from `create`, which only runs on that branch, so
/// derived values such as password hashes are computed fresh per creation.
/// Each call performs exactly one write.
pub async fn upsert<R, S, F, E>(
    store: &S,
    key: &R::Key,
    patch: &R::Patch,
    create: F,
) -> Result<Upserted<R>, E>
where
    R: Record,
    S: RecordStore<R> + ?Sized,
    F: FnOnce() -> Result<R::Draft, E> + Send,
    E: From<StoreError>,
{
    match store.find_by_key(key).await? {
        Some(_) => {
            let record = store.update_by_key(key, patch).await?;
            debug!(kind = R::KIND, %key, "upsert took update branch");
            Ok(Upserted {
                disposition: Disposition::Updated,
                record,
            })
        }
        None => {
            let draft = create()?;
            let record = store.insert(draft).await?;
            debug!(kind = R::KIND, %key, "upsert took create branch");
            Ok(Upserted {
                disposition: Disposition::Created,
                record,
            })
        }
    }
}
