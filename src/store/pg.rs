use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

use super::StoreError;

/// PostgreSQL-backed store. Record-specific queries live next to each
/// entity (`users::repo`, `posts::repo`).
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        info!(max_connections, "database pool ready");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Drain and close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
