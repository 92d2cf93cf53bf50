//! # Token Repository
//!
//! Deny-list of session tokens ended by logout. A token is identified by
//! its `jti` claim and only needs to be remembered until it would expire on
//! its own; [`TokenRepository::purge_expired`] drops the rest.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

#[derive(Debug, Clone)]
pub struct TokenRepository {
    pool: SqlitePool,
}

impl TokenRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TokenRepository { pool }
    }

    /// Marks a token as revoked. Revoking twice is a no-op.
    pub async fn revoke(
        &self,
        jti: &str,
        user_id: Option<&str>,
        expires_at: DateTime<Utc>,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO revoked_tokens (jti, user_id, expires_at, revoked_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(jti) DO NOTHING
            "#,
        )
        .bind(jti)
        .bind(user_id)
        .bind(expires_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        debug!(jti = %jti, "Token revoked");
        Ok(())
    }

    pub async fn is_revoked(&self, jti: &str) -> DbResult<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM revoked_tokens WHERE jti = ?1")
            .bind(jti)
            .fetch_optional(&self.pool)
            .await?;

        Ok(found.is_some())
    }

    /// Removes entries whose token has expired by `now`. Returns how many
    /// were dropped.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < ?1")
            .bind(now)
            .execute(&self.pool)
            .await?;

        let purged = result.rows_affected();
        if purged > 0 {
            info!(purged, "Purged expired revoked tokens");
        }

        Ok(purged)
    }
}
