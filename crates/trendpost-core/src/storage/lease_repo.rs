use chrono::Utc;
use std::time::Duration;

use super::Database;
use crate::Result;

/// Named, expiring leases shared by every process using the same database
pub struct LeaseRepository<'a> {
    db: &'a Database,
}

impl<'a> LeaseRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Take `name` for `holder` unless another holder has an unexpired lease.
    /// Re-acquiring an expired lease replaces its holder.
    pub async fn try_acquire(&self, name: &str, holder: &str, ttl: Duration) -> Result<bool> {
        let now = Utc::now().timestamp_millis();
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at = now.saturating_add(ttl_ms);

        let result = sqlx::query(
            r#"
            INSERT INTO leases (name, holder, expires_at)
            VALUES (?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                holder = excluded.holder,
                expires_at = excluded.expires_at
            WHERE leases.expires_at <= ?
            "#,
        )
        .bind(name)
        .bind(holder)
        .bind(expires_at)
        .bind(now)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Give up `name` if `holder` still owns it
    pub async fn release(&self, name: &str, holder: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM leases WHERE name = ? AND holder = ?")
            .bind(name)
            .bind(holder)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_lease_excludes_other_holders_until_released() {
        let db = Database::new_in_memory().await.unwrap();
        let repo = LeaseRepository::new(&db);

        assert!(repo.try_acquire("digest", "daemon", TTL).await.unwrap());
        assert!(!repo.try_acquire("digest", "send-now", TTL).await.unwrap());
        // Another holder cannot drop someone else's lease
        assert!(!repo.release("digest", "send-now").await.unwrap());

        assert!(repo.release("digest", "daemon").await.unwrap());
        assert!(repo.try_acquire("digest", "send-now", TTL).await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_lease_can_be_taken_over() {
        let db = Database::new_in_memory().await.unwrap();
        let repo = LeaseRepository::new(&db);

        assert!(repo.try_acquire("digest", "crashed", Duration::ZERO).await.unwrap());
        assert!(repo.try_acquire("digest", "daemon", TTL).await.unwrap());
        assert!(!repo.release("digest", "crashed").await.unwrap());
    }

    #[tokio::test]
    async fn test_leases_are_independent_by_name() {
        let db = Database::new_in_memory().await.unwrap();
        let repo = LeaseRepository::new(&db);

        assert!(repo.try_acquire("digest", "a", TTL).await.unwrap());
        assert!(repo.try_acquire("other", "b", TTL).await.unwrap());
    }
}
