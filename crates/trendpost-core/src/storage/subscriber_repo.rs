use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::Database;
use crate::subscriber::{generate_unsubscribe_token, NewSubscriber, Subscriber, SubscriberEmail};
use crate::{Error, Result};

/// Repository for subscriber CRUD operations
pub struct SubscriberRepository<'a> {
    db: &'a Database,
}

#[derive(FromRow)]
struct SubscriberRow {
    id: String,
    email: String,
    is_active: bool,
    unsubscribe_token: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriberRow> for Subscriber {
    type Error = Error;

    fn try_from(row: SubscriberRow) -> Result<Self> {
        Ok(Subscriber {
            id: Uuid::parse_str(&row.id).unwrap_or_default(),
            email: SubscriberEmail::parse(&row.email)?,
            is_active: row.is_active,
            unsubscribe_token: row.unsubscribe_token,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Convert rows, skipping any whose stored email no longer parses
fn collect_valid(rows: Vec<SubscriberRow>) -> Vec<Subscriber> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.id.clone();
            match Subscriber::try_from(row) {
                Ok(subscriber) => Some(subscriber),
                Err(e) => {
                    tracing::warn!(subscriber_id = %id, "Skipping stored subscriber: {}", e);
                    None
                }
            }
        })
        .collect()
}

/// Emails are stored lowercased; lookups fold the same way
fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}

impl<'a> SubscriberRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Create an active subscriber with a fresh unsubscribe token
    pub async fn create(&self, new_subscriber: &NewSubscriber) -> Result<Subscriber> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO subscribers (id, email, is_active, unsubscribe_token, created_at, updated_at)
            VALUES (?, ?, 1, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(new_subscriber.email.as_ref())
        .bind(generate_unsubscribe_token())
        .bind(now)
        .bind(now)
        .execute(self.db.pool())
        .await;

        if let Err(err) = result {
            if is_unique_violation(&err) {
                return Err(Error::DuplicateSubscriber(new_subscriber.email.to_string()));
            }
            return Err(err.into());
        }

        self.find_by_email(new_subscriber.email.as_ref())
            .await?
            .ok_or_else(|| Error::SubscriberNotFound(new_subscriber.email.to_string()))
    }

    /// Find a subscriber by email
    pub async fn find_by_email(&self, email: &str) -> Result<Option<Subscriber>> {
        let row: Option<SubscriberRow> = sqlx::query_as(
            r#"
            SELECT id, email, is_active, unsubscribe_token, created_at, updated_at
            FROM subscribers
            WHERE email = ?
            "#,
        )
        .bind(email_key(email))
        .fetch_optional(self.db.pool())
        .await?;

        row.map(Subscriber::try_from).transpose()
    }

    /// Find a subscriber by unsubscribe token
    pub async fn find_by_token(&self, token: &str) -> Result<Option<Subscriber>> {
        let row: Option<SubscriberRow> = sqlx::query_as(
            r#"
            SELECT id, email, is_active, unsubscribe_token, created_at, updated_at
            FROM subscribers
            WHERE unsubscribe_token = ?
            "#,
        )
        .bind(token)
        .fetch_optional(self.db.pool())
        .await?;

        row.map(Subscriber::try_from).transpose()
    }

    /// Get all subscribers, active or not
    pub async fn list_all(&self) -> Result<Vec<Subscriber>> {
        let rows: Vec<SubscriberRow> = sqlx::query_as(
            r#"
            SELECT id, email, is_active, unsubscribe_token, created_at, updated_at
            FROM subscribers
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(self.db.pool())
        .await?;

        Ok(collect_valid(rows))
    }

    /// Get subscribers whose `is_active` flag is set
    pub async fn list_active(&self) -> Result<Vec<Subscriber>> {
        let rows: Vec<SubscriberRow> = sqlx::query_as(
            r#"
            SELECT id, email, is_active, unsubscribe_token, created_at, updated_at
            FROM subscribers
            WHERE is_active = 1
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(self.db.pool())
        .await?;

        Ok(collect_valid(rows))
    }

    /// Count active subscribers
    pub async fn count_active(&self) -> Result<usize> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM subscribers WHERE is_active = 1")
            .fetch_one(self.db.pool())
            .await?;

        usize::try_from(count.0)
            .map_err(|_| Error::Other(format!("Invalid subscriber count: {}", count.0)))
    }

    /// Deactivate the subscriber holding `token`
    pub async fn unsubscribe_by_token(&self, token: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE subscribers
            SET is_active = 0,
                updated_at = ?
            WHERE unsubscribe_token = ? AND is_active = 1
            "#,
        )
        .bind(Utc::now())
        .bind(token)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Toggle the active flag of a subscriber
    pub async fn set_active(&self, email: &str, active: bool) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE subscribers
            SET is_active = ?,
                updated_at = ?
            WHERE email = ?
            "#,
        )
        .bind(active)
        .bind(Utc::now())
        .bind(email_key(email))
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove a subscriber entirely
    pub async fn delete(&self, email: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM subscribers WHERE email = ?")
            .bind(email_key(email))
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
