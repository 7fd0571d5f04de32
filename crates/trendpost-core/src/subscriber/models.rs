use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{Error, Result};

/// A validated subscriber email address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubscriberEmail(String);

impl SubscriberEmail {
    /// Parse an address: non-empty local and domain parts around a single `@`, no whitespace.
    /// Addresses are stored lowercased so one mailbox maps to one subscriber.
    pub fn parse(input: &str) -> Result<Self> {
        let email = input.trim();

        let valid = match email.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && !domain.is_empty()
                    && !domain.contains('@')
                    && !email.chars().any(char::is_whitespace)
            }
            None => false,
        };

        if !valid {
            return Err(Error::InvalidEmail(input.to_string()));
        }

        Ok(Self(email.to_lowercase()))
    }
}

impl AsRef<str> for SubscriberEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriberEmail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SubscriberEmail {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<SubscriberEmail> for String {
    fn from(email: SubscriberEmail) -> Self {
        email.0
    }
}

/// A digest subscriber as stored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: Uuid,
    pub email: SubscriberEmail,
    pub is_active: bool,
    /// Opaque per-subscriber token carried by the unsubscribe link
    pub unsubscribe_token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data required to create a new subscriber
#[derive(Debug, Clone)]
pub struct NewSubscriber {
    pub email: SubscriberEmail,
}

impl NewSubscriber {
    pub fn parse(email: &str) -> Result<Self> {
        Ok(Self {
            email: SubscriberEmail::parse(email)?,
        })
    }
}

/// Generate a fresh URL-safe unsubscribe token
pub fn generate_unsubscribe_token() -> String {
    Uuid::new_v4().simple().to_string()
}
