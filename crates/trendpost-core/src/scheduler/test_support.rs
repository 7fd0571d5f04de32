use chrono::Utc;
use uuid::Uuid;
use wiremock::MockServer;

use crate::config::{AppConfig, DeliveryConfig, FeedsConfig};
use crate::storage::SubscriberStore;
use crate::subscriber::{Subscriber, SubscriberEmail};
use crate::{Error, Result};

/// Store returning a fixed snapshot
pub struct StaticStore(pub Vec<Subscriber>);

#[async_trait::async_trait]
impl SubscriberStore for StaticStore {
    async fn active_subscribers(&self) -> Result<Vec<Subscriber>> {
        Ok(self.0.clone())
    }
}

/// Store that is always unreachable
pub struct FailingStore;

#[async_trait::async_trait]
impl SubscriberStore for FailingStore {
    async fn active_subscribers(&self) -> Result<Vec<Subscriber>> {
        Err(Error::Other("subscriber store unreachable".to_string()))
    }
}

pub fn subscriber(email: &str, token: &str, is_active: bool) -> Subscriber {
    let now = Utc::now();
    Subscriber {
        id: Uuid::new_v4(),
        email: SubscriberEmail::parse(email).unwrap(),
        is_active,
        unsubscribe_token: token.to_string(),
        created_at: now,
        updated_at: now,
    }
}

pub fn test_config(feeds: &MockServer, mail: &MockServer) -> AppConfig {
    AppConfig {
        feeds: FeedsConfig {
            papers_url: format!("{}/papers", feeds.uri()),
            repos_url: format!("{}/repos", feeds.uri()),
            request_timeout_secs: 5,
            ..FeedsConfig::default()
        },
        delivery: DeliveryConfig {
            endpoint_url: format!("{}/api/send-newsletter", mail.uri()),
            unsubscribe_base_url: "http://localhost:4000/unsubscribe".to_string(),
            request_timeout_secs: 5,
            ..DeliveryConfig::default()
        },
        ..AppConfig::default()
    }
}
