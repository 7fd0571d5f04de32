use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use crate::config::DeliveryConfig;
use crate::digest::DigestMessage;
use crate::{Error, Result};

#[derive(Serialize)]
struct SendNewsletterRequest<'a> {
    content: &'a str,
    email: &'a str,
    subject: &'a str,
}

/// Client for the email-delivery endpoint
pub struct Mailer {
    client: Client,
    endpoint_url: String,
    api_key: Option<String>,
}

impl Mailer {
    pub fn new(config: &DeliveryConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint_url: config.endpoint_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Submit one digest. Any 2xx response counts as delivered.
    pub async fn send(&self, message: &DigestMessage) -> Result<()> {
        let email = message.email.as_ref();
        let body = SendNewsletterRequest {
            content: &message.content,
            email,
            subject: &message.subject,
        };

        let mut request = self.client.post(&self.endpoint_url).json(&body);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| Error::Delivery {
            email: email.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Delivery {
                email: email.to_string(),
                message: format!("delivery endpoint returned HTTP {}", status),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscriber::SubscriberEmail;
    use serde_json::json;
    use wiremock::matchers::{any, body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer, api_key: Option<&str>) -> DeliveryConfig {
        DeliveryConfig {
            endpoint_url: format!("{}/api/send-newsletter", server.uri()),
            api_key: api_key.map(str::to_string),
            request_timeout_secs: 1,
            ..DeliveryConfig::default()
        }
    }

    fn message() -> DigestMessage {
        DigestMessage {
            email: SubscriberEmail::parse("reader@example.com").unwrap(),
            subject: "Digest".to_string(),
            content: "<p>hello</p>".to_string(),
        }
    }

    #[tokio::test]
    async fn test_send_posts_expected_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/send-newsletter"))
            .and(header("Authorization", "Bearer key-123"))
            .and(body_json(json!({
                "content": "<p>hello</p>",
                "email": "reader@example.com",
                "subject": "Digest"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mailer = Mailer::new(&config(&server, Some("key-123"))).unwrap();
        mailer.send(&message()).await.unwrap();
    }

    #[tokio::test]
    async fn test_non_2xx_is_a_delivery_error() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let mailer = Mailer::new(&config(&server, None)).unwrap();
        let result = mailer.send(&message()).await;

        match result {
            Err(Error::Delivery { email, .. }) => assert_eq!(email, "reader@example.com"),
            other => panic!("expected delivery error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_is_a_delivery_error() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let mailer = Mailer::new(&config(&server, None)).unwrap();
        assert!(matches!(
            mailer.send(&message()).await,
            Err(Error::Delivery { .. })
        ));
    }
}
