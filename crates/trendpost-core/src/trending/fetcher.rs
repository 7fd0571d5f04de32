use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, Proxy};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use super::models::{FeedKind, TrendingFeed, TrendingItem};
use crate::config::FeedsConfig;
use crate::{Error, Result};

const MAX_FEED_BYTES: usize = 5 * 1024 * 1024;
const CLIENT_USER_AGENT: &str = concat!("trendpost/", env!("CARGO_PKG_VERSION"));

/// Keys under which trending proxies wrap their item arrays
const WRAPPER_KEYS: &[&str] = &["items", "data", "repositories", "papers", "models"];

/// HTTP client for the upstream trending endpoints
pub struct TrendingFetcher {
    client: Client,
}

impl TrendingFetcher {
    pub fn new(config: &FeedsConfig) -> Result<Self> {
        let client = Self::build_client(config.request_timeout_secs, &config.proxy_url)?;
        Ok(Self { client })
    }

    /// Build HTTP client with optional proxy
    fn build_client(timeout_secs: u64, proxy_url: &Option<String>) -> Result<Client> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));

        let mut builder = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .default_headers(headers)
            .gzip(true)
            .redirect(reqwest::redirect::Policy::limited(10));

        if let Some(ref proxy) = proxy_url {
            let proxy =
                Proxy::all(proxy).map_err(|e| Error::Config(format!("Invalid proxy URL: {}", e)))?;
            builder = builder.proxy(proxy);
            tracing::info!("Using HTTP proxy for trending feeds");
        }

        builder.build().map_err(Error::Http)
    }

    /// Fetch every usable item from `url`, in provider order
    pub async fn fetch(&self, url: &str) -> Result<Vec<TrendingItem>> {
        Url::parse(url)?;

        tracing::debug!("Fetching trending feed from: {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Feed(format!("HTTP {} for URL: {}", status, url)));
        }

        let body = response.bytes().await?;
        if body.len() > MAX_FEED_BYTES {
            return Err(Error::Feed(format!(
                "Feed too large ({} bytes) for URL: {}",
                body.len(),
                url
            )));
        }

        let value: Value = serde_json::from_slice(&body)?;
        let entries = Self::unwrap_items(value)
            .ok_or_else(|| Error::Feed(format!("Expected a JSON array of items from URL: {}", url)))?;

        let total = entries.len();
        let items: Vec<TrendingItem> = entries
            .into_iter()
            .filter_map(TrendingItem::from_value)
            .collect();

        if items.len() < total {
            tracing::debug!(
                "Dropped {} of {} items without a name or url from {}",
                total - items.len(),
                total,
                url
            );
        }

        Ok(items)
    }

    /// Accept a bare array, or an object wrapping one under a well-known key
    fn unwrap_items(value: Value) -> Option<Vec<Value>> {
        match value {
            Value::Array(items) => Some(items),
            Value::Object(mut map) => WRAPPER_KEYS.iter().find_map(|key| match map.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            }),
            _ => None,
        }
    }

    /// Fetch a feed and keep the first `limit` items
    pub async fn fetch_top(&self, kind: FeedKind, url: &str, limit: usize) -> Result<TrendingFeed> {
        let items = self.fetch(url).await?;
        tracing::info!("Fetched {} {} items from {}", items.len(), kind, url);
        Ok(TrendingFeed::new(kind, items, limit))
    }

    /// Fetch both digest feeds concurrently; fails if either fails
    pub async fn fetch_digest_feeds(&self, config: &FeedsConfig) -> Result<(TrendingFeed, TrendingFeed)> {
        tokio::try_join!(
            self.fetch_top(FeedKind::Papers, &config.papers_url, config.top_n),
            self.fetch_top(FeedKind::Repositories, &config.repos_url, config.top_n),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn feeds_config(server: &MockServer) -> FeedsConfig {
        FeedsConfig {
            papers_url: format!("{}/papers", server.uri()),
            repos_url: format!("{}/repos", server.uri()),
            request_timeout_secs: 5,
            ..FeedsConfig::default()
        }
    }

    fn repos(n: usize) -> Value {
        Value::Array(
            (0..n)
                .map(|i| {
                    json!({
                        "name": format!("org/repo-{}", i),
                        "url": format!("https://github.com/org/repo-{}", i),
                        "stars": i * 10
                    })
                })
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_fetch_top_keeps_first_items_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(repos(8)))
            .mount(&server)
            .await;

        let config = feeds_config(&server);
        let fetcher = TrendingFetcher::new(&config).unwrap();
        let feed = fetcher
            .fetch_top(FeedKind::Repositories, &config.repos_url, 5)
            .await
            .unwrap();

        let names: Vec<_> = feed.items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["org/repo-0", "org/repo-1", "org/repo-2", "org/repo-3", "org/repo-4"]
        );
    }

    #[tokio::test]
    async fn test_wrapped_array_is_accepted() {
        let server = MockServer::start().await;
        Mock::given(path("/papers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": repos(2) })))
            .mount(&server)
            .await;

        let config = feeds_config(&server);
        let fetcher = TrendingFetcher::new(&config).unwrap();
        let items = fetcher.fetch(&config.papers_url).await.unwrap();
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(path("/papers"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let config = feeds_config(&server);
        let fetcher = TrendingFetcher::new(&config).unwrap();
        let result = fetcher.fetch(&config.papers_url).await;
        assert!(matches!(result, Err(Error::Feed(_))));
    }

    #[tokio::test]
    async fn test_non_array_body_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(path("/papers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "rate limited" })))
            .mount(&server)
            .await;

        let config = feeds_config(&server);
        let fetcher = TrendingFetcher::new(&config).unwrap();
        assert!(fetcher.fetch(&config.papers_url).await.is_err());
    }

    #[tokio::test]
    async fn test_digest_feeds_fail_when_one_feed_fails() {
        let server = MockServer::start().await;
        Mock::given(path("/papers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(repos(3)))
            .mount(&server)
            .await;
        Mock::given(path("/repos"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let config = feeds_config(&server);
        let fetcher = TrendingFetcher::new(&config).unwrap();
        assert!(fetcher.fetch_digest_feeds(&config).await.is_err());
    }
}
