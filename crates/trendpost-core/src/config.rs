use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable pointing at an alternate config file
pub const CONFIG_PATH_ENV: &str = "TRENDPOST_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub feeds: FeedsConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Data directory path
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedsConfig {
    /// Trending papers / models endpoint (JSON array of items)
    #[serde(default = "default_papers_url")]
    pub papers_url: String,
    /// Trending repositories endpoint (JSON array of items)
    #[serde(default = "default_repos_url")]
    pub repos_url: String,
    /// Number of items per feed that make it into the digest
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    /// HTTP proxy URL for feed fetching (e.g., "http://127.0.0.1:7890" or "socks5://127.0.0.1:1080")
    #[serde(default)]
    pub proxy_url: Option<String>,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            papers_url: default_papers_url(),
            repos_url: default_repos_url(),
            top_n: default_top_n(),
            request_timeout_secs: default_timeout(),
            proxy_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Email delivery endpoint accepting `{content, email, subject}`
    #[serde(default = "default_delivery_url")]
    pub endpoint_url: String,
    /// Optional bearer token for the delivery endpoint
    #[serde(default)]
    pub api_key: Option<String>,
    /// Subject line of every digest
    #[serde(default = "default_subject")]
    pub subject: String,
    /// Base of the unsubscribe link; the subscriber token is appended as a path segment
    #[serde(default = "default_unsubscribe_base_url")]
    pub unsubscribe_base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            endpoint_url: default_delivery_url(),
            api_key: None,
            subject: default_subject(),
            unsubscribe_base_url: default_unsubscribe_base_url(),
            request_timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Digest interval in seconds (0 = disabled)
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    /// Dispatch once as soon as the daemon starts instead of waiting a full interval
    #[serde(default)]
    pub run_on_start: bool,
    /// How long a dispatch lease stays valid if its holder dies mid-tick
    #[serde(default = "default_lease_ttl")]
    pub lease_ttl_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            run_on_start: false,
            lease_ttl_secs: default_lease_ttl(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite connection string; defaults to `<data_dir>/trendpost.db`
    #[serde(default)]
    pub database_url: Option<String>,
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("trendpost")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_papers_url() -> String {
    "http://localhost:4000/api/papers".to_string()
}

fn default_repos_url() -> String {
    "http://localhost:4000/api/github/repos".to_string()
}

fn default_top_n() -> usize {
    5
}

fn default_timeout() -> u64 {
    30
}

fn default_delivery_url() -> String {
    "https://nine1mail.onrender.com/api/send-newsletter".to_string()
}

fn default_subject() -> String {
    "🔥 Daily AI Trends & Tools Update".to_string()
}

fn default_unsubscribe_base_url() -> String {
    "http://localhost:4000/unsubscribe".to_string()
}

fn default_interval() -> u64 {
    43200 // 12 hours
}

fn default_lease_ttl() -> u64 {
    21600
}

/// Expand tilde (~) in path to user's home directory
fn expand_tilde(path: &std::path::Path) -> PathBuf {
    if let Some(path_str) = path.to_str() {
        if let Some(stripped) = path_str.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(stripped);
            }
        } else if path_str == "~" {
            if let Some(home) = dirs::home_dir() {
                return home;
            }
        }
    }
    path.to_path_buf()
}

impl AppConfig {
    /// Load configuration from file (or defaults), then apply environment overrides
    pub fn load() -> crate::Result<Self> {
        let config_path = Self::config_path();

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))?
        } else {
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `TRENDPOST_*` overrides using the given lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> crate::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("TRENDPOST_PAPERS_URL") {
            self.feeds.papers_url = v;
        }
        if let Some(v) = lookup("TRENDPOST_REPOS_URL") {
            self.feeds.repos_url = v;
        }
        if let Some(v) = lookup("TRENDPOST_DELIVERY_URL") {
            self.delivery.endpoint_url = v;
        }
        if let Some(v) = lookup("TRENDPOST_DELIVERY_API_KEY") {
            self.delivery.api_key = Some(v);
        }
        if let Some(v) = lookup("TRENDPOST_UNSUBSCRIBE_BASE_URL") {
            self.delivery.unsubscribe_base_url = v;
        }
        if let Some(v) = lookup("TRENDPOST_DATABASE_URL") {
            self.store.database_url = Some(v);
        }
        if let Some(v) = lookup("TRENDPOST_INTERVAL_SECS") {
            self.schedule.interval_secs = v.trim().parse().map_err(|_| {
                crate::Error::Config(format!("TRENDPOST_INTERVAL_SECS is not a number: {}", v))
            })?;
        }
        Ok(())
    }

    /// Reject configurations the dispatcher cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.feeds.papers_url.trim().is_empty() {
            return Err(crate::Error::Config("feeds.papers_url is empty".to_string()));
        }
        if self.feeds.repos_url.trim().is_empty() {
            return Err(crate::Error::Config("feeds.repos_url is empty".to_string()));
        }
        if self.feeds.top_n == 0 {
            return Err(crate::Error::Config("feeds.top_n must be at least 1".to_string()));
        }
        if self.delivery.endpoint_url.trim().is_empty() {
            return Err(crate::Error::Config("delivery.endpoint_url is empty".to_string()));
        }
        if self.schedule.lease_ttl_secs == 0 {
            return Err(crate::Error::Config(
                "schedule.lease_ttl_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the configuration file path
    /// `$TRENDPOST_CONFIG` if set, otherwise ~/.config/trendpost/config.toml
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return expand_tilde(&PathBuf::from(path));
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("trendpost")
            .join("config.toml")
    }

    /// Get the database file path
    pub fn database_path(&self) -> PathBuf {
        self.data_dir().join("trendpost.db")
    }

    /// Get the data directory (with tilde expansion)
    pub fn data_dir(&self) -> PathBuf {
        expand_tilde(&self.general.data_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_match_observed_schedule() {
        let config = AppConfig::default();
        assert_eq!(config.schedule.interval_secs, 12 * 60 * 60);
        assert_eq!(config.feeds.top_n, 5);
        assert_eq!(config.delivery.subject, "🔥 Daily AI Trends & Tools Update");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [feeds]
            papers_url = "https://papers.example/api"

            [schedule]
            interval_secs = 60
            "#,
        )
        .unwrap();

        assert_eq!(config.feeds.papers_url, "https://papers.example/api");
        assert_eq!(config.feeds.repos_url, default_repos_url());
        assert_eq!(config.schedule.interval_secs, 60);
        assert!(!config.schedule.run_on_start);
        assert_eq!(config.schedule.lease_ttl_secs, 21600);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("TRENDPOST_REPOS_URL", "https://repos.example/trending"),
            ("TRENDPOST_DELIVERY_API_KEY", "secret"),
            ("TRENDPOST_INTERVAL_SECS", "3600"),
        ]);

        let mut config = AppConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.feeds.repos_url, "https://repos.example/trending");
        assert_eq!(config.delivery.api_key.as_deref(), Some("secret"));
        assert_eq!(config.schedule.interval_secs, 3600);
        assert_eq!(config.feeds.papers_url, default_papers_url());
    }

    #[test]
    fn test_invalid_interval_override_is_rejected() {
        let mut config = AppConfig::default();
        let result = config.apply_overrides(|key| {
            (key == "TRENDPOST_INTERVAL_SECS").then(|| "twelve hours".to_string())
        });
        assert!(matches!(result, Err(crate::Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_top_n() {
        let mut config = AppConfig::default();
        config.feeds.top_n = 0;
        assert!(config.validate().is_err());
    }
}
