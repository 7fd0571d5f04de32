use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Which upstream feed a list of items came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    /// Research papers and models from the ML community hub
    Papers,
    /// Repositories from the code-hosting platform
    Repositories,
}

impl FeedKind {
    /// Section heading used in the digest
    pub fn heading(&self) -> &'static str {
        match self {
            FeedKind::Papers => "🧠 Trending Hugging Face Models",
            FeedKind::Repositories => "📦 Trending GitHub Repositories",
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedKind::Papers => f.write_str("papers"),
            FeedKind::Repositories => f.write_str("repositories"),
        }
    }
}

/// One entry of a trending feed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendingItem {
    pub identifier: Option<String>,
    pub name: String,
    pub url: String,
    pub author: Option<String>,
    pub description: Option<String>,
    /// Stars, likes or upvotes, whichever the provider reports
    pub metric: Option<String>,
}

/// Raw upstream shape; providers disagree on field names and types,
/// so every field is read as a loose value and converted on its own
#[derive(Debug, Default, Deserialize)]
struct RawItem {
    id: Option<Value>,
    name: Option<Value>,
    title: Option<Value>,
    url: Option<Value>,
    link: Option<Value>,
    repo_url: Option<Value>,
    author: Option<Value>,
    #[serde(rename = "submittedBy")]
    submitted_by: Option<Value>,
    username: Option<Value>,
    description: Option<Value>,
    stars: Option<Value>,
    likes: Option<Value>,
    upvotes: Option<Value>,
}

/// Non-empty string or number; anything else counts as absent
fn text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A user given either as a plain name or as a profile object
fn person(value: Option<Value>) -> Option<String> {
    match value? {
        Value::Object(mut profile) => ["name", "fullname", "user", "login"]
            .iter()
            .find_map(|key| text(profile.remove(*key))),
        other => text(Some(other)),
    }
}

impl TrendingItem {
    /// Build an item from one upstream JSON object; `None` if it lacks a name or url
    pub fn from_value(value: Value) -> Option<Self> {
        let raw: RawItem = serde_json::from_value(value).ok()?;

        let identifier = text(raw.id);
        let name = text(raw.name)
            .or_else(|| text(raw.title))
            .or_else(|| identifier.clone())?;
        let url = text(raw.url)
            .or_else(|| text(raw.link))
            .or_else(|| text(raw.repo_url))?;
        let metric = text(raw.stars)
            .or_else(|| text(raw.likes))
            .or_else(|| text(raw.upvotes));

        Some(Self {
            identifier,
            name,
            url,
            author: person(raw.author)
                .or_else(|| person(raw.submitted_by))
                .or_else(|| person(raw.username)),
            description: text(raw.description),
            metric,
        })
    }
}

/// A fetched and truncated feed
#[derive(Debug, Clone)]
pub struct TrendingFeed {
    pub kind: FeedKind,
    pub items: Vec<TrendingItem>,
}

impl TrendingFeed {
    pub fn new(kind: FeedKind, mut items: Vec<TrendingItem>, limit: usize) -> Self {
        items.truncate(limit);
        Self { kind, items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
