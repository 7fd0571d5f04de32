mod fetcher;
mod models;

pub use fetcher::TrendingFetcher;
pub use models::{FeedKind, TrendingFeed, TrendingItem};
