use anyhow::Result;

use trendpost_core::{
    trending::{FeedKind, TrendingFetcher},
    AppConfig,
};

pub async fn run(config: &AppConfig, kind: FeedKind, limit: Option<usize>) -> Result<()> {
    let fetcher = TrendingFetcher::new(&config.feeds)?;
    let url = match kind {
        FeedKind::Papers => &config.feeds.papers_url,
        FeedKind::Repositories => &config.feeds.repos_url,
    };

    let feed = fetcher
        .fetch_top(kind, url, limit.unwrap_or(config.feeds.top_n))
        .await?;

    println!("{}\n", kind.heading());

    if feed.is_empty() {
        println!("  (nothing trending right now)");
        return Ok(());
    }

    for (i, item) in feed.items.iter().enumerate() {
        match &item.metric {
            Some(metric) => println!("  {}. {} ({})", i + 1, item.name, metric),
            None => println!("  {}. {}", i + 1, item.name),
        }
        println!("     {}", item.url);
        if let Some(author) = &item.author {
            println!("     by {}", author);
        }
    }

    Ok(())
}
