use serde::Serialize;

use crate::config::AppConfig;
use crate::delivery::Mailer;
use crate::digest::DigestTemplate;
use crate::storage::SubscriberStore;
use crate::trending::TrendingFetcher;
use crate::Result;

/// Counters for one dispatch tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Active subscribers found at the start of the tick
    pub subscribers: usize,
    pub sent: usize,
    pub failed: usize,
}

/// Run one digest dispatch: load active subscribers, fetch both feeds, send one
/// personalised digest per subscriber.
///
/// Store and feed failures abort the tick before anything is sent. Delivery failures
/// are logged and counted per subscriber and do not stop the remaining sends.
pub async fn run_tick(
    store: &dyn SubscriberStore,
    fetcher: &TrendingFetcher,
    mailer: &Mailer,
    config: &AppConfig,
) -> Result<TickReport> {
    let subscribers: Vec<_> = store
        .active_subscribers()
        .await?
        .into_iter()
        .filter(|s| s.is_active)
        .collect();

    if subscribers.is_empty() {
        tracing::info!("No active subscribers, skipping digest");
        return Ok(TickReport::default());
    }

    let (papers, repos) = fetcher.fetch_digest_feeds(&config.feeds).await?;
    let template =
        DigestTemplate::compose(&papers, &repos, &config.delivery.unsubscribe_base_url);

    let mut report = TickReport {
        subscribers: subscribers.len(),
        ..TickReport::default()
    };

    for subscriber in &subscribers {
        let message = template.message_for(subscriber, &config.delivery.subject);

        match mailer.send(&message).await {
            Ok(()) => {
                report.sent += 1;
                tracing::info!(email = %subscriber.email, "Digest sent");
            }
            Err(e) => {
                report.failed += 1;
                tracing::error!(email = %subscriber.email, "Digest delivery failed: {}", e);
            }
        }
    }

    tracing::info!(
        "Digest tick finished: {} subscribers, {} sent, {} failed",
        report.subscribers,
        report.sent,
        report.failed
    );

    Ok(report)
}
