use anyhow::Result;

use trendpost_core::storage::{Database, SubscriberRepository};

pub async fn run(db: &Database, active_only: bool) -> Result<()> {
    let repo = SubscriberRepository::new(db);
    let subscribers = if active_only {
        repo.list_active().await?
    } else {
        repo.list_all().await?
    };

    if subscribers.is_empty() {
        println!("No subscribers yet.");
        println!("\nTo add one, run:");
        println!("  trendpost subscribe <email>");
        return Ok(());
    }

    let active = repo.count_active().await?;
    println!("Subscribers ({}, {} active):\n", subscribers.len(), active);

    for subscriber in &subscribers {
        let state = if subscriber.is_active { "" } else { " [unsubscribed]" };
        println!("  {}{}", subscriber.email, state);
        println!("    Since: {}", subscriber.created_at.format("%Y-%m-%d %H:%M"));
    }

    Ok(())
}
