use anyhow::Result;

use trendpost_core::storage::{Database, SubscriberRepository};

pub async fn run(db: &Database, token: &str) -> Result<()> {
    let repo = SubscriberRepository::new(db);

    let Some(subscriber) = repo.find_by_token(token).await? else {
        println!("No subscriber found for this token.");
        return Ok(());
    };

    if repo.unsubscribe_by_token(token).await? {
        println!("Unsubscribed {}.", subscriber.email);
    } else {
        println!("{} was already unsubscribed.", subscriber.email);
    }

    Ok(())
}
