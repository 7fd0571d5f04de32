use anyhow::Result;

use trendpost_core::{
    storage::{Database, SubscriberRepository},
    subscriber::NewSubscriber,
};

pub async fn run(db: &Database, email: &str) -> Result<()> {
    let new_subscriber = NewSubscriber::parse(email)?;
    let repo = SubscriberRepository::new(db);

    if let Some(existing) = repo.find_by_email(new_subscriber.email.as_ref()).await? {
        if existing.is_active {
            println!("{} is already subscribed.", existing.email);
        } else {
            repo.set_active(existing.email.as_ref(), true).await?;
            println!("{} is subscribed again.", existing.email);
        }
        return Ok(());
    }

    let subscriber = repo.create(&new_subscriber).await?;
    println!("Subscribed: {} ({})", subscriber.email, subscriber.id);
    println!("Unsubscribe token: {}", subscriber.unsubscribe_token);

    Ok(())
}
