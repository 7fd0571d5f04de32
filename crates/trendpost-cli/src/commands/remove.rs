use anyhow::Result;

use trendpost_core::{
    storage::{Database, SubscriberRepository},
    subscriber::SubscriberEmail,
};

pub async fn run(db: &Database, email: &str) -> Result<()> {
    let email = SubscriberEmail::parse(email)?;
    let repo = SubscriberRepository::new(db);

    if repo.delete(email.as_ref()).await? {
        println!("Removed {}.", email);
    } else {
        println!("{} is not a subscriber.", email);
    }

    Ok(())
}
