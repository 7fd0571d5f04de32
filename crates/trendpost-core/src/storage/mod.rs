mod database;
mod lease_repo;
mod store;
mod subscriber_repo;

pub use database::Database;
pub use lease_repo::LeaseRepository;
pub use store::SubscriberStore;
pub use subscriber_repo::SubscriberRepository;
