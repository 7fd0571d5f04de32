mod models;

pub use models::{generate_unsubscribe_token, NewSubscriber, Subscriber, SubscriberEmail};
