pub mod daemon;
pub mod list;
pub mod remove;
pub mod send_now;
pub mod subscribe;
pub mod trending;
pub mod unsubscribe;
