pub mod config;
pub mod delivery;
pub mod digest;
pub mod error;
pub mod scheduler;
pub mod storage;
pub mod subscriber;
pub mod trending;

pub use config::AppConfig;
pub use error::{Error, Result};
