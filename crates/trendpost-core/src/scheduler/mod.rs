mod service;
pub mod tasks;

#[cfg(test)]
mod test_support;

pub use service::{DigestService, SchedulerEvent, SchedulerHandle, SchedulerService, TickOutcome};
pub use tasks::{run_tick, TickReport};
