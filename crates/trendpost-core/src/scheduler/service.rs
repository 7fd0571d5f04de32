use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::tasks::{run_tick, TickReport};
use crate::config::{AppConfig, ScheduleConfig};
use crate::delivery::Mailer;
use crate::storage::SubscriberStore;
use crate::trending::TrendingFetcher;
use crate::{Error, Result};

/// Events emitted by the scheduler after each tick
#[derive(Debug, Clone)]
pub enum SchedulerEvent {
    /// A tick ran to completion (some deliveries may still have failed)
    TickCompleted(TickReport),
    /// A tick was requested while another one was still running
    TickSkipped,
    /// The tick was abandoned before delivery
    Error { message: String },
}

/// Result of asking the service to dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Completed(TickReport),
    Skipped,
}

/// Owns everything a dispatch tick needs, and makes sure only one tick runs at a time.
///
/// The in-process guard covers concurrent calls on one service; the store's dispatch
/// lease covers other services (the daemon and `send-now`) sharing the same database.
pub struct DigestService {
    store: Arc<dyn SubscriberStore>,
    fetcher: TrendingFetcher,
    mailer: Mailer,
    config: Arc<AppConfig>,
    tick_guard: Mutex<()>,
    holder: String,
}

impl DigestService {
    pub fn new(store: Arc<dyn SubscriberStore>, config: Arc<AppConfig>) -> Result<Self> {
        Ok(Self {
            store,
            fetcher: TrendingFetcher::new(&config.feeds)?,
            mailer: Mailer::new(&config.delivery)?,
            config,
            tick_guard: Mutex::new(()),
            holder: format!("{}-{}", std::process::id(), Uuid::new_v4().simple()),
        })
    }

    /// Run one tick now, unless a tick is already in progress here or in
    /// another process sharing the store
    pub async fn dispatch_now(&self) -> Result<TickOutcome> {
        let Ok(_guard) = self.tick_guard.try_lock() else {
            warn!("Digest tick already running, skipping");
            return Ok(TickOutcome::Skipped);
        };

        let ttl = Duration::from_secs(self.config.schedule.lease_ttl_secs);
        if !self.store.try_acquire_dispatch(&self.holder, ttl).await? {
            warn!("Another dispatcher holds the digest lease, skipping");
            return Ok(TickOutcome::Skipped);
        }

        let result = run_tick(self.store.as_ref(), &self.fetcher, &self.mailer, &self.config).await;

        if let Err(e) = self.store.release_dispatch(&self.holder).await {
            warn!("Failed to release digest lease: {}", e);
        }

        result.map(TickOutcome::Completed)
    }
}

/// Timer-driven digest scheduler with an explicit start/stop lifecycle
pub struct SchedulerService {
    service: Arc<DigestService>,
    interval_secs: u64,
    run_on_start: bool,
    event_tx: Option<mpsc::UnboundedSender<SchedulerEvent>>,
}

/// Handle to a running scheduler
pub struct SchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Signal shutdown and wait for the loop to exit.
    /// An in-flight tick is allowed to finish first.
    pub async fn stop(self) -> Result<()> {
        let _ = self.shutdown_tx.send(true);
        self.task
            .await
            .map_err(|e| Error::Other(format!("Scheduler task join error: {}", e)))
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl SchedulerService {
    pub fn new(service: Arc<DigestService>, schedule: &ScheduleConfig) -> Self {
        Self {
            service,
            interval_secs: schedule.interval_secs,
            run_on_start: schedule.run_on_start,
            event_tx: None,
        }
    }

    /// Set the event sender for tick notifications
    pub fn with_event_sender(mut self, tx: mpsc::UnboundedSender<SchedulerEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    fn send_event(&self, event: SchedulerEvent) {
        if let Some(ref tx) = self.event_tx {
            if tx.send(event).is_err() {
                warn!("Failed to send scheduler event: receiver dropped");
            }
        }
    }

    /// Spawn the scheduler loop onto the runtime
    pub fn start(self) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(shutdown_rx));
        SchedulerHandle { shutdown_tx, task }
    }

    /// Run ticks on the configured interval until the shutdown signal
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        if self.interval_secs == 0 {
            info!("Digest scheduler disabled (interval_secs = 0)");
            let _ = shutdown.changed().await;
            return;
        }

        info!("Digest scheduler started: interval={}s", self.interval_secs);

        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // The first tick fires immediately
        if !self.run_on_start {
            interval.tick().await;
        }

        loop {
            tokio::select! {
                result = shutdown.changed() => {
                    if result.is_err() || *shutdown.borrow() {
                        info!("Digest scheduler received shutdown signal");
                        break;
                    }
                }

                _ = interval.tick() => {
                    debug!("Running scheduled digest tick");
                    match self.service.dispatch_now().await {
                        Ok(TickOutcome::Completed(report)) => {
                            self.send_event(SchedulerEvent::TickCompleted(report));
                        }
                        Ok(TickOutcome::Skipped) => {
                            self.send_event(SchedulerEvent::TickSkipped);
                        }
                        Err(e) => {
                            error!("Digest tick failed: {}", e);
                            self.send_event(SchedulerEvent::Error {
                                message: e.to_string(),
                            });
                        }
                    }
                }
            }
        }

        info!("Digest scheduler stopped");
    }
}
