use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{info, warn};

use trendpost_core::{
    scheduler::{DigestService, SchedulerEvent, SchedulerService},
    storage::Database,
    AppConfig,
};

/// PID file of the foreground daemon
struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// `$XDG_RUNTIME_DIR/trendpost/daemon.pid`, falling back to the local data dir
    fn default_location() -> Self {
        let path = dirs::runtime_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("trendpost")
            .join("daemon.pid");
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// PID of a live daemon. A PID file left behind by a dead process is removed.
    fn running_pid(&self) -> Option<u32> {
        let pid: u32 = fs::read_to_string(&self.path).ok()?.trim().parse().ok()?;

        if process_alive(pid) {
            return Some(pid);
        }

        self.remove();
        None
    }

    /// Record the current process as the daemon
    fn claim(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, format!("{}\n", std::process::id()))?;
        Ok(())
    }

    fn remove(&self) {
        let _ = fs::remove_file(&self.path);
    }
}

#[cfg(unix)]
fn process_alive(pid: u32) -> bool {
    signal_process("-0", pid)
}

// No cheap liveness check here; trust the PID file
#[cfg(not(unix))]
fn process_alive(_pid: u32) -> bool {
    true
}

#[cfg(unix)]
fn signal_process(signal: &str, pid: u32) -> bool {
    std::process::Command::new("kill")
        .arg(signal)
        .arg(pid.to_string())
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Resolves on Ctrl+C, or SIGTERM from `trendpost daemon stop`
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.ok();
    }
}

fn log_event(event: SchedulerEvent) {
    match event {
        SchedulerEvent::TickCompleted(report) => info!(
            "Digest sent: {}/{} delivered, {} failed",
            report.sent, report.subscribers, report.failed
        ),
        SchedulerEvent::TickSkipped => info!("Digest tick skipped, another dispatch is running"),
        SchedulerEvent::Error { message } => warn!("Digest tick abandoned: {}", message),
    }
}

/// Run the digest scheduler in the foreground until Ctrl+C or `daemon stop`
pub async fn start(db: Arc<Database>, config: Arc<AppConfig>) -> Result<()> {
    let pid_file = PidFile::default_location();

    if let Some(pid) = pid_file.running_pid() {
        println!("Daemon is already running (PID: {})", pid);
        return Ok(());
    }

    println!("Starting trendpost daemon...");
    pid_file.claim()?;

    let service = Arc::new(DigestService::new(db, config.clone())?);

    // Tick outcomes are only logged here
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            log_event(event);
        }
    });

    let handle = SchedulerService::new(service, &config.schedule)
        .with_event_sender(event_tx)
        .start();

    println!(
        "Daemon started (PID: {}). Press Ctrl+C or run 'trendpost daemon stop' to stop.",
        std::process::id()
    );
    println!("  Digest interval: {} seconds", config.schedule.interval_secs);
    println!("  Delivery endpoint: {}", config.delivery.endpoint_url);

    shutdown_signal().await;
    info!("Received shutdown signal");

    // Waits for an in-flight tick to finish
    let result = handle.stop().await;

    pid_file.remove();
    println!("Daemon stopped.");

    result.map_err(Into::into)
}

/// Ask a running daemon to stop, escalating to SIGKILL if it does not exit
pub async fn stop() -> Result<()> {
    let pid_file = PidFile::default_location();

    let Some(pid) = pid_file.running_pid() else {
        println!("Daemon is not running.");
        return Ok(());
    };

    println!("Stopping daemon (PID: {})...", pid);

    #[cfg(unix)]
    {
        if !signal_process("-TERM", pid) {
            println!("Failed to stop daemon. You may need to kill it manually: kill {}", pid);
            return Ok(());
        }

        // Give a running tick a moment to wind down
        tokio::time::sleep(tokio::time::Duration::from_secs(2)).await;

        if pid_file.running_pid().is_none() {
            println!("Daemon stopped successfully.");
        } else {
            signal_process("-9", pid);
            pid_file.remove();
            println!("Daemon forcefully terminated.");
        }
    }

    #[cfg(not(unix))]
    {
        println!("Please stop the daemon manually (PID: {})", pid);
    }

    Ok(())
}

/// Show daemon status
pub async fn status() -> Result<()> {
    let pid_file = PidFile::default_location();

    match pid_file.running_pid() {
        Some(pid) => {
            println!("Daemon is running (PID: {})", pid);
            println!("PID file: {}", pid_file.path().display());
        }
        None => println!("Daemon is not running."),
    }

    Ok(())
}
