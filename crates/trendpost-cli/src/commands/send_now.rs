use std::sync::Arc;

use anyhow::Result;

use trendpost_core::{
    scheduler::{DigestService, TickOutcome},
    storage::Database,
    AppConfig,
};

pub async fn run(db: Arc<Database>, config: Arc<AppConfig>) -> Result<()> {
    println!("Sending digest to active subscribers...\n");

    let service = DigestService::new(db, config)?;

    match service.dispatch_now().await? {
        TickOutcome::Completed(report) if report.subscribers == 0 => {
            println!("No active subscribers, nothing sent.");
        }
        TickOutcome::Completed(report) => {
            println!(
                "Digest sent to {} of {} subscribers.",
                report.sent, report.subscribers
            );
            if report.failed > 0 {
                println!("{} deliveries failed, see the log for details.", report.failed);
            }
        }
        TickOutcome::Skipped => {
            println!("Another digest is already being sent.");
        }
    }

    Ok(())
}
