use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trendpost_core::{storage::Database, trending::FeedKind, AppConfig};

mod commands;

#[derive(Parser)]
#[command(name = "trendpost")]
#[command(author, version, about = "Trending AI/ML digest mailer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Background daemon that sends the digest on a fixed interval
    Daemon {
        #[command(subcommand)]
        action: DaemonAction,
    },
    /// Send one digest to all active subscribers right now
    SendNow,
    /// Add a subscriber
    Subscribe {
        /// Email address of the new subscriber
        email: String,
    },
    /// Deactivate the subscriber owning an unsubscribe token
    Unsubscribe {
        /// Token from the digest's unsubscribe link
        #[arg(short, long)]
        token: String,
    },
    /// Delete a subscriber permanently
    Remove {
        /// Email address to delete
        email: String,
    },
    /// List subscribers
    List {
        /// Only show active subscribers
        #[arg(short, long)]
        active: bool,
    },
    /// Show the current trending items of one feed
    Trending {
        #[arg(value_enum, default_value_t = FeedArg::Papers)]
        feed: FeedArg,
        /// Number of items to show (defaults to the digest size)
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

#[derive(Subcommand)]
enum DaemonAction {
    /// Start the background daemon
    Start,
    /// Stop the background daemon
    Stop,
    /// Check daemon status
    Status,
}

#[derive(Clone, Copy, ValueEnum)]
enum FeedArg {
    Papers,
    Repos,
}

impl From<FeedArg> for FeedKind {
    fn from(arg: FeedArg) -> Self {
        match arg {
            FeedArg::Papers => FeedKind::Papers,
            FeedArg::Repos => FeedKind::Repositories,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Arc::new(AppConfig::load()?);

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.general.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Daemon { action } => match action {
            DaemonAction::Start => {
                let db = Arc::new(Database::new(&config).await?);
                commands::daemon::start(db, config).await
            }
            DaemonAction::Stop => commands::daemon::stop().await,
            DaemonAction::Status => commands::daemon::status().await,
        },
        Commands::SendNow => {
            let db = Arc::new(Database::new(&config).await?);
            commands::send_now::run(db, config).await
        }
        Commands::Subscribe { email } => {
            let db = Database::new(&config).await?;
            commands::subscribe::run(&db, &email).await
        }
        Commands::Unsubscribe { token } => {
            let db = Database::new(&config).await?;
            commands::unsubscribe::run(&db, &token).await
        }
        Commands::Remove { email } => {
            let db = Database::new(&config).await?;
            commands::remove::run(&db, &email).await
        }
        Commands::List { active } => {
            let db = Database::new(&config).await?;
            commands::list::run(&db, active).await
        }
        Commands::Trending { feed, limit } => {
            commands::trending::run(&config, feed.into(), limit).await
        }
    }
}
