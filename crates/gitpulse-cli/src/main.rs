use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gitpulse_api::GitHubClient;
use gitpulse_core::{
    providers::GitHubActivityProvider, Config, FetchInput, FetchOrchestrator,
};
use gitpulse_store::SqliteSink;

#[derive(Parser)]
#[command(name = "gitpulse")]
#[command(version, about = "Multi-user GitHub activity fetcher", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Fetch activity for one or more users over a date range
    Fetch {
        /// Comma-separated GitHub usernames (up to 15)
        #[arg(long)]
        users: String,
        /// Start date, YYYY-MM-DD
        #[arg(long)]
        from: String,
        /// End date, YYYY-MM-DD (inclusive)
        #[arg(long)]
        to: String,
        /// GitHub token; falls back to the config file
        #[arg(long, env = "GITHUB_TOKEN")]
        token: Option<String>,
        /// Database path; defaults to the platform data dir
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Manage the config file
    Config {
        /// Store a GitHub token for future runs
        #[arg(long)]
        set_token: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging - helps when things go sideways
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gitpulse=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = Config::load()?;

    match cli.command {
        Commands::Fetch {
            users,
            from,
            to,
            token,
            db,
        } => {
            let token = token.or_else(|| config.github.token.clone());
            fetch(&config, users, from, to, token, db).await
        }
        Commands::Config { set_token } => {
            if let Some(token) = set_token {
                config.github.token = Some(token);
                config.save()?;
                println!("Token saved");
            } else {
                println!("Nothing to do. Try --set-token");
            }
            Ok(())
        }
    }
}

async fn fetch(
    config: &Config,
    users: String,
    from: String,
    to: String,
    token: Option<String>,
    db: Option<PathBuf>,
) -> anyhow::Result<()> {
    let client = GitHubClient::with_base_url(token.clone(), config.github.api_url.clone())
        .with_page_delay(Duration::from_millis(config.fetch.page_delay_ms));
    let provider = GitHubActivityProvider::with_client(client);

    let db_path = match db {
        Some(path) => path,
        None => default_db_path()?,
    };
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    tracing::debug!("Using database at {}", db_path.display());
    let sink = SqliteSink::new(&db_path)?;

    let mut orchestrator = FetchOrchestrator::new(
        Box::new(provider.clone()),
        Box::new(provider),
        Box::new(sink),
    )
    .with_max_identities(config.fetch.max_identities)
    .with_progress(|p| println!("[{:>3}%] {}", p.percent(), p.message))
    .with_error_handler(|msg| eprintln!("warning: {msg}"));

    let input = FetchInput {
        identities: users,
        start: from,
        end: to,
        token,
    };

    let outcome = orchestrator
        .run(&input)
        .await
        .context("fetch request failed")?;

    println!(
        "Done: {} events and {} issues/PRs for {} ({}..{})",
        outcome.events.len(),
        outcome.work_items.len(),
        outcome.identities.join(", "),
        outcome.start,
        outcome.end
    );
    if !outcome.failed_identities.is_empty() {
        println!("Some users could not be fetched:");
        for (login, error) in &outcome.failed_identities {
            println!("  {login}: {error}");
        }
    }
    println!("Stored in {}", db_path.display());

    Ok(())
}

fn default_db_path() -> anyhow::Result<PathBuf> {
    let data_dir = dirs::data_dir().context("could not find data directory")?;
    Ok(data_dir.join("gitpulse").join("activity.db"))
}
