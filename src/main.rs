use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use finnwatch::config::Credentials;
use finnwatch::event_log::EventLog;
use finnwatch::notify::{ConsoleNotifier, Notifier, TelegramNotifier};
use finnwatch::run::{Coordinator, DEFAULT_INTERVAL};
use finnwatch::search::SearchQuery;
use finnwatch::source::{FilePageSource, HttpPageSource, PageSource};

#[derive(Parser)]
#[command(author, version, about = "Watches a finn.no car search and reports new listings to Telegram")]
struct Args {
    /// JSON file with {"telegram": {"token", "chat_id"}}
    #[arg(long, default_value = "credentials.json")]
    credentials: PathBuf,

    /// Where notified listing ids are kept between runs
    #[arg(long, default_value = "seen_ads.json")]
    state: PathBuf,

    /// Append-only event log
    #[arg(long, default_value = "ads_log.txt")]
    log_file: PathBuf,

    /// Full search URL; defaults to the built-in saved search
    #[arg(long, env = "FINN_SEARCH_URL")]
    search_url: Option<Url>,

    /// Seconds between runs
    #[arg(long, default_value_t = DEFAULT_INTERVAL.as_secs())]
    interval_secs: u64,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,

    /// Print messages instead of sending them; no credentials needed
    #[arg(long)]
    dry_run: bool,

    /// Parse a saved results page instead of fetching the live one
    #[arg(long)]
    html: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,finnwatch=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let notifier: Box<dyn Notifier> = if args.dry_run {
        tracing::info!("dry run, messages go to stdout");
        Box::new(ConsoleNotifier)
    } else {
        let creds = Credentials::load(&args.credentials).context("invalid configuration")?;
        Box::new(TelegramNotifier::new(creds.token, creds.chat_id)?)
    };

    let source: Box<dyn PageSource> = match &args.html {
        Some(path) => Box::new(FilePageSource::new(path)),
        None => Box::new(HttpPageSource::new()?),
    };

    let search_url = match args.search_url {
        Some(url) => url,
        None => SearchQuery::default().to_url()?,
    };

    let coordinator = Coordinator::new(
        source,
        notifier,
        EventLog::new(&args.log_file),
        search_url,
        &args.state,
    );

    if args.once {
        let outcome = coordinator.run_cycle().await?;
        tracing::info!(
            new = outcome.new_count(),
            known = outcome.known,
            "single run finished"
        );
        return Ok(());
    }

    coordinator.poll(Duration::from_secs(args.interval_secs)).await;
    Ok(())
}
