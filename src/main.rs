use anyhow::Result;
use clap::Parser;
use discover::api::{ApiConfig, DEFAULT_PLATFORM, DiscoverClient, Link, ViewAction};
use discover::commands;
use discover::http::{
    CancellationToken, DEFAULT_BACKOFF_FACTOR, DEFAULT_INITIAL_DELAY_MS, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_MAX_DELAY_MS, RetryPolicy,
};
use log::warn;
use std::time::Duration;

/// discover - browse and submit links on the Discover backend
///
/// Every request is retried on connection failures, timeouts, 408, 429 and
/// 5xx responses with exponential backoff.
///
/// Examples:
///   discover links                      # List all links
///   discover view https://example.com   # Record a view
#[derive(Parser, Debug)]
#[command(author, version = env!("DISCOVER_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Backend URL (defaults to https://backend.discoverall.space)
    #[arg(long = "api-url", env = "DISCOVER_API_URL", value_name = "URL", global = true)]
    api_url: Option<String>,

    /// Platform tag sent when fetching links
    #[arg(long, env = "DISCOVER_PLATFORM", default_value = DEFAULT_PLATFORM, global = true)]
    platform: String,

    #[command(flatten)]
    retry: RetryArgs,

    /// Show debug logs (RUST_LOG takes precedence)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[derive(clap::Args, Debug)]
struct RetryArgs {
    /// Give up after N attempts (default 10)
    #[arg(
        long,
        env = "DISCOVER_MAX_ATTEMPTS",
        value_name = "N",
        global = true,
        conflicts_with = "retry_forever"
    )]
    max_attempts: Option<u32>,

    /// Retry transient failures until they succeed
    #[arg(long, env = "DISCOVER_RETRY_FOREVER", global = true)]
    retry_forever: bool,

    /// Delay before the first retry
    #[arg(long, value_name = "MS", default_value_t = DEFAULT_INITIAL_DELAY_MS, global = true)]
    initial_delay_ms: u64,

    /// Upper bound for the delay between retries
    #[arg(long, value_name = "MS", default_value_t = DEFAULT_MAX_DELAY_MS, global = true)]
    max_delay_ms: u64,

    /// Multiplier applied to the delay after each failed attempt
    #[arg(long, value_name = "FACTOR", default_value_t = DEFAULT_BACKOFF_FACTOR, global = true)]
    backoff_factor: f64,
}

impl RetryArgs {
    fn policy(&self) -> RetryPolicy {
        let policy = if self.retry_forever {
            RetryPolicy::unbounded()
        } else {
            RetryPolicy::limited(self.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS))
        };
        policy
            .with_initial_delay(Duration::from_millis(self.initial_delay_ms))
            .with_max_delay(Duration::from_millis(self.max_delay_ms))
            .with_backoff_factor(self.backoff_factor)
    }
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// List all links
    Links(LinksArgs),

    /// Record a view, like or dislike for a link
    View(ViewArgs),

    /// Submit a new link
    Add(AddArgs),

    /// Check that the backend is reachable
    Health,
}

#[derive(clap::Args, Debug)]
struct LinksArgs {
    /// Print raw JSON
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args, Debug)]
struct ViewArgs {
    /// URL of the link
    #[arg(value_name = "URL")]
    url: String,

    /// One of: view, likes, unlikes, dislikes, undislikes
    #[arg(long, short = 'a', default_value = "view")]
    action: ViewAction,
}

#[derive(clap::Args, Debug)]
struct AddArgs {
    #[arg(long)]
    name: String,

    #[arg(long)]
    url: String,

    #[arg(long)]
    description: String,

    /// Tag for the link (repeatable)
    #[arg(long = "tag", value_name = "TAG")]
    tags: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let config = ApiConfig::new(cli.api_url.clone())
        .with_platform(&cli.platform)
        .with_retry(cli.retry.policy());

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling pending retries");
            on_interrupt.cancel();
        }
    });

    let client = DiscoverClient::from_config(&config)?.with_cancellation(cancel);

    match cli.command {
        Commands::Links(args) => commands::links(&client, args.json).await?,
        Commands::View(args) => commands::view(&client, &args.url, args.action).await?,
        Commands::Add(args) => {
            let link = Link::new(&args.name, &args.url, &args.description).with_tags(args.tags);
            commands::add(&client, &link).await?
        }
        Commands::Health => commands::health(&client).await?,
    }
    Ok(())
}
