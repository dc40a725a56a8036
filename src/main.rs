use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use tokio::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tavolo::bot::CommandListener;
use tavolo::config::Config;
use tavolo::engine::EngineController;
use tavolo::notify::{SubscriberDispatcher, TelegramChannel};
use tavolo::schedule::ScheduleState;
use tavolo::source::AvailabilitySource;
use tavolo::storage::{SeenStore, StatusStore, SubscriberRegistry};

#[derive(Parser)]
#[command(
    name = "tavolo",
    version,
    about = "Restaurant reservation availability watcher with Telegram notifications",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a TOML config file (environment variables used otherwise)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true, default_value = "text")]
    log_format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the watcher daemon (poll loop plus Telegram command listener)
    Run,

    /// Run a single availability check and print what is new
    Check,

    /// Print the persisted watcher status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_tracing(&cli.log_format, cli.verbose)?;

    let config = load_config(cli.config.as_deref())?;
    config.validate().context("invalid configuration")?;

    match cli.command {
        Commands::Run => run(config).await,
        Commands::Check => check(config).await,
        Commands::Status => status(config),
    }
}

fn setup_tracing(format: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("tavolo=debug,info")
    } else {
        tracing_subscriber::EnvFilter::new("tavolo=info,warn")
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path),
        None => Config::from_env(),
    }
}

/// Build the controller and the pieces shared with the command listener
fn assemble(
    config: &Config,
) -> Result<(
    EngineController,
    Arc<TelegramChannel>,
    Arc<Mutex<SubscriberRegistry>>,
)> {
    let telegram = Arc::new(
        TelegramChannel::new(&config.telegram).context("failed to create Telegram channel")?,
    );

    let registry = Arc::new(Mutex::new(
        SubscriberRegistry::open(config.storage.subscribers_path())
            .context("failed to open subscriber registry")?,
    ));

    let dispatcher = SubscriberDispatcher::new(
        telegram.clone(),
        registry.clone(),
        config.engine.dispatch_concurrency,
    );

    let seen = Arc::new(Mutex::new(
        SeenStore::open(config.storage.seen_path()).context("failed to open seen-set")?,
    ));

    let source =
        AvailabilitySource::new(config.source.clone()).context("failed to create source client")?;

    let schedule = ScheduleState::new(config.quiet_window()?, Local::now().time());

    let controller = EngineController::new(
        source,
        dispatcher,
        seen,
        StatusStore::new(config.storage.status_path()),
        schedule,
        config.engine.clone(),
    );

    Ok((controller, telegram, registry))
}

async fn run(config: Config) -> Result<()> {
    tracing::info!(
        source = %config.source.url,
        data_dir = %config.storage.data_dir.display(),
        "tavolo starting"
    );

    let (controller, telegram, registry) = assemble(&config)?;

    let listener = CommandListener::new(
        telegram,
        registry,
        controller.clone(),
        config.telegram.update_timeout_secs,
    );

    tokio::select! {
        _ = controller.run() => {}
        _ = listener.run() => {}
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for shutdown signal")?;
            tracing::info!("shutdown signal received");
        }
    }

    Ok(())
}

async fn check(config: Config) -> Result<()> {
    let (controller, _telegram, _registry) = assemble(&config)?;

    let new = controller
        .run_check_now()
        .await
        .context("availability check failed")?;

    if new.is_empty() {
        println!("Nothing new.");
    } else {
        println!("{} new slot(s):", new.len());
        for id in &new {
            println!("  {id}");
        }
    }

    Ok(())
}

fn status(config: Config) -> Result<()> {
    let poll = StatusStore::new(config.storage.status_path()).load();
    let subscribers = SubscriberRegistry::open(config.storage.subscribers_path())?;
    let window = config.quiet_window()?;
    let mode = window.mode_at(Local::now().time());

    println!("Mode (from clock): {mode}");
    match poll.last_poll_at {
        Some(at) => println!("Last poll: {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
        None => println!("Last poll: never"),
    }
    match poll.last_found_at {
        Some(at) => println!("Last found: {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
        None => println!("Last found: never"),
    }
    println!("Backoff level: {}", poll.backoff_level);
    println!("Subscribers: {}", subscribers.len());

    Ok(())
}
