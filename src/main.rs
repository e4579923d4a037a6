use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use autoposter::config::Config;
use autoposter::content::ArticleGenerator;
use autoposter::orchestrator::{
    health, CommandQueue, ControlCommand, FileCommandQueue, Orchestrator, ShutdownReason,
    StatusReport,
};
use autoposter::platforms::{PlatformPublisher, TelegramClient, WordPressClient};
use autoposter::publish::FailureGovernor;
use autoposter::storage::open_history;
use autoposter::utils::clock::{Clock, SystemClock};

#[derive(Parser)]
#[command(
    name = "autoposter",
    version,
    about = "Scheduled article publishing bot for WordPress and Telegram",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to the TOML configuration file
    #[arg(short, long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); defaults to the configured format
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand, Clone, Copy, Debug)]
enum Commands {
    /// Run the publishing loop (default)
    Start,

    /// Ask the running bot to stop
    Stop,

    /// Publish one post now and exit
    #[command(alias = "next")]
    Once,

    /// Print today's publications and the next planned post
    Status,

    /// Delete today's publication history
    #[command(alias = "reset_today")]
    ResetToday,

    /// Ask the running bot to publish one post immediately
    #[command(alias = "publish_now")]
    PublishNow,

    /// Ask the running bot to log its status
    #[command(alias = "bot_status")]
    BotStatus,

    /// Ask the running bot to reset today's history
    #[command(alias = "bot_reset")]
    BotReset,

    /// Ask the running bot to exit so its supervisor restarts it
    Restart,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli.config)?;

    let log_format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());
    setup_tracing(&log_format, cli.verbose, &config)?;

    let command = cli.command.unwrap_or(Commands::Start);
    tracing::debug!(command = ?command, config = %cli.config.display(), "Starting command");

    match command {
        Commands::Start => start(config, &cli.config).await?,
        Commands::Once => once(config).await?,
        Commands::Status => status(&config)?,
        Commands::ResetToday => reset_today(&config)?,
        Commands::Stop => send_command(&config, ControlCommand::Stop)?,
        Commands::PublishNow => send_command(&config, ControlCommand::PublishNow)?,
        Commands::BotStatus => send_command(&config, ControlCommand::Status)?,
        Commands::BotReset => send_command(&config, ControlCommand::ResetToday)?,
        Commands::Restart => send_command(&config, ControlCommand::Restart)?,
    }

    Ok(())
}

/// A missing file falls back to defaults; an unreadable or invalid one aborts
fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        return Config::load(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()));
    }

    eprintln!(
        "Configuration file {} not found, using defaults",
        path.display()
    );
    let mut config = Config::default();
    config.apply_env();
    config.validate().context("invalid default configuration")?;
    Ok(config)
}

fn setup_tracing(format: &str, verbose: bool, config: &Config) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("autoposter=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_new(format!("autoposter={},warn", config.logging.level))
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("autoposter=info,warn"))
    };

    let log_file = config.logging.file.as_deref();

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(file_layer(log_file)?)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(file_layer(log_file)?)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    Ok(())
}

/// Plain-text copy of every event, appended to `path`
fn file_layer<S>(path: Option<&Path>) -> Result<Option<Box<dyn Layer<S> + Send + Sync>>>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    let Some(path) = path else {
        return Ok(None);
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create log directory {}", parent.display()))?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    Ok(Some(
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(Arc::new(file))
            .boxed(),
    ))
}

fn build_orchestrator(config: Config, shutdown: watch::Receiver<bool>) -> Result<Orchestrator> {
    let store = open_history(&config.paths.database)?;

    let generator = ArticleGenerator::from_config(&config).with_context(|| {
        format!(
            "failed to load theme catalog from {}",
            config.paths.themes.display()
        )
    })?;
    tracing::info!(
        themes = generator.topic_count(),
        path = %config.paths.themes.display(),
        "Theme catalog loaded"
    );

    let publisher = PlatformPublisher::new(
        WordPressClient::new(config.wordpress.clone())?,
        TelegramClient::new(config.telegram.clone())?,
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let governor =
        FailureGovernor::from_config(&config, Arc::new(publisher), store.clone(), clock.clone());
    let queue = Arc::new(FileCommandQueue::new(&config.paths.control_dir));

    Ok(Orchestrator::new(
        config,
        store,
        governor,
        Arc::new(generator),
        queue,
        clock,
        shutdown,
    ))
}

async fn start(config: Config, config_path: &Path) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut orchestrator = build_orchestrator(config, shutdown_rx)?;
    if config_path.exists() {
        orchestrator.set_config_path(config_path);
    }

    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    let reason = orchestrator.run().await;
    if reason == ShutdownReason::Restart {
        tracing::info!("Exiting for supervisor restart");
    }
    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = terminate.recv() => {}
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Cannot listen for SIGTERM, only Ctrl-C stops the bot");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

async fn once(config: Config) -> Result<()> {
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let orchestrator = build_orchestrator(config, shutdown_rx)?;

    match orchestrator.publish_once().await? {
        Some(results) => {
            println!("Publication finished:");
            println!("  WordPress: {}", outcome(results.wordpress));
            println!("  Telegram: {}", outcome(results.telegram));
        }
        None => println!("No unpublished topics left for today"),
    }
    Ok(())
}

fn outcome(ok: bool) -> &'static str {
    if ok {
        "success"
    } else {
        "failed"
    }
}

fn status(config: &Config) -> Result<()> {
    let store = open_history(&config.paths.database)?;
    let failures = health::read_report(&config.paths.health_file)?
        .map(|r| (r.wordpress_failures, r.telegram_failures))
        .unwrap_or((0, 0));

    let now = chrono::Local::now().naive_local();
    let report = StatusReport::build(store.as_ref(), config, now, failures)?;
    println!("{report}");
    Ok(())
}

fn reset_today(config: &Config) -> Result<()> {
    let store = open_history(&config.paths.database)?;
    let today = chrono::Local::now().date_naive();
    let removed = store.delete_day(today)?;
    tracing::info!(date = %today, removed, "Today's publication history reset");
    println!("Removed {removed} record(s) dated {today}");
    Ok(())
}

fn send_command(config: &Config, command: ControlCommand) -> Result<()> {
    let queue = FileCommandQueue::new(&config.paths.control_dir);
    queue.enqueue(command)?;
    println!(
        "Requested '{command}' ({})",
        queue.marker_path(command).display()
    );
    Ok(())
}
