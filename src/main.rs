//! Meetime CLI - sessions API server and Meet tab tracker

use clap::Parser;
use meetime::config::{expand_path, LoggingConfig};
use meetime::tracker::{state::StateFile, status};
use meetime::{Config, Core};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "meetime")]
#[command(author = "Meetime Team")]
#[command(version)]
#[command(about = "Meetime - Google Meet time tracking", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "~/.meetime/config.toml")]
    config: PathBuf,

    /// Run the tab tracker instead of the API server
    #[arg(long, conflicts_with = "status")]
    track: bool,

    /// Print the tracker's current session status and exit
    #[arg(long)]
    status: bool,

    /// Override server port
    #[arg(short, long)]
    port: Option<u16>,

    /// Override server host
    #[arg(long)]
    host: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Initialize a new config file with defaults
    #[arg(long)]
    init: bool,
}

/// Install the tracing subscriber: stdout, plus a daily-rolling file when configured.
///
/// The returned guard must live until exit so buffered file logs are flushed.
fn init_logging(logging: &LoggingConfig, verbose: bool) -> anyhow::Result<Option<WorkerGuard>> {
    let log_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("meetime={},tower_http=debug", log_level).into());

    let (file_layer, guard) = match &logging.file_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::Builder::new()
                .rotation(Rotation::DAILY)
                .max_log_files(logging.max_files)
                .filename_prefix("meetime")
                .filename_suffix("log")
                .build(expand_path(dir))?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config_path = expand_path(&args.config);

    // Handle --init flag
    if args.init {
        init_logging(&LoggingConfig::default(), args.verbose)?;
        if config_path.exists() {
            tracing::warn!("Config file already exists: {}", config_path.display());
            return Ok(());
        }
        Config::create_default(&config_path)?;
        tracing::info!("Created default config at: {}", config_path.display());
        return Ok(());
    }

    // Load configuration
    let config_found = config_path.exists();
    let mut config = if config_found {
        Config::from_file(&config_path)?
    } else {
        Config::default()
    };
    config.apply_env_overrides();

    // Apply CLI overrides
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host) = args.host {
        config.server.host = host;
    }

    if args.status {
        let state = StateFile::new(config.tracker_state_path()).load()?;
        match state {
            Some(state) => println!(
                "{}",
                status::status_report(
                    &state,
                    chrono::Utc::now(),
                    config.tracker.dashboard_url.as_deref()
                )
            ),
            None => println!("Tracker has not run yet (no state at {})", config.tracker_state_path().display()),
        }
        return Ok(());
    }

    let _log_guard = init_logging(&config.logging, args.verbose)?;
    if !config_found {
        tracing::warn!(
            "Config file not found at {}, using defaults",
            config_path.display()
        );
    }

    if args.track {
        tracing::info!("Starting tracker mode");
        meetime::tracker::run_tracker(&config).await?;
    } else {
        tracing::info!("Starting HTTP server mode");
        let core = Core::new(config)?;
        core.start_api_server().await?;
    }

    Ok(())
}
