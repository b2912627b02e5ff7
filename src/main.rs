use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mailbox_notifier::app::{daemon, Config};
use mailbox_notifier::ipc::{self, BusMessage};
use mailbox_notifier::store::AccountId;

/// Mailbox Notifier - new mail notifications for the mail sync daemon
#[derive(Parser)]
#[command(name = "mailbox-notifier")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error), defaults to the configured level
    #[arg(short, long)]
    log_level: Option<String>,

    /// Configuration file
    #[arg(short, long, env = "MAILBOX_NOTIFIER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the notification daemon (default)
    Run,
    /// Send a raw JSON bus message to the daemon
    Send {
        /// Message, e.g. {"type":"combined_inbox_displayed"}
        json: String,
    },
    /// Tell the daemon the mail UI entered or left the foreground
    Display { state: DisplayState },
    /// Tell the daemon an inbox was shown
    Inbox {
        /// Account whose inbox was shown; the combined inbox when omitted
        #[arg(long)]
        account: Option<u64>,
    },
    /// Print the configuration file path and the effective configuration
    Config,
}

#[derive(Clone, Copy, ValueEnum)]
enum DisplayState {
    Entered,
    Exit,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let level = cli.log_level.clone().unwrap_or_else(|| config.log_level.clone());
    init_logging(&level)?;

    match cli.command {
        Some(Commands::Send { json }) => {
            let message: BusMessage =
                serde_json::from_str(&json).context("Invalid bus message")?;
            send(&config.socket_path, &message)
        }
        Some(Commands::Display { state }) => {
            let message = match state {
                DisplayState::Entered => BusMessage::DisplayEntered,
                DisplayState::Exit => BusMessage::DisplayExit,
            };
            send(&config.socket_path, &message)
        }
        Some(Commands::Inbox { account }) => {
            let message = match account {
                Some(id) => BusMessage::AccountInboxDisplayed { account: AccountId(id) },
                None => BusMessage::CombinedInboxDisplayed,
            };
            send(&config.socket_path, &message)
        }
        Some(Commands::Config) => print_config(cli.config.as_deref(), &config),
        Some(Commands::Run) | None => run_daemon(config),
    }
}

fn run_daemon(config: Config) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(daemon::run(config))
}

fn send(socket_path: &Path, message: &BusMessage) -> Result<()> {
    ipc::send_message(socket_path, message)?;
    info!("Bus message sent");
    Ok(())
}

fn print_config(path: Option<&Path>, config: &Config) -> Result<()> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => Config::config_path()?,
    };
    println!("# {}", path.display());
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let log_dir = directories::ProjectDirs::from("", "", "mailbox-notifier")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| std::env::temp_dir().join("mailbox-notifier"));

    std::fs::create_dir_all(&log_dir)?;
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("mailbox-notifier.log"))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(log_file))
        .init();

    info!("Mailbox Notifier starting");
    Ok(())
}
