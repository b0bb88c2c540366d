//! Cloner CLI - cloner command

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use tracing::Level;

mod cmd;

/// Cloner - place a browser download where a shared code says it belongs
#[derive(Parser)]
#[command(name = "cloner")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the file behind a code and copy it into place
    Place {
        /// Code of the form URL|destination (prompted for if omitted)
        code: Option<String>,
        /// Read the code from the clipboard
        #[arg(long, conflicts_with = "code")]
        from_clipboard: bool,
        /// Open the destination folder once the file is placed
        #[arg(long)]
        open: bool,
        /// Give up after this many seconds (0 = wait forever)
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Generate a code for a URL and destination path
    Generate {
        /// Download URL
        url: String,
        /// Destination directory (may contain %USER% or ~)
        path: String,
        /// Rewrite a path under your home directory to %USER%
        #[arg(long)]
        portable: bool,
        /// Print the code without copying it to the clipboard
        #[arg(long)]
        no_copy: bool,
    },
    /// View and edit configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// List all configuration values
    List,
    /// Get a single value
    Get {
        /// Key, e.g. watch.debounce_ms
        key: String,
    },
    /// Set a single value
    Set {
        /// Key, e.g. watch.debounce_ms
        key: String,
        /// New value
        value: String,
    },
    /// Show the config file path
    Path {
        /// Create the file with defaults if missing
        #[arg(long)]
        create: bool,
    },
    /// Show an annotated example configuration
    Example,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Place { code, from_clipboard, open, timeout } => {
            cmd::place::run(code, from_clipboard, open, timeout).await
        }
        Commands::Generate { url, path, portable, no_copy } => {
            cmd::generate::run(&url, &path, portable, no_copy).await
        }
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::List => cmd::config::run_list().await,
            ConfigCommands::Get { key } => cmd::config::run_get(&key).await,
            ConfigCommands::Set { key, value } => cmd::config::run_set(&key, &value).await,
            ConfigCommands::Path { create } => cmd::config::run_path(create).await,
            ConfigCommands::Example => cmd::config::run_example().await,
        },
    }
}
