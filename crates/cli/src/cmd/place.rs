//! Place a downloaded file from a code

use anyhow::{Context, Result};
use cli_lib::desktop;
use cli_lib::util::{self, format_size};
use cli_lib::{Browser, Coordinator, PlaceError};
use cloner_core::{config as system_config, PathResolver};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use watcher::{SessionConfig, StopHandle};

pub async fn run(code: Option<String>, from_clipboard: bool, open: bool, timeout: Option<u64>) -> Result<()> {
    let code = read_code(code, from_clipboard)?;

    let mut config = system_config::load()?;
    if let Some(secs) = timeout {
        config.watch.timeout_secs = secs;
    }
    config.validate().context("Invalid configuration value")?;

    let resolver = PathResolver::from_env()?;
    let coordinator = Arc::new(Coordinator::new(
        resolver,
        SessionConfig::from(&config.watch),
        Arc::new(Browser),
    ));

    // Reject malformed codes before anything is watched or opened
    let (request, destination) = coordinator.prepare(&code)?;

    println!("{} {}", "Opening".cyan(), request.source_url());
    println!("{} {}", "Destination".cyan(), destination.display());

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    spinner.set_message(format!(
        "Waiting for the download to finish in {} (Ctrl-C to cancel)",
        coordinator.downloads_dir().display()
    ));
    spinner.enable_steady_tick(Duration::from_millis(120));

    let stop = StopHandle::new();
    let placing = coordinator.clone().place_async(code, stop.clone());
    tokio::pin!(placing);

    let result = tokio::select! {
        result = &mut placing => result,
        _ = tokio::signal::ctrl_c() => {
            spinner.set_message("Stopping...");
            stop.stop();
            placing.await
        }
    };
    spinner.finish_and_clear();

    match result {
        Ok(placement) => {
            println!("{} Placed {}", "✓".green(), placement.file.display());
            println!(
                "  {} {}",
                format_size(placement.bytes).dimmed(),
                format!("from {}", placement.source.display()).dimmed()
            );
            offer_open(&placement.destination, open)?;
            Ok(())
        }
        Err(PlaceError::Stopped) => {
            println!("{}", "Cancelled, nothing was placed".yellow());
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn read_code(code: Option<String>, from_clipboard: bool) -> Result<String> {
    let code = match code {
        Some(code) => code,
        None if from_clipboard => desktop::read_clipboard().context("Failed to read the clipboard")?,
        None => {
            let stdin = std::io::stdin();
            util::read_line("Paste code (URL|destination): ", &mut stdin.lock())
                .context("Failed to read code")?
        }
    };

    Ok(code.trim().to_string())
}

/// Open the destination folder, on request or after asking
fn offer_open(destination: &Path, open: bool) -> Result<()> {
    let wanted = if open {
        true
    } else if util::is_interactive() {
        let stdin = std::io::stdin();
        util::confirm("Open the destination folder?", &mut stdin.lock())?
    } else {
        println!("  {} {}", "Folder:".dimmed(), destination.display());
        false
    };

    if wanted {
        if let Err(e) = desktop::open_folder(destination) {
            eprintln!("{} {}", "!".yellow(), e);
        }
    }

    Ok(())
}
