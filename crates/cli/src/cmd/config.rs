//! Configuration management command
//!
//! Provides CLI interface to view and edit the watcher configuration.

use anyhow::{Context, Result};
use cloner_core::config::{self as system_config, Config};
use owo_colors::OwoColorize;

/// List all configuration values
pub async fn run_list() -> Result<()> {
    let config = system_config::load()?;
    let config_path = system_config::config_file_path()
        .context("Could not determine config file path")?;
    let watch = &config.watch;

    println!("{}", "Configuration".bold());
    println!("{}: {}\n", "Location".dimmed(), config_path.display().dimmed());

    println!("{}", "[watch]".yellow());
    println!(
        "  {} = {} {}",
        "debounce_ms".cyan(),
        watch.debounce_ms,
        format!("({:.1}s quiet before checking)", watch.debounce_ms as f64 / 1000.0).dimmed()
    );
    println!(
        "  {} = {}",
        "poll_interval_ms".cyan(),
        watch.poll_interval_ms
    );
    println!(
        "  {} = {} {}",
        "stability_rounds".cyan(),
        watch.stability_rounds,
        format!(
            "({:.1}s of unchanged size required)",
            (watch.poll_interval_ms * u64::from(watch.stability_rounds)) as f64 / 1000.0
        )
        .dimmed()
    );
    println!(
        "  {} = {} {}",
        "timeout_secs".cyan(),
        watch.timeout_secs,
        if watch.timeout_secs == 0 {
            "(wait forever)".dimmed().to_string()
        } else {
            format!("({} min)", watch.timeout_secs / 60).dimmed().to_string()
        }
    );
    println!(
        "  {} = {}",
        "in_progress_suffixes".cyan(),
        watch.in_progress_suffixes.join(",")
    );

    println!("\n{}", "Valid Ranges:".bold());
    println!("  debounce_ms: 10-60000");
    println!("  poll_interval_ms: 10-60000");
    println!("  stability_rounds: 1-100");
    println!("  timeout_secs: 0-86400 (0 = wait forever)");
    println!("  in_progress_suffixes: comma-separated, each starting with '.'");

    Ok(())
}

/// Get a single configuration value
pub async fn run_get(key: &str) -> Result<()> {
    let config = system_config::load()?;
    println!("{}", get_value(&config, key)?);
    Ok(())
}

/// Set a configuration value
pub async fn run_set(key: &str, value: &str) -> Result<()> {
    let mut config = system_config::load()?;

    set_value(&mut config, key, value)?;

    // Validate before saving
    config.validate()
        .context("Invalid configuration value")?;

    system_config::save(&config)?;

    println!("{} {} = {}", "✓".green(), key.cyan(), value);
    Ok(())
}

/// Show the config file path and optionally create it
pub async fn run_path(create: bool) -> Result<()> {
    let config_path = system_config::config_file_path()
        .context("Could not determine config file path")?;

    if create && !config_path.exists() {
        system_config::init_if_missing()?;
        println!("{} Created config file at: {}", "✓".green(), config_path.display());
    } else {
        println!("{}", config_path.display());
        if !config_path.exists() {
            println!("{}", "File does not exist. Use --create to create it.".yellow());
        }
    }

    Ok(())
}

/// Show example configuration
pub async fn run_example() -> Result<()> {
    println!("{}", system_config::example_config());
    Ok(())
}

fn get_value(config: &Config, key: &str) -> Result<String> {
    let watch = &config.watch;

    let value = match key {
        "watch.debounce_ms" => watch.debounce_ms.to_string(),
        "watch.poll_interval_ms" => watch.poll_interval_ms.to_string(),
        "watch.stability_rounds" => watch.stability_rounds.to_string(),
        "watch.timeout_secs" => watch.timeout_secs.to_string(),
        "watch.in_progress_suffixes" => watch.in_progress_suffixes.join(","),
        _ => anyhow::bail!(
            "Unknown config key: {}. Use 'cloner config list' to see available keys.",
            key
        ),
    };

    Ok(value)
}

fn set_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    let watch = &mut config.watch;

    match key {
        "watch.debounce_ms" => {
            watch.debounce_ms = value.parse()
                .context("Invalid value: must be a positive integer")?;
        }
        "watch.poll_interval_ms" => {
            watch.poll_interval_ms = value.parse()
                .context("Invalid value: must be a positive integer")?;
        }
        "watch.stability_rounds" => {
            watch.stability_rounds = value.parse()
                .context("Invalid value: must be a positive integer")?;
        }
        "watch.timeout_secs" => {
            watch.timeout_secs = value.parse()
                .context("Invalid value: must be a non-negative integer")?;
        }
        "watch.in_progress_suffixes" => {
            watch.in_progress_suffixes = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        _ => anyhow::bail!(
            "Unknown config key: {}. Use 'cloner config list' to see available keys.",
            key
        ),
    }

    Ok(())
}
