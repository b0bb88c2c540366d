//! Shared utilities for CLI commands

use std::io::{self, BufRead, IsTerminal, Write};

/// Format file size in human-readable format
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Whether stdin is attached to a terminal
pub fn is_interactive() -> bool {
    io::stdin().is_terminal()
}

/// Print `prompt` and read one line from `input`, without its line ending
pub fn read_line<R: BufRead>(prompt: &str, input: &mut R) -> io::Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Ask a yes/no question; anything but `y`/`yes` is no
pub fn confirm<R: BufRead>(prompt: &str, input: &mut R) -> io::Result<bool> {
    let answer = read_line(&format!("{} [y/N] ", prompt), input)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
