//! Generate a shareable code

use anyhow::Result;
use cli_lib::desktop;
use cloner_core::{generate_code, PathResolver};
use owo_colors::OwoColorize;

pub async fn run(url: &str, path: &str, portable: bool, no_copy: bool) -> Result<()> {
    let path = if portable {
        PathResolver::from_env()?.portable(path)
    } else {
        path.to_string()
    };

    let code = generate_code(url, &path)?;
    println!("{}", code);

    if !no_copy {
        match desktop::copy_to_clipboard(&code) {
            Ok(()) => eprintln!("{} Code copied to the clipboard", "✓".green()),
            Err(e) => eprintln!("{} Could not copy to the clipboard: {}", "!".yellow(), e),
        }
    }

    Ok(())
}
