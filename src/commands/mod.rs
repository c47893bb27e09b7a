pub mod import;
pub mod init;
pub mod log;
pub mod mapping;
pub mod tickets;
pub mod timer;
pub mod uploads;

use anyhow::Result;
use std::io::{self, BufRead, Write};

/// `3725` → `1h 2m 5s`.
pub fn format_hms(total_seconds: i64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{}h {}m {}s", hours, minutes, seconds)
}

/// Prompts on stdout, reads one line; only `y`/`yes` confirms.
pub fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(
        answer.trim().to_lowercase().as_str(),
        "y" | "yes"
    ))
}
