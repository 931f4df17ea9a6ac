//! Consistent colored terminal output for the mentionbot CLI.
//!
//! Colors are automatically disabled when stdout/stderr is not a TTY.

use colored::Colorize;

/// Format a header line: "=== Title ==="
pub fn header(title: &str) -> String {
    format!("=== {} ===", title.bold())
}

/// Format the backend line: "mentionbot: openai gpt-4"
pub fn provider_header(provider: &str, model: &str) -> String {
    format!("{}: {} {}", "mentionbot".bold().cyan(), provider.bold(), model.dimmed())
}

/// Yellow warning + message
pub fn warning(msg: &str) -> String {
    format!("{} {}", "⚠".yellow().bold(), msg)
}

/// Dim info/hint message
pub fn hint(msg: &str) -> String {
    format!("{}", msg.dimmed())
}

/// Format a key-value summary line with aligned values
pub fn summary_line(key: &str, value: &str) -> String {
    format!("  {:<20} {}", format!("{}:", key).dimmed(), value)
}

