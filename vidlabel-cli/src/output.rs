// vidlabel-cli/src/output.rs
//
// Colored terminal output for command results. Log lines go through the
// logger; these helpers print the user-facing report on stdout.

use std::fmt::Display;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;

/// Print a heading with colored styling and clear separation
pub fn print_heading(text: &str) {
    let line = "=".repeat(50);
    println!("\n{}", line.bright_blue());
    println!(" {}", text.bold().bright_white());
    println!("{}", line.bright_blue());
}

/// Print an info line with label and value, with the label colored
pub fn print_info<T: Display>(label: &str, value: T) {
    println!("  {}: {}", label.bright_cyan(), value);
}

pub fn print_success(message: &str) {
    println!("{} {}", "[OK]".green().bold(), message);
}

pub fn print_warning(message: &str) {
    println!("{} {}", "[WARN]".yellow().bold(), message);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "[ERROR]".bright_red().bold(), message);
}

/// Spinner shown while ffmpeg runs. Hidden automatically when stderr is not a terminal.
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed_precise}]") {
        pb.set_style(style);
    }
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}
