//! Terminal output for CLI commands

use colored::{ColoredString, Colorize};

#[derive(Debug, Clone, Copy)]
enum Level {
    Success,
    Error,
    Warn,
    Info,
}

impl Level {
    fn marker(self) -> ColoredString {
        match self {
            Level::Success => "✓".green(),
            Level::Error => "✗".red(),
            Level::Warn => "⚠".yellow(),
            Level::Info => "ℹ".blue(),
        }
    }
}

fn emit(level: Level, message: &str) {
    match level {
        Level::Error => eprintln!("{} {}", level.marker(), message),
        _ => println!("{} {}", level.marker(), message),
    }
}

pub fn success(message: &str) {
    emit(Level::Success, message);
}

/// Errors go to stderr
pub fn error(message: &str) {
    emit(Level::Error, message);
}

pub fn warn(message: &str) {
    emit(Level::Warn, message);
}

pub fn info(message: &str) {
    emit(Level::Info, message);
}

/// An indented `label: value` line under a status message
pub fn detail(label: &str, value: &str) {
    println!("  {} {}", format!("{}:", label).dimmed(), value);
}
