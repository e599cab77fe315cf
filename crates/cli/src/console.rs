//! Terminal notifications

use colored::Colorize;
use dlfmt_core::port::Notifier;

/// Prints notifications to stderr, keeping stdout free for formatted text
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn info(&self, message: &str) {
        eprintln!("{} {}", "✓".green().bold(), message);
    }

    fn error(&self, message: &str) {
        eprintln!("{} {}", "✗".red().bold(), message.red());
    }
}
