//! One-line message helpers.

use super::colors::SemanticStyle;

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".success(), msg);
}

/// Errors go to stderr so piped stdout stays clean.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".error(), msg);
}

pub fn print_warn(msg: &str) {
    println!("{} {}", "⚠".warning(), msg);
}

pub fn print_hint(msg: &str) {
    println!("{} {}", "→".muted(), msg.muted());
}

/// Prints an indented `key: value` pair.
pub fn print_labeled(key: &str, value: &str) {
    println!("  {}: {}", key.muted(), value);
}

pub fn print_spacer() {
    println!();
}
