//! Human-facing status lines.
//!
//! Everything here goes to stderr; stdout is reserved for data.

use crate::output::is_quiet;
use crate::ui::{theme, Icons};
use owo_colors::OwoColorize;

pub fn success(label: &str) {
    if is_quiet() {
        return;
    }
    eprintln!("{} {}", Icons::CHECK, label.style(theme().success.clone()));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(theme().error.clone()));
}

pub fn info(label: &str, value: &str) {
    if is_quiet() {
        return;
    }
    eprintln!(
        "{} {}: {}",
        Icons::INFO.style(theme().info.clone()),
        label.style(theme().dim.clone()),
        value
    );
}

pub fn section(icon: &str, title: &str) {
    if is_quiet() {
        return;
    }
    eprintln!();
    eprintln!("{} {}", icon, title.style(theme().header.clone()));
}

pub fn summary_row(label: &str, value: &str) {
    if is_quiet() {
        return;
    }
    eprintln!("  {} {}", label.style(theme().dim.clone()), value);
}
