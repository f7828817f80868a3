//! Shared styling utilities for terminal output.

use console::Style;

use commitcensus_core::rules::Classification;

/// Create a success-styled string (green with checkmark).
pub fn success(msg: &str) -> String {
    let style = Style::new().green();
    format!("{} {}", style.apply_to("✓"), msg)
}

/// Create an error-styled string (red with cross).
pub fn error(msg: &str) -> String {
    let style = Style::new().red();
    format!("{} {}", style.apply_to("✗"), msg)
}

/// Create a warning-styled string (yellow).
pub fn warn(msg: &str) -> String {
    let style = Style::new().yellow();
    format!("{} {}", style.apply_to("⚠"), msg)
}

/// Create a header-styled string (bold).
pub fn header(msg: &str) -> String {
    let style = Style::new().bold();
    style.apply_to(msg).to_string()
}

/// Create a dim-styled string.
pub fn dim(msg: &str) -> String {
    let style = Style::new().dim();
    style.apply_to(msg).to_string()
}

/// Classification label: included (green), excluded (red).
pub fn classification(class: Classification) -> String {
    match class {
        Classification::Included => Style::new().green().bold().apply_to("included").to_string(),
        Classification::Excluded => Style::new().red().bold().apply_to("excluded").to_string(),
    }
}

/// `set` or `NOT SET`, for secrets.
pub fn presence(is_set: bool) -> String {
    if is_set {
        Style::new().green().apply_to("set").to_string()
    } else {
        Style::new().yellow().apply_to("NOT SET").to_string()
    }
}
