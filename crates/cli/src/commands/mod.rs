//! Subcommand implementations.

pub mod classify;
pub mod collect;
pub mod import;
pub mod init;
pub mod report;
pub mod status;
pub mod validate;

use anyhow::{bail, Result};
use indicatif::{ProgressBar, ProgressStyle};

use commitcensus_core::config::{section_name, AppConfig};
use commitcensus_core::models::Platform;

/// The requested platform, or every enabled one.
pub fn platforms_to_process(config: &AppConfig, requested: Option<Platform>) -> Result<Vec<Platform>> {
    match requested {
        Some(platform) if config.platform(platform).enabled => Ok(vec![platform]),
        Some(platform) => bail!(
            "{} is not enabled; add a [{}] section to the configuration",
            platform.label(),
            section_name(platform)
        ),
        None => {
            let enabled = config.enabled_platforms();
            if enabled.is_empty() {
                bail!("no platforms are enabled in the configuration");
            }
            Ok(enabled)
        }
    }
}

/// A steadily ticking spinner showing `msg`.
pub fn spinner(msg: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.blue} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
    spinner.set_style(style);
    spinner.set_message(msg);
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));
    spinner
}
