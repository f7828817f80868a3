//! `commitcensus init`: write a commented default configuration.

use std::path::Path;

use anyhow::{Context, Result};

use crate::style;

pub const DEFAULT_CONFIG: &str = r#"# commitcensus configuration
#
# Tokens are never stored here: each platform names the environment
# variable holding its API token.

[census]
# Rolling window, in days, ending now.
window_days = 90
data_dir = ".commitcensus"
report_dir = "census-report"
# trace, debug, info, warn, error (overridden by -v and --log-level)
log_level = "warn"

[http]
max_retries = 3
retry_base_delay_ms = 1000
timeout_secs = 30
page_size = 100

[github]
token_env = "GITHUB_TOKEN"
# Organization or user; without it, the token owner's repositories.
# owner = "my-org"
# Glob patterns choosing repositories; empty selects all.
# repositories = ["my-org/*"]
# A single pattern, optionally /pattern/flags, or a file with one per line.
# exclude_pattern = "/@users\\.noreply\\.github\\.com$/i"
# exclude_file = "exclude-github.txt"

[gitlab]
token_env = "GITLAB_TOKEN"
# api_url = "https://gitlab.example.com/api/v4"
# owner = "my-group"
# exclude_pattern = "/@(gmail|hotmail)\\.com$/i"

[azure_devops]
enabled = false
token_env = "AZURE_DEVOPS_TOKEN"
# Azure DevOps always needs the organization.
owner = "my-organization"
"#;

/// Write [`DEFAULT_CONFIG`] to `output`, refusing to overwrite.
pub fn run_init(output: &Path) -> Result<()> {
    if output.exists() {
        anyhow::bail!(
            "file already exists: {}. Use a different path or remove the existing file.",
            output.display()
        );
    }

    std::fs::write(output, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!(
        "{}",
        style::success(&format!("Default configuration written to {}", output.display()))
    );
    println!();
    println!("Next steps:");
    println!("  1. Enable the platforms you use and set their owners");
    println!("  2. Export the token variables (GITHUB_TOKEN, GITLAB_TOKEN, ...)");
    println!(
        "  3. Validate with: commitcensus validate --config {}",
        output.display()
    );
    println!("  4. Count: commitcensus run --config {}", output.display());

    Ok(())
}
