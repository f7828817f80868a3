//! `commitcensus validate`: check a configuration file and summarize it.

use std::path::Path;

use anyhow::{Context, Result};

use commitcensus_core::config::{default_token_env, AppConfig};
use commitcensus_core::rules::ExclusionRules;

use crate::style;

pub fn run_validate(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {}", config_path.display());
    println!();

    let mut config =
        AppConfig::load_from_file(config_path).context("failed to parse configuration")?;
    println!("  {}", style::success("TOML structure is valid"));

    config
        .resolve_env_vars()
        .context("failed to resolve environment variables")?;
    println!("  {}", style::success("Environment variable references processed"));

    if let Err(e) = config.validate() {
        println!("  {}", style::error(&format!("Validation error: {}", e)));
        anyhow::bail!("configuration validation failed");
    }
    println!("  {}", style::success("All required fields are valid"));

    let rules = ExclusionRules::from_config(&config).context("failed to load exclusion rules")?;
    println!("  {}", style::success("Exclusion rules loaded"));

    println!();
    println!("{}", style::header("Configuration summary"));
    println!("  Window        : {} days", config.census.window_days);
    println!("  Data directory: {}", config.census.data_dir.display());
    println!("  Report dir    : {}", config.census.report_dir.display());
    println!(
        "  HTTP          : {} retries, {}s timeout, {} per page",
        config.http.max_retries, config.http.timeout_secs, config.http.page_size
    );

    let enabled = config.enabled_platforms();
    if enabled.is_empty() {
        println!();
        println!("  {}", style::warn("No platforms are enabled"));
    }

    for platform in enabled {
        let section = config.platform(platform);
        let token_env = section
            .token_env
            .as_deref()
            .unwrap_or(default_token_env(platform));

        println!();
        println!("  {}", style::header(platform.label()));
        println!("    API URL     : {}", config.api_url(platform));
        println!(
            "    Owner       : {}",
            section.owner.as_deref().unwrap_or("(token owner)")
        );
        println!(
            "    Token       : {} ({})",
            style::presence(section.token.is_some()),
            token_env
        );
        if section.repositories.is_empty() {
            println!("    Repositories: all");
        } else {
            println!("    Repositories: {}", section.repositories.join(", "));
        }

        match rules.get(platform) {
            Some(set) => {
                println!("    Exclusions  : {} pattern(s)", set.len());
                for rejected in set.rejected() {
                    println!(
                        "      {}",
                        style::warn(&format!("ignored '{}': {}", rejected.source, rejected.reason))
                    );
                }
            }
            None => println!("    Exclusions  : none"),
        }
    }

    println!();
    println!("Configuration is valid.");
    Ok(())
}
