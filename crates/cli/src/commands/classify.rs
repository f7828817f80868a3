//! `commitcensus classify`: check an email against a platform's rules.

use anyhow::{Context, Result};

use commitcensus_core::config::AppConfig;
use commitcensus_core::models::Platform;
use commitcensus_core::rules::ExclusionRules;

use crate::style;

pub fn run_classify(config: &AppConfig, email: &str, platform: Platform) -> Result<()> {
    let rules = ExclusionRules::from_config(config).context("failed to load exclusion rules")?;
    // Emails are lowercased before classification during aggregation too.
    let email = email.trim().to_lowercase();
    let class = rules.classify(&email, platform);

    println!("  Email     : {email}");
    println!("  Platform  : {}", platform.label());
    println!("  Result    : {}", style::classification(class));

    match rules.get(platform) {
        Some(set) => {
            if let Some(pattern) = set.matching_pattern(&email) {
                println!("  Matched   : {pattern}");
            }
            println!("  Rule set  : {} pattern(s)", set.len());
        }
        None => println!("  Rule set  : {}", style::dim("no exclusion rules")),
    }
    Ok(())
}
