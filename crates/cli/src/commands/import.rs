//! `commitcensus import`: load raw commit payloads from a JSON file.
//!
//! Accepts the payloads exactly as the platform API returns them, either a
//! bare array or an Azure DevOps style `{ "value": [...] }` page.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde_json::Value;

use commitcensus_core::config::AppConfig;
use commitcensus_core::db::Database;
use commitcensus_core::identity::RawCommitRecord;
use commitcensus_core::models::Platform;
use commitcensus_core::platforms::http::page_items;
use commitcensus_core::platforms::RepositorySelector;

use crate::style;

pub fn run_import(
    db: &Database,
    config: &AppConfig,
    platform: Platform,
    repo: &str,
    file: &Path,
    replace: bool,
) -> Result<()> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let document: Value = serde_json::from_str(&contents)
        .with_context(|| format!("{} is not valid JSON", file.display()))?;
    let payloads = page_items(document).map_err(|e| anyhow!("{}: {e}", file.display()))?;

    let malformed = payloads
        .iter()
        .filter(|p| RawCommitRecord::from_value(platform, (*p).clone()).is_err())
        .count();

    let selected = RepositorySelector::from_config(config, platform).is_selected(repo);
    db.upsert_repository(platform, repo, None, selected)
        .context("failed to record repository")?;
    let stored = if replace {
        db.replace_commits(platform, repo, &payloads)
    } else {
        db.insert_commits(platform, repo, &payloads)
    }
    .context("failed to store commits")?;
    db.mark_fetched(platform, repo)
        .context("failed to update repository")?;

    println!(
        "{}",
        style::success(&format!(
            "{} {}: {} payload(s) read, {} stored",
            platform.label(),
            repo,
            payloads.len(),
            stored
        ))
    );
    if malformed > 0 {
        println!(
            "{}",
            style::warn(&format!(
                "{malformed} payload(s) do not look like {} commits and will be skipped when counting",
                platform.label()
            ))
        );
    }
    if !selected {
        println!(
            "{}",
            style::warn(&format!(
                "{repo} does not match the configured repository patterns and is not counted"
            ))
        );
    }
    Ok(())
}
