//! `commitcensus collect`: fetch commits into the database.

use anyhow::{Context, Result};
use chrono::Utc;

use commitcensus_core::config::AppConfig;
use commitcensus_core::db::Database;
use commitcensus_core::errors::PlatformError;
use commitcensus_core::models::Platform;
use commitcensus_core::platforms::{CollectionOutcome, Collector, PlatformClient};

use super::spinner;
use crate::style;

/// Run a collection pass per platform. A platform that fails does not stop
/// the others; the command fails only if every platform failed.
pub async fn run_collect(
    db: &Database,
    config: &AppConfig,
    platforms: &[Platform],
    refresh: bool,
) -> Result<()> {
    let collector = Collector::new(db, config).with_refresh(refresh);
    let now = Utc::now();
    let mut failed = 0;

    println!();
    for &platform in platforms {
        let label = platform.label();
        let client = match PlatformClient::from_config(platform, config) {
            Ok(client) => client,
            Err(e) => {
                println!("{}", style::error(&format!("{label}: {e}")));
                failed += 1;
                continue;
            }
        };

        let progress = spinner(format!("{label}: listing repositories..."));
        let result = collector
            .collect(&client, now, |repo| {
                progress.set_message(format!("{label}: fetching {}", repo.path));
            })
            .await;
        progress.finish_and_clear();

        match result {
            Ok(outcome) => print_outcome(&outcome),
            Err(PlatformError::DatabaseError(e)) => {
                return Err(e).context("database error during collection");
            }
            Err(e) => {
                println!("{}", style::error(&format!("{label}: {e}")));
                failed += 1;
            }
        }
    }
    println!();

    if failed > 0 && failed == platforms.len() {
        anyhow::bail!("collection failed for every platform");
    }
    Ok(())
}

fn print_outcome(outcome: &CollectionOutcome) {
    let label = outcome.platform.label();
    let line = format!(
        "{label}: {} listed, {} selected, {} fetched, {} already fetched, {} commits stored",
        outcome.listed, outcome.selected, outcome.fetched, outcome.skipped, outcome.commits_stored
    );
    if outcome.failures.is_empty() {
        println!("{}", style::success(&line));
    } else {
        println!("{}", style::warn(&line));
        for failure in &outcome.failures {
            println!(
                "    {}",
                style::error(&format!("{}: {}", failure.path, failure.error))
            );
        }
    }
}
