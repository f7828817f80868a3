//! `commitcensus status`: collected repositories and the last census run.

use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, ContentArrangement, Table};

use commitcensus_core::config::AppConfig;
use commitcensus_core::db::Database;
use commitcensus_core::models::Platform;

use crate::style;
use crate::table_sink::summary_table;

pub fn run_status(db: &Database, config: &AppConfig) -> Result<()> {
    println!();
    println!("{}", style::header("commitcensus status"));
    println!("{}", "═".repeat(19));
    println!();
    println!("  Database   {}", config.database_path().display());
    println!("  Window     {} days", config.census.window_days);
    println!();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "Platform",
        "Enabled",
        "Token",
        "Selected / total repos",
        "Fetched",
        "Commits stored",
    ]);

    for platform in Platform::ALL {
        let section = config.platform(platform);
        let repos = db
            .list_repositories(platform)
            .context("failed to list repositories")?;
        let (selected, total) = db
            .repository_counts(platform)
            .context("failed to count repositories")?;
        let fetched = repos
            .iter()
            .filter(|r| r.selected && r.fetched_at.is_some())
            .count();
        let commits = db
            .count_commits(platform)
            .context("failed to count commits")?;

        table.add_row(vec![
            Cell::new(platform.label()),
            Cell::new(if section.enabled { "yes" } else { "no" }),
            Cell::new(if !section.enabled {
                "-"
            } else if section.token.is_some() {
                "set"
            } else {
                "NOT SET"
            }),
            Cell::new(format!("{selected} / {total}")).set_alignment(CellAlignment::Right),
            Cell::new(fetched).set_alignment(CellAlignment::Right),
            Cell::new(commits).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("{table}");
    println!();

    match db.last_census_run().context("failed to read census runs")? {
        Some(run) => {
            let platforms: Vec<&str> = run.platforms.iter().map(|p| p.label()).collect();
            println!("  {}", style::header("Last census"));
            println!("  Started    {}", run.started_at);
            println!(
                "  Completed  {}",
                run.completed_at.as_deref().unwrap_or("did not complete")
            );
            println!("  Platforms  {}", platforms.join(", "));
            if let Some(summary) = &run.summary {
                println!("{}", summary_table(summary));
            }
        }
        None => println!(
            "  {}",
            style::dim("No census yet. Run 'commitcensus report' after collecting.")
        ),
    }
    println!();
    Ok(())
}
