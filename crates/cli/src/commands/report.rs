//! `commitcensus report`: evaluate the census from stored commits.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;

use commitcensus_core::config::AppConfig;
use commitcensus_core::db::Database;
use commitcensus_core::models::Platform;
use commitcensus_core::report::{JsonReportSink, SinkFanout};
use commitcensus_core::rules::ExclusionRules;
use commitcensus_core::Census;

use crate::style;
use crate::table_sink::TableSink;

#[derive(Debug, Default)]
pub struct ReportOptions {
    /// Overrides `census.report_dir`.
    pub json_dir: Option<PathBuf>,
    pub show_repositories: bool,
    pub show_excluded: bool,
}

pub fn run_report(
    db: &Database,
    config: &AppConfig,
    platforms: &[Platform],
    options: &ReportOptions,
) -> Result<()> {
    let rules = ExclusionRules::from_config(config).context("failed to load exclusion rules")?;
    for &platform in platforms {
        let Some(set) = rules.get(platform) else {
            continue;
        };
        for rejected in set.rejected() {
            println!(
                "{}",
                style::warn(&format!(
                    "{}: ignored exclusion pattern '{}': {}",
                    platform.label(),
                    rejected.source,
                    rejected.reason
                ))
            );
        }
    }

    let json_dir = options
        .json_dir
        .clone()
        .unwrap_or_else(|| config.census.report_dir.clone());
    let mut table = TableSink::new(options.show_repositories, options.show_excluded);
    let mut json = JsonReportSink::new(json_dir);

    let report = {
        let mut fanout = SinkFanout::new();
        fanout.push(&mut table);
        fanout.push(&mut json);
        Census::from_config(db, &rules, config, Utc::now())
            .evaluate(platforms, &mut fanout)
            .context("census failed")?
    };

    println!();
    table.print_summary();

    println!(
        "{}",
        style::success(&format!(
            "{} contributors across {} platform(s); reports in {}",
            report.summary.total_unique_contributors,
            report.platforms.len(),
            json.dir().display()
        ))
    );
    for path in json.written() {
        println!("  {}", style::dim(&path.display().to_string()));
    }
    Ok(())
}
