//! Terminal report sink rendering census results as tables.

use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, Color, ContentArrangement, Table};

use commitcensus_core::aggregate::{PlatformContributors, Summary};
use commitcensus_core::errors::ReportError;
use commitcensus_core::models::{Platform, RepositoryContributors};
use commitcensus_core::ReportSink;

use crate::style;

/// Prints each platform's contributors once the platform is complete and the
/// cross-platform summary at the end.
pub struct TableSink {
    /// Also list every repository's contributors.
    show_repositories: bool,
    /// Also list excluded contributors.
    show_excluded: bool,
    last_summary: Option<Summary>,
}

impl TableSink {
    pub fn new(show_repositories: bool, show_excluded: bool) -> Self {
        Self {
            show_repositories,
            show_excluded,
            last_summary: None,
        }
    }

    /// Print the summary table for the most recent fold.
    pub fn print_summary(&self) {
        let Some(summary) = &self.last_summary else {
            println!("{}", style::dim("No platforms evaluated."));
            return;
        };
        println!("{}", style::header("Summary"));
        println!("{}", summary_table(summary));
        println!();
    }
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header);
    table
}

fn number(n: impl ToString) -> Cell {
    Cell::new(n.to_string()).set_alignment(CellAlignment::Right)
}

fn email_cell(email: &str) -> Cell {
    if email.is_empty() {
        Cell::new("(no email)").fg(Color::DarkGrey)
    } else {
        Cell::new(email)
    }
}

/// Contributors of one platform, with the repositories each appears in.
pub fn platform_table(result: &PlatformContributors, excluded: bool) -> Table {
    let mut table = new_table(vec!["Name", "Email", "Repos", "Repositories"]);
    let entries = if excluded {
        &result.excluded
    } else {
        &result.included
    };
    for contributor in entries.values() {
        let repos: Vec<&str> = contributor.repositories.iter().map(String::as_str).collect();
        table.add_row(vec![
            Cell::new(&contributor.name),
            email_cell(&contributor.email),
            number(repos.len()),
            Cell::new(repos.join(", ")),
        ]);
    }
    table
}

/// Per-platform counts and the total.
pub fn summary_table(summary: &Summary) -> Table {
    let mut table = new_table(vec![
        "Platform",
        "Contributors",
        "Selected repos",
        "Total repos",
    ]);
    for platform in Platform::ALL {
        let counts = summary.counts(platform);
        table.add_row(vec![
            Cell::new(platform.label()),
            number(counts.contributors),
            number(counts.selected_repositories),
            number(counts.total_repositories),
        ]);
    }
    table.add_row(vec![
        Cell::new("Total").fg(Color::Cyan),
        number(summary.total_unique_contributors).fg(Color::Cyan),
        Cell::new(""),
        Cell::new(""),
    ]);
    table
}

impl ReportSink for TableSink {
    fn repository(
        &mut self,
        platform: Platform,
        result: &RepositoryContributors,
    ) -> Result<(), ReportError> {
        if !self.show_repositories {
            return Ok(());
        }
        println!(
            "{}",
            style::dim(&format!(
                "{} {}: {} included, {} excluded",
                platform.label(),
                result.repo_path,
                result.included.len(),
                result.excluded.len()
            ))
        );
        let mut table = new_table(vec!["Name", "Email", "Commits"]);
        for contributor in result.included.values() {
            table.add_row(vec![
                Cell::new(&contributor.name),
                email_cell(&contributor.email),
                number(contributor.commit_count),
            ]);
        }
        if !result.included.is_empty() {
            println!("{table}");
        }
        Ok(())
    }

    fn platform(&mut self, result: &PlatformContributors) -> Result<(), ReportError> {
        println!();
        println!(
            "{}",
            style::header(&format!(
                "{} contributors ({})",
                result.platform.label(),
                result.included_count()
            ))
        );
        if result.included.is_empty() {
            println!("{}", style::dim("  none in the window"));
        } else {
            println!("{}", platform_table(result, false));
        }

        if self.show_excluded && !result.excluded.is_empty() {
            println!(
                "{}",
                style::header(&format!(
                    "{} excluded ({})",
                    result.platform.label(),
                    result.excluded_count()
                ))
            );
            println!("{}", platform_table(result, true));
        }
        Ok(())
    }

    fn summary(&mut self, summary: &Summary) -> Result<(), ReportError> {
        self.last_summary = Some(summary.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commitcensus_core::models::{Contributor, ContributorSets, NormalizedContributor};

    #[test]
    fn test_summary_table_lists_every_platform() {
        let mut summary = Summary::new();
        summary.fold_platform(Platform::GitLab, 5, 2, 4);
        summary.fold_platform(Platform::GitHub, 3, 1, 1);

        let rendered = summary_table(&summary).to_string();
        assert!(rendered.contains("GitHub"));
        assert!(rendered.contains("Azure DevOps"));
        assert!(rendered.contains("Total"));
        assert!(rendered.contains('8'));
    }

    #[test]
    fn test_platform_table_marks_missing_email() {
        let contributor = Contributor::first_seen(NormalizedContributor {
            name: "Carol".into(),
            email: String::new(),
        });
        let mut sets = ContributorSets::default();
        sets.excluded.insert(contributor.key(), contributor);
        let repo = RepositoryContributors::new("acme/api", sets);
        let union = PlatformContributors::from_repositories(Platform::GitLab, [&repo]);

        let rendered = platform_table(&union, true).to_string();
        assert!(rendered.contains("Carol"));
        assert!(rendered.contains("(no email)"));
        assert!(rendered.contains("acme/api"));
    }

    #[test]
    fn test_sink_keeps_last_summary() {
        let mut sink = TableSink::new(false, false);
        let mut summary = Summary::new();
        summary.fold_platform(Platform::GitHub, 2, 1, 1);
        sink.summary(&summary).unwrap();
        assert_eq!(
            sink.last_summary.as_ref().unwrap().total_unique_contributors,
            2
        );
    }
}
