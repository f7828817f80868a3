//! Census orchestration: re-read persisted commits, aggregate them per
//! repository and per platform, fold the summary, and emit to a sink.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::aggregate::{Aggregator, PlatformContributors, Summary};
use crate::config::AppConfig;
use crate::db::Database;
use crate::errors::ReportError;
use crate::models::Platform;
use crate::report::ReportSink;
use crate::rules::ExclusionRules;

/// Everything a census produced.
#[derive(Debug, Clone, Serialize)]
pub struct CensusReport {
    pub platforms: Vec<PlatformContributors>,
    pub summary: Summary,
}

/// Evaluates platforms from the commit database.
///
/// Every evaluation starts from the stored commits; nothing is carried over
/// from earlier evaluations except the running [`Summary`], in which a
/// re-evaluated platform replaces its previous counters.
pub struct Census<'a> {
    db: &'a Database,
    rules: &'a ExclusionRules,
    window_start: Option<DateTime<Utc>>,
    summary: Summary,
}

impl<'a> Census<'a> {
    /// A census over every stored commit.
    pub fn new(db: &'a Database, rules: &'a ExclusionRules) -> Self {
        Self {
            db,
            rules,
            window_start: None,
            summary: Summary::new(),
        }
    }

    /// A census over the configured rolling window ending at `now`.
    pub fn from_config(
        db: &'a Database,
        rules: &'a ExclusionRules,
        config: &AppConfig,
        now: DateTime<Utc>,
    ) -> Self {
        Self::new(db, rules).with_window_start(Some(config.window_start(now)))
    }

    /// Only count commits at or after `start`.
    pub fn with_window_start(mut self, start: Option<DateTime<Utc>>) -> Self {
        self.window_start = start;
        self
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    /// Aggregate one platform's selected repositories.
    ///
    /// Emits each repository result, then the platform union, then the
    /// updated summary. A repository whose stored commits cannot be read
    /// is logged and left out.
    pub fn evaluate_platform(
        &mut self,
        platform: Platform,
        sink: &mut dyn ReportSink,
    ) -> Result<PlatformContributors, ReportError> {
        let aggregator = Aggregator::new(self.rules);
        let repositories = self.db.selected_repositories(platform)?;
        let (selected, total) = self.db.repository_counts(platform)?;
        let mut union = PlatformContributors::new(platform);

        for repo in &repositories {
            let records = match self
                .db
                .load_commit_records(platform, &repo.path, self.window_start)
            {
                Ok(records) => records,
                Err(e) => {
                    warn!(platform = %platform, repo = %repo.path, error = %e, "cannot read stored commits, skipping repository");
                    continue;
                }
            };
            let result = aggregator.aggregate_repository(&repo.path, &records, platform);
            sink.repository(platform, &result)?;
            union.absorb(&result);
        }

        self.summary
            .fold_platform(platform, union.included_count(), selected, total);
        sink.platform(&union)?;
        sink.summary(&self.summary)?;

        info!(
            platform = %platform,
            repositories = repositories.len(),
            included = union.included_count(),
            excluded = union.excluded_count(),
            "platform evaluated"
        );
        Ok(union)
    }

    /// Evaluate `platforms` in order and log the run.
    pub fn evaluate(
        &mut self,
        platforms: &[Platform],
        sink: &mut dyn ReportSink,
    ) -> Result<CensusReport, ReportError> {
        let run_id = self.db.start_census_run(platforms)?;
        let mut results = Vec::with_capacity(platforms.len());
        for &platform in platforms {
            results.push(self.evaluate_platform(platform, sink)?);
        }
        self.db.complete_census_run(run_id, &self.summary)?;

        info!(
            run_id,
            platforms = platforms.len(),
            total = self.summary.total_unique_contributors,
            "census complete"
        );
        Ok(CensusReport {
            platforms: results,
            summary: self.summary.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::MemorySink;
    use crate::rules::RuleSet;
    use chrono::TimeZone;
    use serde_json::json;

    fn setup_db() -> Database {
        let db = Database::in_memory().unwrap();
        db.initialize().unwrap();
        db
    }

    fn commit(id: &str, name: &str, email: &str, date: &str) -> serde_json::Value {
        json!({ "id": id, "author_name": name, "author_email": email, "authored_date": date })
    }

    #[test]
    fn test_evaluate_platform_unions_repositories() {
        let db = setup_db();
        db.upsert_repository(Platform::GitLab, "acme/api", None, true).unwrap();
        db.upsert_repository(Platform::GitLab, "acme/web", None, true).unwrap();
        db.upsert_repository(Platform::GitLab, "acme/old", None, false).unwrap();
        db.insert_commits(
            Platform::GitLab,
            "acme/api",
            &[
                commit("1", "Bob", "bob@co.com", "2025-05-01T00:00:00Z"),
                commit("2", "Alice", "alice@gmail.com", "2025-05-01T00:00:00Z"),
            ],
        )
        .unwrap();
        db.insert_commits(
            Platform::GitLab,
            "acme/web",
            &[commit("3", "Bob", "BOB@co.com", "2025-05-02T00:00:00Z")],
        )
        .unwrap();
        db.insert_commits(
            Platform::GitLab,
            "acme/old",
            &[commit("4", "Dan", "dan@co.com", "2025-05-02T00:00:00Z")],
        )
        .unwrap();

        let mut rules = ExclusionRules::new();
        rules.insert(Platform::GitLab, RuleSet::from_patterns(["/gmail\\.com$/i"]));
        let mut sink = MemorySink::new();
        let mut census = Census::new(&db, &rules);

        let union = census.evaluate_platform(Platform::GitLab, &mut sink).unwrap();
        assert_eq!(union.included_count(), 1);
        assert_eq!(union.excluded_count(), 1);
        assert_eq!(sink.repositories.len(), 2);

        let counts = census.summary().counts(Platform::GitLab);
        assert_eq!(counts.contributors, 1);
        assert_eq!(counts.selected_repositories, 2);
        assert_eq!(counts.total_repositories, 3);
    }

    #[test]
    fn test_window_excludes_old_commits() {
        let db = setup_db();
        db.upsert_repository(Platform::GitLab, "acme/api", None, true).unwrap();
        db.insert_commits(
            Platform::GitLab,
            "acme/api",
            &[
                commit("1", "Old", "old@co.com", "2024-01-01T00:00:00Z"),
                commit("2", "New", "new@co.com", "2025-05-01T00:00:00Z"),
            ],
        )
        .unwrap();

        let rules = ExclusionRules::new();
        let config = AppConfig::default();
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let mut census = Census::from_config(&db, &rules, &config, now);

        let union = census
            .evaluate_platform(Platform::GitLab, &mut MemorySink::new())
            .unwrap();
        assert_eq!(union.included_count(), 1);
        assert!(union.included.keys().any(|k| k.as_str() == "New:new@co.com"));
    }

    #[test]
    fn test_evaluate_records_run() {
        let db = setup_db();
        let rules = ExclusionRules::new();
        let mut census = Census::new(&db, &rules);
        let report = census
            .evaluate(&[Platform::GitHub, Platform::GitLab], &mut MemorySink::new())
            .unwrap();

        assert_eq!(report.platforms.len(), 2);
        let run = db.last_census_run().unwrap().unwrap();
        assert!(run.completed_at.is_some());
        assert_eq!(run.summary.unwrap(), report.summary);
    }
}
