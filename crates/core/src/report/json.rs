//! JSON report files.
//!
//! Writes `<dir>/<platform>.json` once a platform is complete and rewrites
//! `<dir>/summary.json` after every platform.

use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::{debug, info};

use super::ReportSink;
use crate::aggregate::{PlatformContributors, Summary};
use crate::errors::ReportError;
use crate::models::{Platform, RepositoryContributors};

#[derive(Serialize)]
struct PlatformReport<'a> {
    platform: Platform,
    label: &'a str,
    generated_at: String,
    included_count: u64,
    excluded_count: u64,
    repositories: &'a [RepositoryContributors],
    contributors: &'a PlatformContributors,
}

#[derive(Serialize)]
struct SummaryReport<'a> {
    generated_at: String,
    #[serde(flatten)]
    summary: &'a Summary,
}

pub struct JsonReportSink {
    dir: PathBuf,
    pending: Vec<RepositoryContributors>,
    written: Vec<PathBuf>,
}

impl JsonReportSink {
    /// A sink writing into `dir`, created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            pending: Vec::new(),
            written: Vec::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Every file written so far, in order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    pub fn platform_path(&self, platform: Platform) -> PathBuf {
        self.dir.join(format!("{}.json", platform.tag()))
    }

    pub fn summary_path(&self) -> PathBuf {
        self.dir.join("summary.json")
    }

    fn write_json<T: Serialize>(&mut self, path: PathBuf, value: &T) -> Result<(), ReportError> {
        let io_err = |source| ReportError::IoError {
            path: path.display().to_string(),
            source,
        };
        std::fs::create_dir_all(&self.dir).map_err(io_err)?;
        let mut body = serde_json::to_string_pretty(value)?;
        body.push('\n');
        std::fs::write(&path, body).map_err(io_err)?;
        debug!(path = %path.display(), "wrote report file");
        if !self.written.contains(&path) {
            self.written.push(path);
        }
        Ok(())
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl ReportSink for JsonReportSink {
    fn repository(
        &mut self,
        _platform: Platform,
        result: &RepositoryContributors,
    ) -> Result<(), ReportError> {
        self.pending.push(result.clone());
        Ok(())
    }

    fn platform(&mut self, result: &PlatformContributors) -> Result<(), ReportError> {
        let repositories = std::mem::take(&mut self.pending);
        let report = PlatformReport {
            platform: result.platform,
            label: result.platform.label(),
            generated_at: now(),
            included_count: result.included_count(),
            excluded_count: result.excluded_count(),
            repositories: &repositories,
            contributors: result,
        };
        let path = self.platform_path(result.platform);
        self.write_json(path.clone(), &report)?;
        info!(
            platform = %result.platform,
            path = %path.display(),
            repositories = repositories.len(),
            "wrote platform report"
        );
        Ok(())
    }

    fn summary(&mut self, summary: &Summary) -> Result<(), ReportError> {
        let report = SummaryReport {
            generated_at: now(),
            summary,
        };
        self.write_json(self.summary_path(), &report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Contributor, ContributorSets, NormalizedContributor};

    fn repo_with(path: &str, name: &str, email: &str) -> RepositoryContributors {
        let contributor = Contributor::first_seen(NormalizedContributor {
            name: name.into(),
            email: email.into(),
        });
        let mut sets = ContributorSets::default();
        sets.included.insert(contributor.key(), contributor);
        RepositoryContributors::new(path, sets)
    }

    #[test]
    fn test_writes_platform_and_summary_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = JsonReportSink::new(dir.path().join("out"));

        let repo = repo_with("acme/api", "Bob", "bob@co.com");
        sink.repository(Platform::GitLab, &repo).unwrap();
        let union = PlatformContributors::from_repositories(Platform::GitLab, [&repo]);
        sink.platform(&union).unwrap();

        let mut summary = Summary::new();
        summary.fold_platform(Platform::GitLab, union.included_count(), 1, 1);
        sink.summary(&summary).unwrap();

        let platform_json: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(sink.platform_path(Platform::GitLab)).unwrap(),
        )
        .unwrap();
        assert_eq!(platform_json["platform"], "gitlab");
        assert_eq!(platform_json["label"], "GitLab");
        assert_eq!(platform_json["included_count"], 1);
        assert_eq!(platform_json["repositories"][0]["repo_path"], "acme/api");

        let summary_json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(sink.summary_path()).unwrap()).unwrap();
        assert_eq!(summary_json["total_unique_contributors"], 1);
        assert_eq!(summary_json["gitlab"]["contributors"], 1);
        assert!(summary_json["generated_at"].is_string());

        assert_eq!(sink.written().len(), 2);
    }

    #[test]
    fn test_summary_rewritten_after_each_platform() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = JsonReportSink::new(dir.path());
        let mut summary = Summary::new();

        summary.fold_platform(Platform::GitLab, 5, 1, 1);
        sink.summary(&summary).unwrap();
        summary.fold_platform(Platform::GitHub, 3, 1, 1);
        sink.summary(&summary).unwrap();

        let summary_json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(sink.summary_path()).unwrap()).unwrap();
        assert_eq!(summary_json["total_unique_contributors"], 8);
        assert_eq!(sink.written().len(), 1);
    }

    #[test]
    fn test_unwritable_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "not a directory").unwrap();

        let mut sink = JsonReportSink::new(blocker.join("reports"));
        let result = sink.summary(&Summary::new());
        assert!(matches!(result, Err(ReportError::IoError { .. })));
    }
}
