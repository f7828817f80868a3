//! The collection pass: list a platform's repositories, record which are
//! selected, and persist each selected repository's commits in the window.

use chrono::{DateTime, Utc};
use glob_match::glob_match;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{PlatformClient, RemoteRepository};
use crate::config::AppConfig;
use crate::db::Database;
use crate::errors::{DatabaseError, PlatformError};
use crate::models::Platform;

/// Glob patterns choosing repositories by path. No patterns selects all.
#[derive(Debug, Clone, Default)]
pub struct RepositorySelector {
    patterns: Vec<String>,
}

impl RepositorySelector {
    pub fn new(patterns: Vec<String>) -> Self {
        Self { patterns }
    }

    pub fn from_config(config: &AppConfig, platform: Platform) -> Self {
        Self::new(config.platform(platform).repositories.clone())
    }

    pub fn is_selected(&self, path: &str) -> bool {
        self.patterns.is_empty() || self.patterns.iter().any(|p| glob_match(p, path))
    }
}

/// A repository whose commits could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryFailure {
    pub path: String,
    pub error: String,
}

/// What one platform's collection pass did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionOutcome {
    pub platform: Platform,
    pub listed: usize,
    pub selected: usize,
    pub fetched: usize,
    /// Selected repositories already fetched earlier.
    pub skipped: usize,
    pub commits_stored: usize,
    pub failures: Vec<RepositoryFailure>,
}

impl CollectionOutcome {
    fn new(platform: Platform) -> Self {
        Self {
            platform,
            listed: 0,
            selected: 0,
            fetched: 0,
            skipped: 0,
            commits_stored: 0,
            failures: Vec::new(),
        }
    }
}

/// Fetches commits through a [`PlatformClient`] into the database.
pub struct Collector<'a> {
    db: &'a Database,
    config: &'a AppConfig,
    refresh: bool,
}

impl<'a> Collector<'a> {
    pub fn new(db: &'a Database, config: &'a AppConfig) -> Self {
        Self {
            db,
            config,
            refresh: false,
        }
    }

    /// Re-fetch repositories that were already fetched, replacing their
    /// stored commits.
    pub fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    /// Store the listing with each repository's selection flag and return
    /// the selected ones.
    pub fn record_listing(
        &self,
        platform: Platform,
        repos: &[RemoteRepository],
    ) -> Result<Vec<RemoteRepository>, DatabaseError> {
        let selector = RepositorySelector::from_config(self.config, platform);
        let mut selected = Vec::new();
        for repo in repos {
            let is_selected = selector.is_selected(&repo.path);
            self.db
                .upsert_repository(platform, &repo.path, repo.remote_id.as_deref(), is_selected)?;
            if is_selected {
                selected.push(repo.clone());
            }
        }
        Ok(selected)
    }

    /// Whether `path` still has to be fetched in this pass.
    pub fn needs_fetch(&self, platform: Platform, path: &str) -> Result<bool, DatabaseError> {
        if self.refresh {
            return Ok(true);
        }
        let fetched = self
            .db
            .get_repository(platform, path)?
            .is_some_and(|r| r.fetched_at.is_some());
        Ok(!fetched)
    }

    /// Persist fetched payloads and stamp the repository as fetched.
    pub fn store_commits(
        &self,
        platform: Platform,
        path: &str,
        payloads: &[Value],
    ) -> Result<usize, DatabaseError> {
        let stored = if self.refresh {
            self.db.replace_commits(platform, path, payloads)?
        } else {
            self.db.insert_commits(platform, path, payloads)?
        };
        self.db.mark_fetched(platform, path)?;
        Ok(stored)
    }

    /// Run a full pass for `client`'s platform with the window ending at
    /// `now`. `on_repository` is called before each fetch.
    ///
    /// Listing failures abort the platform. A repository whose commits
    /// cannot be fetched is recorded in the outcome and skipped.
    pub async fn collect(
        &self,
        client: &PlatformClient,
        now: DateTime<Utc>,
        mut on_repository: impl FnMut(&RemoteRepository),
    ) -> Result<CollectionOutcome, PlatformError> {
        let platform = client.platform();
        let since = self.config.window_start(now);
        let mut outcome = CollectionOutcome::new(platform);

        let repos = client.list_repositories().await?;
        outcome.listed = repos.len();
        let selected = self.record_listing(platform, &repos)?;
        outcome.selected = selected.len();
        info!(
            platform = %platform,
            listed = outcome.listed,
            selected = outcome.selected,
            refresh = self.refresh,
            "collecting commits"
        );

        for repo in &selected {
            if !self.needs_fetch(platform, &repo.path)? {
                debug!(platform = %platform, repo = %repo.path, "already fetched, skipping");
                outcome.skipped += 1;
                continue;
            }

            on_repository(repo);
            let payloads = match client.list_commits(repo, since).await {
                Ok(payloads) => payloads,
                Err(e) => {
                    warn!(platform = %platform, repo = %repo.path, error = %e, "failed to fetch commits");
                    outcome.failures.push(RepositoryFailure {
                        path: repo.path.clone(),
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            let stored = self.store_commits(platform, &repo.path, &payloads)?;
            debug!(platform = %platform, repo = %repo.path, fetched = payloads.len(), stored, "stored commits");
            outcome.fetched += 1;
            outcome.commits_stored += stored;
        }

        info!(
            platform = %platform,
            fetched = outcome.fetched,
            skipped = outcome.skipped,
            failed = outcome.failures.len(),
            commits = outcome.commits_stored,
            "collection finished"
        );
        Ok(outcome)
    }
}
