//! GitHub REST API client.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument};

use super::http::{ApiClient, Auth, Paging};
use super::{parse_items, RemoteRepository};
use crate::config::AppConfig;
use crate::errors::PlatformError;
use crate::models::Platform;

/// An item of `GET /orgs/{org}/repos` or `GET /user/repos`.
#[derive(Debug, Clone, Deserialize)]
struct GitHubRepository {
    id: u64,
    full_name: String,
}

impl From<GitHubRepository> for RemoteRepository {
    fn from(repo: GitHubRepository) -> Self {
        RemoteRepository {
            path: repo.full_name,
            remote_id: Some(repo.id.to_string()),
        }
    }
}

/// Asynchronous GitHub REST API client.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    api: ApiClient,
    owner: Option<String>,
}

impl GitHubClient {
    pub fn new(api: ApiClient, owner: Option<String>) -> Self {
        Self { api, owner }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, PlatformError> {
        let section = config.platform(Platform::GitHub);
        let auth = section.token.clone().map_or(Auth::None, Auth::Bearer);
        let api = ApiClient::new(
            Platform::GitHub,
            &config.api_url(Platform::GitHub),
            auth,
            &config.http,
        )?;
        info!(owner = ?section.owner, "created GitHub client");
        Ok(Self::new(api, section.owner.clone()))
    }

    /// Repositories of the configured organization (or user), or of the
    /// authenticated user when no owner is set.
    #[instrument(skip(self), fields(owner = ?self.owner))]
    pub async fn list_repositories(&self) -> Result<Vec<RemoteRepository>, PlatformError> {
        let items = match &self.owner {
            Some(owner) => {
                let mut url = self.api.endpoint(&["orgs", owner.as_str(), "repos"])?;
                url.query_pairs_mut().append_pair("type", "all");
                match self.api.get_all(url, Paging::PageNumber).await {
                    Err(PlatformError::ApiError { status: 404, .. }) => {
                        debug!(owner, "not an organization, listing user repositories");
                        let mut url = self.api.endpoint(&["users", owner.as_str(), "repos"])?;
                        url.query_pairs_mut().append_pair("type", "owner");
                        self.api.get_all(url, Paging::PageNumber).await?
                    }
                    other => other?,
                }
            }
            None => {
                let mut url = self.api.endpoint(&["user", "repos"])?;
                url.query_pairs_mut()
                    .append_pair("affiliation", "owner,collaborator,organization_member");
                self.api.get_all(url, Paging::PageNumber).await?
            }
        };

        let repos: Vec<GitHubRepository> = parse_items(Platform::GitHub, items)?;
        debug!(count = repos.len(), "listed repositories");
        Ok(repos.into_iter().map(RemoteRepository::from).collect())
    }

    /// Raw commit payloads of `repo` since `since`.
    #[instrument(skip(self, repo), fields(repo = %repo.path))]
    pub async fn list_commits(
        &self,
        repo: &RemoteRepository,
        since: DateTime<Utc>,
    ) -> Result<Vec<Value>, PlatformError> {
        let mut url = self.api.endpoint(&commits_path(&repo.path))?;
        url.query_pairs_mut()
            .append_pair("since", &since.to_rfc3339_opts(SecondsFormat::Secs, true));

        match self.api.get_all(url, Paging::PageNumber).await {
            // An empty repository answers 409 Conflict.
            Err(PlatformError::ApiError { status: 409, .. }) => {
                debug!("repository is empty");
                Ok(Vec::new())
            }
            result => {
                let commits = result?;
                debug!(count = commits.len(), "fetched commits");
                Ok(commits)
            }
        }
    }
}

/// Path segments of `/repos/{owner}/{repo}/commits`.
fn commits_path(full_name: &str) -> Vec<&str> {
    let mut segments = vec!["repos"];
    segments.extend(full_name.split('/').filter(|s| !s.is_empty()));
    segments.push("commits");
    segments
}
