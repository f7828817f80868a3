//! GitLab REST API (v4) client.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument};

use super::http::{ApiClient, Auth, Paging};
use super::{parse_items, RemoteRepository};
use crate::config::AppConfig;
use crate::errors::PlatformError;
use crate::models::Platform;

#[derive(Debug, Clone, Deserialize)]
struct GitLabProject {
    id: u64,
    path_with_namespace: String,
}

impl From<GitLabProject> for RemoteRepository {
    fn from(project: GitLabProject) -> Self {
        RemoteRepository {
            path: project.path_with_namespace,
            remote_id: Some(project.id.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GitLabClient {
    api: ApiClient,
    group: Option<String>,
}

impl GitLabClient {
    pub fn new(api: ApiClient, group: Option<String>) -> Self {
        Self { api, group }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, PlatformError> {
        let section = config.platform(Platform::GitLab);
        let auth = section.token.clone().map_or(Auth::None, Auth::PrivateToken);
        let api = ApiClient::new(
            Platform::GitLab,
            &config.api_url(Platform::GitLab),
            auth,
            &config.http,
        )?;
        info!(group = ?section.owner, "created GitLab client");
        Ok(Self::new(api, section.owner.clone()))
    }

    /// Projects of the configured group including subgroups, or every
    /// project the token's user is a member of.
    #[instrument(skip(self), fields(group = ?self.group))]
    pub async fn list_repositories(&self) -> Result<Vec<RemoteRepository>, PlatformError> {
        let url = match &self.group {
            Some(group) => {
                let mut url = self.api.endpoint(&["groups", group.as_str(), "projects"])?;
                url.query_pairs_mut().append_pair("include_subgroups", "true");
                url
            }
            None => {
                let mut url = self.api.endpoint(&["projects"])?;
                url.query_pairs_mut().append_pair("membership", "true");
                url
            }
        };
        let items = self.api.get_all(url, Paging::PageNumber).await?;
        let projects: Vec<GitLabProject> = parse_items(Platform::GitLab, items)?;
        debug!(count = projects.len(), "listed projects");
        Ok(projects.into_iter().map(RemoteRepository::from).collect())
    }

    /// Raw commit payloads of every branch of `repo` since `since`.
    #[instrument(skip(self, repo), fields(repo = %repo.path))]
    pub async fn list_commits(
        &self,
        repo: &RemoteRepository,
        since: DateTime<Utc>,
    ) -> Result<Vec<Value>, PlatformError> {
        let project = project_ref(repo);
        let mut url = self
            .api
            .endpoint(&["projects", project, "repository", "commits"])?;
        url.query_pairs_mut()
            .append_pair("since", &since.to_rfc3339_opts(SecondsFormat::Secs, true))
            .append_pair("all", "true");

        let commits = self.api.get_all(url, Paging::PageNumber).await?;
        debug!(count = commits.len(), "fetched commits");
        Ok(commits)
    }
}

/// The numeric project id when known, otherwise the namespaced path.
fn project_ref(repo: &RemoteRepository) -> &str {
    repo.remote_id.as_deref().unwrap_or(&repo.path)
}
