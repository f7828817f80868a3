//! Azure DevOps Git REST API client.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument};

use super::http::{page_items, ApiClient, Auth, Paging};
use super::{parse_items, RemoteRepository};
use crate::config::AppConfig;
use crate::errors::PlatformError;
use crate::models::Platform;

const API_VERSION: &str = "7.1";

#[derive(Debug, Clone, Deserialize)]
struct AzureRepository {
    id: String,
    name: String,
    project: AzureProject,
}

#[derive(Debug, Clone, Deserialize)]
struct AzureProject {
    name: String,
}

impl From<AzureRepository> for RemoteRepository {
    fn from(repo: AzureRepository) -> Self {
        RemoteRepository {
            path: format!("{}/{}", repo.project.name, repo.name),
            remote_id: Some(repo.id),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AzureDevOpsClient {
    api: ApiClient,
    organization: String,
}

impl AzureDevOpsClient {
    pub fn new(api: ApiClient, organization: impl Into<String>) -> Self {
        Self {
            api,
            organization: organization.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, PlatformError> {
        let section = config.platform(Platform::AzureDevOps);
        let organization =
            section
                .owner
                .clone()
                .ok_or_else(|| PlatformError::NotConfigured {
                    platform: Platform::AzureDevOps.label().to_string(),
                    detail: "azure_devops.owner (the organization) is required".into(),
                })?;
        let auth = section.token.clone().map_or(Auth::None, Auth::BasicPat);
        let api = ApiClient::new(
            Platform::AzureDevOps,
            &config.api_url(Platform::AzureDevOps),
            auth,
            &config.http,
        )?;
        info!(organization = %organization, "created Azure DevOps client");
        Ok(Self::new(api, organization))
    }

    /// Every Git repository of the organization, across projects. Paths are
    /// `project/repository`.
    #[instrument(skip(self), fields(organization = %self.organization))]
    pub async fn list_repositories(&self) -> Result<Vec<RemoteRepository>, PlatformError> {
        let mut url = self
            .api
            .endpoint(&[self.organization.as_str(), "_apis", "git", "repositories"])?;
        url.query_pairs_mut().append_pair("api-version", API_VERSION);

        let body = self.api.get_json(url).await?;
        let items = page_items(body).map_err(|detail| PlatformError::ParseError {
            platform: Platform::AzureDevOps.label().to_string(),
            detail,
        })?;
        let repos: Vec<AzureRepository> = parse_items(Platform::AzureDevOps, items)?;
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
        let (project, name) = split_path(&repo.path).ok_or_else(|| PlatformError::NotConfigured {
            platform: Platform::AzureDevOps.label().to_string(),
            detail: format!("repository path '{}' is not 'project/repository'", repo.path),
        })?;
        let repository = repo.remote_id.as_deref().unwrap_or(name);

        let mut url = self.api.endpoint(&[
            self.organization.as_str(),
            project,
            "_apis",
            "git",
            "repositories",
            repository,
            "commits",
        ])?;
        url.query_pairs_mut()
            .append_pair(
                "searchCriteria.fromDate",
                &since.to_rfc3339_opts(SecondsFormat::Secs, true),
            )
            .append_pair("api-version", API_VERSION);

        let commits = self.api.get_all(url, Paging::TopSkip).await?;
        debug!(count = commits.len(), "fetched commits");
        Ok(commits)
    }
}

fn split_path(path: &str) -> Option<(&str, &str)> {
    path.split_once('/')
        .filter(|(project, name)| !project.is_empty() && !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_split_path() {
        assert_eq!(split_path("Platform/api"), Some(("Platform", "api")));
        assert_eq!(split_path("api"), None);
        assert_eq!(split_path("/api"), None);
    }

    #[test]
    fn test_repository_listing_parse() {
        let body = json!({
            "count": 1,
            "value": [{
                "id": "3b1f",
                "name": "api",
                "project": { "id": "p1", "name": "Platform" }
            }]
        });
        let items = page_items(body).unwrap();
        let repos: Vec<AzureRepository> = parse_items(Platform::AzureDevOps, items).unwrap();
        let repo = RemoteRepository::from(repos.into_iter().next().unwrap());
        assert_eq!(repo.path, "Platform/api");
        assert_eq!(repo.remote_id.as_deref(), Some("3b1f"));
    }

    #[test]
    fn test_organization_required() {
        let config: AppConfig = toml::from_str("[azure_devops]\n").unwrap();
        let err = AzureDevOpsClient::from_config(&config).unwrap_err();
        assert!(matches!(err, PlatformError::NotConfigured { .. }));
    }
}
