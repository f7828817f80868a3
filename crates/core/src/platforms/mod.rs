//! Source-control platform API clients and the collection pass that feeds
//! the commit database.

pub mod azure_devops;
pub mod collector;
pub mod github;
pub mod gitlab;
pub mod http;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::AppConfig;
use crate::errors::PlatformError;
use crate::models::Platform;

pub use azure_devops::AzureDevOpsClient;
pub use collector::{CollectionOutcome, Collector, RepositorySelector};
pub use github::GitHubClient;
pub use gitlab::GitLabClient;

/// A repository as listed by its platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRepository {
    /// Namespaced path, e.g. `acme/api` or `Project/repo`.
    pub path: String,
    /// The platform's own identifier, when it has one.
    pub remote_id: Option<String>,
}

/// A client for whichever platform it was built for.
#[derive(Debug, Clone)]
pub enum PlatformClient {
    GitHub(GitHubClient),
    GitLab(GitLabClient),
    AzureDevOps(AzureDevOpsClient),
}

impl PlatformClient {
    pub fn from_config(platform: Platform, config: &AppConfig) -> Result<Self, PlatformError> {
        Ok(match platform {
            Platform::GitHub => Self::GitHub(GitHubClient::from_config(config)?),
            Platform::GitLab => Self::GitLab(GitLabClient::from_config(config)?),
            Platform::AzureDevOps => Self::AzureDevOps(AzureDevOpsClient::from_config(config)?),
        })
    }

    pub fn platform(&self) -> Platform {
        match self {
            Self::GitHub(_) => Platform::GitHub,
            Self::GitLab(_) => Platform::GitLab,
            Self::AzureDevOps(_) => Platform::AzureDevOps,
        }
    }

    pub async fn list_repositories(&self) -> Result<Vec<RemoteRepository>, PlatformError> {
        match self {
            Self::GitHub(c) => c.list_repositories().await,
            Self::GitLab(c) => c.list_repositories().await,
            Self::AzureDevOps(c) => c.list_repositories().await,
        }
    }

    pub async fn list_commits(
        &self,
        repo: &RemoteRepository,
        since: DateTime<Utc>,
    ) -> Result<Vec<Value>, PlatformError> {
        match self {
            Self::GitHub(c) => c.list_commits(repo, since).await,
            Self::GitLab(c) => c.list_commits(repo, since).await,
            Self::AzureDevOps(c) => c.list_commits(repo, since).await,
        }
    }
}

/// Deserialize listing items into a platform's typed shape.
pub(crate) fn parse_items<T: DeserializeOwned>(
    platform: Platform,
    items: Vec<Value>,
) -> Result<Vec<T>, PlatformError> {
    items
        .into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| PlatformError::ParseError {
            platform: platform.label().to_string(),
            detail: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_matches_platform() {
        let config: AppConfig =
            toml::from_str("[github]\n[gitlab]\n[azure_devops]\nowner = \"acme\"\n").unwrap();
        for platform in Platform::ALL {
            let client = PlatformClient::from_config(platform, &config).unwrap();
            assert_eq!(client.platform(), platform);
        }
    }
}
