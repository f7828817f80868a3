//! Platform-shaped raw commit records.
//!
//! Every author field is optional: payloads are read back from storage as
//! the platform returned them, and partial records are expected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Platform;

/// A name/email pair as most platforms nest it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitActor {
    pub name: Option<String>,
    pub email: Option<String>,
    /// ISO-8601 timestamp.
    pub date: Option<String>,
}

// ---------------------------------------------------------------------------
// GitHub
// ---------------------------------------------------------------------------

/// An item of `GET /repos/{owner}/{repo}/commits`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubCommitRecord {
    pub sha: Option<String>,
    /// The git-level commit object. Primary identity path.
    pub commit: Option<GitHubCommitDetail>,
    /// The linked GitHub account. Fallback identity path.
    pub author: Option<GitHubAccount>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubCommitDetail {
    pub author: Option<GitActor>,
    pub committer: Option<GitActor>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubAccount {
    pub login: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
}

// ---------------------------------------------------------------------------
// GitLab
// ---------------------------------------------------------------------------

/// An item of `GET /projects/{id}/repository/commits`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitLabCommitRecord {
    pub id: Option<String>,
    pub author_name: Option<String>,
    pub author_email: Option<String>,
    pub committer_name: Option<String>,
    pub committer_email: Option<String>,
    pub authored_date: Option<String>,
    pub committed_date: Option<String>,
}

// ---------------------------------------------------------------------------
// Azure DevOps
// ---------------------------------------------------------------------------

/// An item of `GET {org}/{project}/_apis/git/repositories/{id}/commits`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureDevOpsCommitRecord {
    pub commit_id: Option<String>,
    pub author: Option<GitActor>,
    pub committer: Option<GitActor>,
}

// ---------------------------------------------------------------------------
// Tagged union
// ---------------------------------------------------------------------------

/// A commit record in its platform's native shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawCommitRecord {
    GitHub(GitHubCommitRecord),
    GitLab(GitLabCommitRecord),
    AzureDevOps(AzureDevOpsCommitRecord),
}

impl RawCommitRecord {
    /// Deserialize a stored JSON payload into the shape for `platform`.
    pub fn from_payload(platform: Platform, payload: &str) -> Result<Self, serde_json::Error> {
        Ok(match platform {
            Platform::GitHub => Self::GitHub(serde_json::from_str(payload)?),
            Platform::GitLab => Self::GitLab(serde_json::from_str(payload)?),
            Platform::AzureDevOps => Self::AzureDevOps(serde_json::from_str(payload)?),
        })
    }

    /// Same as [`from_payload`](Self::from_payload) for an already-parsed value.
    pub fn from_value(platform: Platform, value: serde_json::Value) -> Result<Self, serde_json::Error> {
        Ok(match platform {
            Platform::GitHub => Self::GitHub(serde_json::from_value(value)?),
            Platform::GitLab => Self::GitLab(serde_json::from_value(value)?),
            Platform::AzureDevOps => Self::AzureDevOps(serde_json::from_value(value)?),
        })
    }

    pub fn platform(&self) -> Platform {
        match self {
            Self::GitHub(_) => Platform::GitHub,
            Self::GitLab(_) => Platform::GitLab,
            Self::AzureDevOps(_) => Platform::AzureDevOps,
        }
    }

    /// The platform's commit identifier, if present.
    pub fn commit_id(&self) -> Option<&str> {
        match self {
            Self::GitHub(r) => r.sha.as_deref(),
            Self::GitLab(r) => r.id.as_deref(),
            Self::AzureDevOps(r) => r.commit_id.as_deref(),
        }
    }

    /// When the commit was authored, falling back to the commit date.
    pub fn committed_at(&self) -> Option<DateTime<Utc>> {
        let raw = match self {
            Self::GitHub(r) => r.commit.as_ref().and_then(|c| {
                actor_date(c.author.as_ref()).or_else(|| actor_date(c.committer.as_ref()))
            }),
            Self::GitLab(r) => r
                .authored_date
                .as_deref()
                .or(r.committed_date.as_deref()),
            Self::AzureDevOps(r) => {
                actor_date(r.author.as_ref()).or_else(|| actor_date(r.committer.as_ref()))
            }
        }?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

fn actor_date(actor: Option<&GitActor>) -> Option<&str> {
    actor.and_then(|a| a.date.as_deref())
}
