//! Domain model types used throughout commitcensus.
//!
//! These types bridge the aggregation engine, the database layer, the
//! platform clients, and the report sinks.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Platform tag
// ---------------------------------------------------------------------------

/// A source-control host whose commit activity is counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    GitHub,
    GitLab,
    AzureDevOps,
}

impl Platform {
    /// Every supported platform, in processing order.
    pub const ALL: [Platform; 3] = [Platform::GitHub, Platform::GitLab, Platform::AzureDevOps];

    /// Canonical lowercase tag, as stored in the database.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::GitHub => "github",
            Self::GitLab => "gitlab",
            Self::AzureDevOps => "azuredevops",
        }
    }

    /// Human-readable label for reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::GitHub => "GitHub",
            Self::GitLab => "GitLab",
            Self::AzureDevOps => "Azure DevOps",
        }
    }

    /// Default REST API base URL.
    pub fn default_api_url(&self) -> &'static str {
        match self {
            Self::GitHub => "https://api.github.com",
            Self::GitLab => "https://gitlab.com/api/v4",
            Self::AzureDevOps => "https://dev.azure.com",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// A platform tag outside the recognized set.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown platform tag '{0}' (expected github, gitlab or azuredevops)")]
pub struct UnknownPlatform(pub String);

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "github" => Ok(Self::GitHub),
            "gitlab" => Ok(Self::GitLab),
            "azuredevops" | "azure_devops" | "azure-devops" => Ok(Self::AzureDevOps),
            _ => Err(UnknownPlatform(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Deduplication key for a contributor: `name + ":" + lowercased email`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityKey(String);

impl IdentityKey {
    pub fn new(name: &str, email: &str) -> Self {
        Self(format!("{name}:{email}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A `(name, email)` pair extracted from a raw commit record.
///
/// `email` is already lowercased and may be empty for name-only identities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedContributor {
    pub name: String,
    pub email: String,
}

impl NormalizedContributor {
    pub fn key(&self) -> IdentityKey {
        IdentityKey::new(&self.name, &self.email)
    }
}

// ---------------------------------------------------------------------------
// Contributor tallies
// ---------------------------------------------------------------------------

/// A contributor identity plus the number of commits observed in one scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributor {
    pub name: String,
    pub email: String,
    pub commit_count: u64,
}

impl Contributor {
    /// A contributor on its first observation in a scope.
    pub fn first_seen(identity: NormalizedContributor) -> Self {
        Self {
            name: identity.name,
            email: identity.email,
            commit_count: 1,
        }
    }

    pub fn key(&self) -> IdentityKey {
        IdentityKey::new(&self.name, &self.email)
    }

    /// Count one more commit.
    pub fn record_commit(&mut self) {
        self.commit_count = self.commit_count.saturating_add(1);
    }
}

/// Contributors keyed by identity. Ordered so output is deterministic.
pub type ContributorMap = BTreeMap<IdentityKey, Contributor>;

/// The two buckets produced by one aggregation call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributorSets {
    pub included: ContributorMap,
    pub excluded: ContributorMap,
}

impl ContributorSets {
    pub fn is_empty(&self) -> bool {
        self.included.is_empty() && self.excluded.is_empty()
    }

    /// Total commits across both buckets.
    pub fn commit_total(&self) -> u64 {
        self.included
            .values()
            .chain(self.excluded.values())
            .map(|c| c.commit_count)
            .sum()
    }
}

/// Aggregation result for a single repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryContributors {
    pub repo_path: String,
    pub included: ContributorMap,
    pub excluded: ContributorMap,
}

impl RepositoryContributors {
    pub fn new(repo_path: impl Into<String>, sets: ContributorSets) -> Self {
        Self {
            repo_path: repo_path.into(),
            included: sets.included,
            excluded: sets.excluded,
        }
    }
}
