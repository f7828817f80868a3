//! Running cross-platform totals.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::models::Platform;

/// Counters for one platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformCounts {
    /// Included contributors across the platform's selected repositories.
    pub contributors: u64,
    pub selected_repositories: u64,
    pub total_repositories: u64,
}

/// Per-platform counters and their sum.
///
/// `total_unique_contributors` is the arithmetic sum of the three platform
/// counts. Someone active on two platforms is counted twice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub github: PlatformCounts,
    pub gitlab: PlatformCounts,
    pub azure_devops: PlatformCounts,
    pub total_unique_contributors: u64,
}

impl Summary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace `platform`'s counters and recompute the total.
    ///
    /// Folding the same platform again overwrites its previous counters, so
    /// a re-evaluated platform is never double counted. The summary is
    /// complete after every fold.
    pub fn fold_platform(
        &mut self,
        platform: Platform,
        included_count: u64,
        selected_repo_count: u64,
        total_repo_count: u64,
    ) -> &Self {
        *self.counts_mut(platform) = PlatformCounts {
            contributors: included_count,
            selected_repositories: selected_repo_count,
            total_repositories: total_repo_count,
        };
        self.total_unique_contributors = Platform::ALL
            .iter()
            .map(|p| self.counts(*p).contributors)
            .sum();

        info!(
            platform = %platform,
            contributors = included_count,
            selected_repo_count,
            total_repo_count,
            total = self.total_unique_contributors,
            "summary updated"
        );
        self
    }

    pub fn counts(&self, platform: Platform) -> &PlatformCounts {
        match platform {
            Platform::GitHub => &self.github,
            Platform::GitLab => &self.gitlab,
            Platform::AzureDevOps => &self.azure_devops,
        }
    }

    fn counts_mut(&mut self, platform: Platform) -> &mut PlatformCounts {
        match platform {
            Platform::GitHub => &mut self.github,
            Platform::GitLab => &mut self.gitlab,
            Platform::AzureDevOps => &mut self.azure_devops,
        }
    }
}
