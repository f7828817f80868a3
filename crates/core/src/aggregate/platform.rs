//! Union of repository results under one platform.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::models::{Contributor, ContributorMap, IdentityKey, Platform, RepositoryContributors};

/// A contributor seen somewhere on a platform, with the repositories they
/// committed to. Commit counts are per repository and are not summed here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformContributor {
    pub name: String,
    pub email: String,
    pub repositories: BTreeSet<String>,
}

pub type PlatformContributorMap = BTreeMap<IdentityKey, PlatformContributor>;

/// All contributors of one platform, deduplicated by identity key.
///
/// Absorbing repositories is a set union, so the order in which
/// repositories are absorbed does not change the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformContributors {
    pub platform: Platform,
    pub included: PlatformContributorMap,
    pub excluded: PlatformContributorMap,
}

impl PlatformContributors {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            included: BTreeMap::new(),
            excluded: BTreeMap::new(),
        }
    }

    /// Union every repository result into a fresh platform scope.
    pub fn from_repositories<'a, I>(platform: Platform, repositories: I) -> Self
    where
        I: IntoIterator<Item = &'a RepositoryContributors>,
    {
        let mut union = Self::new(platform);
        for repo in repositories {
            union.absorb(repo);
        }
        union
    }

    /// Add one repository's contributors.
    pub fn absorb(&mut self, repo: &RepositoryContributors) {
        merge_bucket(&mut self.included, &repo.included, &repo.repo_path);
        merge_bucket(&mut self.excluded, &repo.excluded, &repo.repo_path);
    }

    /// Number of included contributors; the platform's headline count.
    pub fn included_count(&self) -> u64 {
        self.included.len() as u64
    }

    pub fn excluded_count(&self) -> u64 {
        self.excluded.len() as u64
    }
}

fn merge_bucket(target: &mut PlatformContributorMap, source: &ContributorMap, repo_path: &str) {
    for (key, contributor) in source {
        target
            .entry(key.clone())
            .or_insert_with(|| presence(contributor))
            .repositories
            .insert(repo_path.to_string());
    }
}

fn presence(contributor: &Contributor) -> PlatformContributor {
    PlatformContributor {
        name: contributor.name.clone(),
        email: contributor.email.clone(),
        repositories: BTreeSet::new(),
    }
}
