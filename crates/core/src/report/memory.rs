//! In-memory sink that keeps every event.

use super::ReportSink;
use crate::aggregate::{PlatformContributors, Summary};
use crate::errors::ReportError;
use crate::models::{Platform, RepositoryContributors};

#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub repositories: Vec<(Platform, RepositoryContributors)>,
    pub platforms: Vec<PlatformContributors>,
    /// One snapshot per platform folded, in order.
    pub summaries: Vec<Summary>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent summary, if any platform was evaluated.
    pub fn last_summary(&self) -> Option<&Summary> {
        self.summaries.last()
    }

    /// Repository results recorded for `platform`.
    pub fn repositories_of(&self, platform: Platform) -> impl Iterator<Item = &RepositoryContributors> {
        self.repositories
            .iter()
            .filter(move |(p, _)| *p == platform)
            .map(|(_, r)| r)
    }
}

impl ReportSink for MemorySink {
    fn repository(
        &mut self,
        platform: Platform,
        result: &RepositoryContributors,
    ) -> Result<(), ReportError> {
        self.repositories.push((platform, result.clone()));
        Ok(())
    }

    fn platform(&mut self, result: &PlatformContributors) -> Result<(), ReportError> {
        self.platforms.push(result.clone());
        Ok(())
    }

    fn summary(&mut self, summary: &Summary) -> Result<(), ReportError> {
        self.summaries.push(summary.clone());
        Ok(())
    }
}
