//! Report sinks: the receiving end of a census.
//!
//! A census emits, for every platform in turn, each repository's result,
//! then the platform union, then the summary as it stands after that
//! platform. The summary is complete at every emission.
//!
//! [`SinkFanout`] dispatches to several sinks and logs failures without
//! skipping the remaining sinks.

pub mod json;
pub mod memory;

use tracing::warn;

use crate::aggregate::{PlatformContributors, Summary};
use crate::errors::ReportError;
use crate::models::{Platform, RepositoryContributors};

pub use json::JsonReportSink;
pub use memory::MemorySink;

/// Receives census results as they are produced.
pub trait ReportSink {
    /// One repository's contributors.
    fn repository(
        &mut self,
        platform: Platform,
        result: &RepositoryContributors,
    ) -> Result<(), ReportError>;

    /// The union of a platform's repositories, after its last repository.
    fn platform(&mut self, result: &PlatformContributors) -> Result<(), ReportError>;

    /// The summary after a platform was folded in.
    fn summary(&mut self, summary: &Summary) -> Result<(), ReportError>;
}

/// Forwards every event to each of its sinks in order.
#[derive(Default)]
pub struct SinkFanout<'a> {
    sinks: Vec<&'a mut dyn ReportSink>,
}

impl<'a> SinkFanout<'a> {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn push(&mut self, sink: &'a mut dyn ReportSink) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Run `f` on every sink; the first failure is returned once all ran.
    fn each<F>(&mut self, event: &str, mut f: F) -> Result<(), ReportError>
    where
        F: FnMut(&mut dyn ReportSink) -> Result<(), ReportError>,
    {
        let mut first_error = None;
        for (index, sink) in self.sinks.iter_mut().enumerate() {
            if let Err(e) = f(&mut **sink) {
                warn!(sink = index, event, error = %e, "report sink failed");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl ReportSink for SinkFanout<'_> {
    fn repository(
        &mut self,
        platform: Platform,
        result: &RepositoryContributors,
    ) -> Result<(), ReportError> {
        self.each("repository", |sink| sink.repository(platform, result))
    }

    fn platform(&mut self, result: &PlatformContributors) -> Result<(), ReportError> {
        self.each("platform", |sink| sink.platform(result))
    }

    fn summary(&mut self, summary: &Summary) -> Result<(), ReportError> {
        self.each("summary", |sink| sink.summary(summary))
    }
}
