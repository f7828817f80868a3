//! commitcensus core library.
//!
//! Counts the people committing to GitHub, GitLab and Azure DevOps
//! repositories over a rolling window: platform API clients fetch raw
//! commit records into SQLite, and a census re-reads them, normalizes each
//! author identity, classifies it with per-platform exclusion rules, and
//! folds per-repository results into platform unions and a cross-platform
//! summary.

pub mod aggregate;
pub mod census;
pub mod config;
pub mod db;
pub mod errors;
pub mod identity;
pub mod models;
pub mod platforms;
pub mod report;
pub mod rules;

// Re-exports for convenience.
pub use aggregate::{Aggregator, PlatformContributors, Summary};
pub use census::{Census, CensusReport};
pub use config::AppConfig;
pub use db::Database;
pub use identity::RawCommitRecord;
pub use models::Platform;
pub use report::ReportSink;
pub use rules::ExclusionRules;
