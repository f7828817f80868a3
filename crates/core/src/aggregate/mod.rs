//! Contributor aggregation across repositories and platforms.
//!
//! Aggregation runs in three scopes, each rebuilt from scratch on every
//! evaluation:
//!
//! 1. Repository: [`Aggregator`] folds raw commit records into included and
//!    excluded [`Contributor`](crate::models::Contributor) tallies.
//! 2. Platform: [`PlatformContributors`] unions repository results by
//!    identity key, recording presence rather than summing commits.
//! 3. Global: [`Summary`] keeps per-platform counters and their sum.
//!
//! Nothing here performs I/O or keeps state between calls.

pub mod aggregator;
pub mod platform;
pub mod summary;

pub use aggregator::Aggregator;
pub use platform::{PlatformContributor, PlatformContributors};
pub use summary::{PlatformCounts, Summary};
