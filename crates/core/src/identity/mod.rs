//! Contributor identity extraction.
//!
//! Raw commit payloads arrive in a different shape per platform. They are
//! deserialized into a [`RawCommitRecord`] variant and reduced to a
//! `(name, email)` pair by [`normalize`]:
//!
//! 1. The platform's primary author path
//! 2. An alternate path when the primary yields nothing
//! 3. No name and no email: the record carries no identity and is skipped

pub mod normalizer;
pub mod records;

pub use normalizer::{normalize, NormalizedIdentity};
pub use records::RawCommitRecord;
