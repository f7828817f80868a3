//! Email-based exclusion rules.
//!
//! Each platform holds an ordered list of case-insensitive patterns. An
//! email matching any of them is excluded from the contributor count.
//!
//! | Source | Example |
//! |--------|---------|
//! | `exclude_pattern` | `"/noreply\\.github\\.com$/i"` |
//! | `exclude_file` | one pattern per line, `#` starts a comment |
//!
//! Both sources are normalized the same way: `/.../flags` delimiters are
//! stripped and the pattern is compiled case-insensitive whatever flags were
//! written. Patterns that fail to compile are dropped with a warning.

pub mod pattern;
pub mod rule_set;

pub use pattern::ExclusionPattern;
pub use rule_set::{Classification, ExclusionRules, RejectedPattern, RuleSet};
