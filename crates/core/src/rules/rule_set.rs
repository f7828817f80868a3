//! Per-platform exclusion rule sets and email classification.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::pattern::ExclusionPattern;
use crate::config::AppConfig;
use crate::errors::RuleError;
use crate::models::Platform;

/// Result of checking an email against a rule set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Included,
    Excluded,
}

/// A pattern that was dropped while loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedPattern {
    pub source: String,
    pub reason: String,
}

/// An ordered list of exclusion patterns for one platform.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    patterns: Vec<ExclusionPattern>,
    rejected: Vec<RejectedPattern>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a rule set from pattern strings, dropping any that fail to compile.
    pub fn from_patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for p in patterns {
            set.add_pattern(p.as_ref());
        }
        set
    }

    /// Compile and append one pattern. Returns `false` if it was dropped.
    pub fn add_pattern(&mut self, raw: &str) -> bool {
        match ExclusionPattern::compile(raw) {
            Ok(pattern) => {
                debug!(pattern = pattern.source(), "added exclusion pattern");
                self.patterns.push(pattern);
                true
            }
            Err(reason) => {
                warn!(pattern = raw, %reason, "dropping malformed exclusion pattern");
                self.rejected.push(RejectedPattern {
                    source: raw.to_string(),
                    reason,
                });
                false
            }
        }
    }

    /// Append every pattern in newline-separated `contents`. Blank lines and
    /// lines starting with `#` are skipped, so a pattern beginning with `#`
    /// must be written as `/#.../`. Returns how many were added.
    pub fn add_pattern_lines(&mut self, contents: &str) -> usize {
        contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter(|line| self.add_pattern(line))
            .count()
    }

    /// Read a pattern file and append its patterns.
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<usize, RuleError> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|source| RuleError::FileUnreadable {
                path: path.display().to_string(),
                source,
            })?;
        let added = self.add_pattern_lines(&contents);
        info!(path = %path.display(), added, "loaded exclusion pattern file");
        Ok(added)
    }

    /// `Excluded` if any pattern matches `email`. An empty email never matches.
    pub fn classify(&self, email: &str) -> Classification {
        if self.matching_pattern(email).is_some() {
            Classification::Excluded
        } else {
            Classification::Included
        }
    }

    /// The first pattern matching `email`, for explaining a classification.
    pub fn matching_pattern(&self, email: &str) -> Option<&str> {
        if email.is_empty() {
            return None;
        }
        self.patterns
            .iter()
            .find(|p| p.is_match(email))
            .map(ExclusionPattern::source)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Patterns dropped because they failed to compile.
    pub fn rejected(&self) -> &[RejectedPattern] {
        &self.rejected
    }
}

/// Exclusion rule sets for every platform.
#[derive(Debug, Clone, Default)]
pub struct ExclusionRules {
    sets: HashMap<Platform, RuleSet>,
}

impl ExclusionRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the `exclude_pattern` and `exclude_file` of every enabled platform.
    pub fn from_config(config: &AppConfig) -> Result<Self, RuleError> {
        let mut rules = Self::new();
        for platform in config.enabled_platforms() {
            let section = config.platform(platform);
            let mut set = RuleSet::new();
            if let Some(pattern) = &section.exclude_pattern {
                set.add_pattern(pattern);
            }
            if let Some(file) = &section.exclude_file {
                set.load_file(file)?;
            }
            info!(
                platform = %platform,
                patterns = set.len(),
                rejected = set.rejected().len(),
                "exclusion rules ready"
            );
            rules.insert(platform, set);
        }
        Ok(rules)
    }

    /// Replace the rule set for `platform`.
    pub fn insert(&mut self, platform: Platform, set: RuleSet) {
        self.sets.insert(platform, set);
    }

    pub fn get(&self, platform: Platform) -> Option<&RuleSet> {
        self.sets.get(&platform)
    }

    /// Classify `email` with `platform`'s rules. A platform without rules
    /// includes everyone.
    pub fn classify(&self, email: &str, platform: Platform) -> Classification {
        self.get(platform)
            .map_or(Classification::Included, |set| set.classify(email))
    }
}
