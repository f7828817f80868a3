//! A single compiled exclusion pattern.

use regex_lite::{Regex, RegexBuilder};

/// A pattern string and its case-insensitive compilation.
#[derive(Debug, Clone)]
pub struct ExclusionPattern {
    source: String,
    regex: Regex,
}

impl ExclusionPattern {
    /// Normalize and compile `raw`.
    ///
    /// Returns the reason on failure; an empty pattern is rejected because
    /// it would match every email.
    pub fn compile(raw: &str) -> Result<Self, String> {
        let body = strip_delimiters(raw);
        if body.is_empty() {
            return Err("pattern is empty".into());
        }
        let regex = RegexBuilder::new(body)
            .case_insensitive(true)
            .build()
            .map_err(|e| e.to_string())?;
        Ok(Self {
            source: raw.trim().to_string(),
            regex,
        })
    }

    /// The pattern as written.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, email: &str) -> bool {
        self.regex.is_match(email)
    }
}

/// Strip surrounding `/.../flags` delimiters, if present.
///
/// The trailing flags must be ASCII letters; anything else means the slashes
/// are part of the pattern itself.
pub fn strip_delimiters(raw: &str) -> &str {
    let trimmed = raw.trim();
    if let Some(rest) = trimmed.strip_prefix('/') {
        if let Some(end) = rest.rfind('/') {
            let flags = &rest[end + 1..];
            if flags.chars().all(|c| c.is_ascii_alphabetic()) {
                return &rest[..end];
            }
        }
    }
    trimmed
}
