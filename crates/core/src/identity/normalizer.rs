//! Reduce a [`RawCommitRecord`] to a contributor identity.

use tracing::trace;

use super::records::{GitActor, RawCommitRecord};
use crate::models::{NormalizedContributor, Platform};

/// Outcome of normalizing one raw commit record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedIdentity {
    /// Neither a name nor an email could be extracted. Dropped silently.
    Unidentified,
    /// A name without an email. Tracked, but cannot be evaluated against
    /// exclusion rules.
    NameOnly { name: String },
    /// An email (lowercased) with the name if one was present.
    Complete(NormalizedContributor),
}

impl NormalizedIdentity {
    /// The contributor this identity counts as, if any. Name-only identities
    /// become a contributor with an empty email.
    pub fn into_contributor(self) -> Option<NormalizedContributor> {
        match self {
            Self::Unidentified => None,
            Self::NameOnly { name } => Some(NormalizedContributor {
                name,
                email: String::new(),
            }),
            Self::Complete(identity) => Some(identity),
        }
    }
}

/// Extract the author identity from `record`, read as a `platform` record.
///
/// A record whose shape belongs to another platform carries no identity for
/// this platform and yields [`NormalizedIdentity::Unidentified`].
pub fn normalize(record: &RawCommitRecord, platform: Platform) -> NormalizedIdentity {
    if record.platform() != platform {
        trace!(
            expected = %platform,
            found = %record.platform(),
            "record shape does not match platform"
        );
        return NormalizedIdentity::Unidentified;
    }

    let (name, email) = match record {
        RawCommitRecord::GitHub(r) => {
            let primary = r
                .commit
                .as_ref()
                .map(|c| actor_fields(c.author.as_ref()))
                .unwrap_or_default();
            first_present(primary, || match &r.author {
                Some(account) => (
                    present(account.name.as_deref()).or_else(|| present(account.login.as_deref())),
                    present(account.email.as_deref()),
                ),
                None => (None, None),
            })
        }
        RawCommitRecord::GitLab(r) => first_present(
            (
                present(r.author_name.as_deref()),
                present(r.author_email.as_deref()),
            ),
            || {
                (
                    present(r.committer_name.as_deref()),
                    present(r.committer_email.as_deref()),
                )
            },
        ),
        RawCommitRecord::AzureDevOps(r) => first_present(actor_fields(r.author.as_ref()), || {
            actor_fields(r.committer.as_ref())
        }),
    };

    classify_fields(name, email)
}

type Fields<'a> = (Option<&'a str>, Option<&'a str>);

fn classify_fields(name: Option<&str>, email: Option<&str>) -> NormalizedIdentity {
    match (name, email) {
        (None, None) => NormalizedIdentity::Unidentified,
        (Some(name), None) => NormalizedIdentity::NameOnly {
            name: name.to_string(),
        },
        (name, Some(email)) => NormalizedIdentity::Complete(NormalizedContributor {
            name: name.unwrap_or_default().to_string(),
            email: email.to_lowercase(),
        }),
    }
}

/// Use `primary` unless it yielded nothing at all.
fn first_present<'a>(primary: Fields<'a>, fallback: impl FnOnce() -> Fields<'a>) -> Fields<'a> {
    match primary {
        (None, None) => fallback(),
        found => found,
    }
}

fn actor_fields(actor: Option<&GitActor>) -> Fields<'_> {
    match actor {
        Some(a) => (present(a.name.as_deref()), present(a.email.as_deref())),
        None => (None, None),
    }
}

/// Trimmed, non-empty field value.
fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(platform: Platform, value: serde_json::Value) -> RawCommitRecord {
        RawCommitRecord::from_value(platform, value).unwrap()
    }

    fn complete(name: &str, email: &str) -> NormalizedIdentity {
        NormalizedIdentity::Complete(NormalizedContributor {
            name: name.into(),
            email: email.into(),
        })
    }

    #[test]
    fn test_github_primary_path_lowercases_email() {
        let r = record(
            Platform::GitHub,
            json!({ "commit": { "author": { "name": "Alice", "email": "Alice@Gmail.COM" } } }),
        );
        assert_eq!(normalize(&r, Platform::GitHub), complete("Alice", "alice@gmail.com"));
    }

    #[test]
    fn test_github_falls_back_to_account() {
        let r = record(
            Platform::GitHub,
            json!({ "commit": {}, "author": { "login": "octocat", "email": "Octo@Cat.io" } }),
        );
        assert_eq!(normalize(&r, Platform::GitHub), complete("octocat", "octo@cat.io"));

        let r = record(
            Platform::GitHub,
            json!({ "author": { "login": "octocat", "name": "The Octocat" } }),
        );
        assert_eq!(
            normalize(&r, Platform::GitHub),
            NormalizedIdentity::NameOnly { name: "The Octocat".into() }
        );
    }

    #[test]
    fn test_gitlab_flat_fields_and_committer_fallback() {
        let r = record(
            Platform::GitLab,
            json!({ "author_name": "Bob", "author_email": "BOB@co.com" }),
        );
        assert_eq!(normalize(&r, Platform::GitLab), complete("Bob", "bob@co.com"));

        let r = record(
            Platform::GitLab,
            json!({ "committer_name": "Eve", "committer_email": "eve@co.com" }),
        );
        assert_eq!(normalize(&r, Platform::GitLab), complete("Eve", "eve@co.com"));
    }

    #[test]
    fn test_azure_nested_author() {
        let r = record(
            Platform::AzureDevOps,
            json!({ "author": { "name": "Dana", "email": "Dana@Corp.com" } }),
        );
        assert_eq!(normalize(&r, Platform::AzureDevOps), complete("Dana", "dana@corp.com"));
    }

    #[test]
    fn test_name_without_email_is_name_only() {
        let r = record(
            Platform::GitLab,
            json!({ "author_name": "Carol", "author_email": "" }),
        );
        let identity = normalize(&r, Platform::GitLab);
        assert_eq!(identity, NormalizedIdentity::NameOnly { name: "Carol".into() });
        let contributor = identity.into_contributor().unwrap();
        assert_eq!(contributor.key().as_str(), "Carol:");
    }

    #[test]
    fn test_email_without_name_keeps_empty_name() {
        let r = record(Platform::GitLab, json!({ "author_email": "x@y.z" }));
        assert_eq!(normalize(&r, Platform::GitLab), complete("", "x@y.z"));
    }

    #[test]
    fn test_no_identity_is_unidentified() {
        let r = record(Platform::AzureDevOps, json!({ "commitId": "1" }));
        assert_eq!(normalize(&r, Platform::AzureDevOps), NormalizedIdentity::Unidentified);
        assert!(NormalizedIdentity::Unidentified.into_contributor().is_none());

        let r = record(
            Platform::GitHub,
            json!({ "commit": { "author": { "name": "  ", "email": "" } } }),
        );
        assert_eq!(normalize(&r, Platform::GitHub), NormalizedIdentity::Unidentified);
    }

    #[test]
    fn test_platform_mismatch_is_unidentified() {
        let r = record(
            Platform::GitLab,
            json!({ "author_name": "Bob", "author_email": "bob@co.com" }),
        );
        assert_eq!(normalize(&r, Platform::GitHub), NormalizedIdentity::Unidentified);
    }

    #[test]
    fn test_name_is_case_sensitive() {
        let a = record(
            Platform::GitLab,
            json!({ "author_name": "alice", "author_email": "a@co.com" }),
        );
        let b = record(
            Platform::GitLab,
            json!({ "author_name": "Alice", "author_email": "A@CO.COM" }),
        );
        let ka = normalize(&a, Platform::GitLab).into_contributor().unwrap().key();
        let kb = normalize(&b, Platform::GitLab).into_contributor().unwrap().key();
        assert_ne!(ka, kb);
    }
}
