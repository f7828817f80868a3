//! Fold raw commit records into deduplicated contributor tallies.

use tracing::{debug, warn};

use crate::identity::{normalize, NormalizedIdentity, RawCommitRecord};
use crate::models::{
    Contributor, ContributorMap, ContributorSets, NormalizedContributor, Platform,
    RepositoryContributors,
};
use crate::rules::{Classification, ExclusionRules};

/// Classifies and tallies contributors using a fixed set of exclusion rules.
///
/// Holds no state besides the rules, so the same aggregator can be reused
/// for any number of repositories and platforms.
#[derive(Debug, Clone, Copy)]
pub struct Aggregator<'r> {
    rules: &'r ExclusionRules,
}

impl<'r> Aggregator<'r> {
    pub fn new(rules: &'r ExclusionRules) -> Self {
        Self { rules }
    }

    /// Tally the contributors of `records` as seen by `platform`.
    ///
    /// - records with no identity are skipped
    /// - name-only identities always land in `excluded` under `name:`
    /// - everything else is routed by the platform's exclusion rules
    ///
    /// Each identity key appears once, with a count of its records.
    pub fn aggregate<'a, I>(&self, records: I, platform: Platform) -> ContributorSets
    where
        I: IntoIterator<Item = &'a RawCommitRecord>,
    {
        let mut sets = ContributorSets::default();
        let mut seen = 0usize;
        let mut skipped = 0usize;

        for record in records {
            seen += 1;
            match normalize(record, platform) {
                NormalizedIdentity::Unidentified => skipped += 1,
                NormalizedIdentity::NameOnly { name } => tally(
                    &mut sets.excluded,
                    NormalizedContributor {
                        name,
                        email: String::new(),
                    },
                ),
                NormalizedIdentity::Complete(identity) => {
                    let bucket = match self.rules.classify(&identity.email, platform) {
                        Classification::Included => &mut sets.included,
                        Classification::Excluded => &mut sets.excluded,
                    };
                    tally(bucket, identity);
                }
            }
        }

        debug!(
            platform = %platform,
            records = seen,
            skipped,
            included = sets.included.len(),
            excluded = sets.excluded.len(),
            "aggregated commit records"
        );
        sets
    }

    /// [`aggregate`](Self::aggregate) for a platform given by its tag.
    ///
    /// An unrecognized tag is a caller bug: it is logged and yields empty
    /// sets instead of failing.
    pub fn aggregate_tagged<'a, I>(&self, records: I, platform_tag: &str) -> ContributorSets
    where
        I: IntoIterator<Item = &'a RawCommitRecord>,
    {
        match platform_tag.parse::<Platform>() {
            Ok(platform) => self.aggregate(records, platform),
            Err(e) => {
                warn!(error = %e, "aggregation requested for unknown platform");
                ContributorSets::default()
            }
        }
    }

    /// Aggregate one repository's records.
    pub fn aggregate_repository<'a, I>(
        &self,
        repo_path: &str,
        records: I,
        platform: Platform,
    ) -> RepositoryContributors
    where
        I: IntoIterator<Item = &'a RawCommitRecord>,
    {
        RepositoryContributors::new(repo_path, self.aggregate(records, platform))
    }
}

/// Create the contributor on first sight of its key, count it otherwise.
fn tally(bucket: &mut ContributorMap, identity: NormalizedContributor) {
    bucket
        .entry(identity.key())
        .and_modify(Contributor::record_commit)
        .or_insert_with(|| Contributor::first_seen(identity));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IdentityKey;
    use crate::rules::RuleSet;
    use serde_json::json;

    fn gitlab(name: &str, email: &str) -> RawCommitRecord {
        RawCommitRecord::from_value(
            Platform::GitLab,
            json!({ "author_name": name, "author_email": email }),
        )
        .unwrap()
    }

    fn gmail_rules(platform: Platform) -> ExclusionRules {
        let mut rules = ExclusionRules::new();
        rules.insert(platform, RuleSet::from_patterns(["/gmail\\.com$/i"]));
        rules
    }

    fn count(map: &ContributorMap, name: &str, email: &str) -> Option<u64> {
        map.get(&IdentityKey::new(name, email)).map(|c| c.commit_count)
    }

    #[test]
    fn test_counts_and_routing() {
        let rules = gmail_rules(Platform::GitLab);
        let mut records = vec![gitlab("Alice", "alice@gmail.com"); 3];
        records.extend(vec![gitlab("Bob", "bob@co.com"); 2]);

        let sets = Aggregator::new(&rules).aggregate(&records, Platform::GitLab);
        assert_eq!(sets.included.len(), 1);
        assert_eq!(sets.excluded.len(), 1);
        assert_eq!(count(&sets.included, "Bob", "bob@co.com"), Some(2));
        assert_eq!(count(&sets.excluded, "Alice", "alice@gmail.com"), Some(3));
        assert_eq!(sets.commit_total(), 5);
    }

    #[test]
    fn test_email_case_folds_into_one_identity() {
        let rules = ExclusionRules::new();
        let records = vec![gitlab("Bob", "Bob@Co.com"), gitlab("Bob", "bob@co.com")];
        let sets = Aggregator::new(&rules).aggregate(&records, Platform::GitLab);
        assert_eq!(count(&sets.included, "Bob", "bob@co.com"), Some(2));
    }

    #[test]
    fn test_name_only_bypasses_rules() {
        // A rule that would match anything still cannot include a name-only identity.
        let mut rules = ExclusionRules::new();
        rules.insert(Platform::GitLab, RuleSet::from_patterns(["^never$"]));
        let records = vec![gitlab("Carol", ""), gitlab("Carol", "")];

        let sets = Aggregator::new(&rules).aggregate(&records, Platform::GitLab);
        assert!(sets.included.is_empty());
        assert_eq!(count(&sets.excluded, "Carol", ""), Some(2));
    }

    #[test]
    fn test_name_only_and_full_identity_tracked_separately() {
        let rules = ExclusionRules::new();
        let records = vec![gitlab("Carol", ""), gitlab("Carol", "carol@co.com")];
        let sets = Aggregator::new(&rules).aggregate(&records, Platform::GitLab);
        assert_eq!(count(&sets.excluded, "Carol", ""), Some(1));
        assert_eq!(count(&sets.included, "Carol", "carol@co.com"), Some(1));
    }

    #[test]
    fn test_unidentified_records_skipped() {
        let rules = ExclusionRules::new();
        let blank = RawCommitRecord::from_value(Platform::GitLab, json!({ "id": "1" })).unwrap();
        let records = vec![blank.clone(), blank];
        let sets = Aggregator::new(&rules).aggregate(&records, Platform::GitLab);
        assert!(sets.is_empty());
    }

    #[test]
    fn test_empty_input() {
        let rules = gmail_rules(Platform::GitHub);
        let records: Vec<RawCommitRecord> = Vec::new();
        assert!(Aggregator::new(&rules)
            .aggregate(&records, Platform::GitHub)
            .is_empty());
    }

    #[test]
    fn test_unknown_tag_yields_empty_sets() {
        let rules = ExclusionRules::new();
        let records = vec![gitlab("Bob", "bob@co.com")];
        let agg = Aggregator::new(&rules);

        assert!(agg.aggregate_tagged(&records, "bitbucket").is_empty());
        assert_eq!(agg.aggregate_tagged(&records, "GitLab").included.len(), 1);
    }

    #[test]
    fn test_idempotent_and_order_invariant() {
        let rules = gmail_rules(Platform::GitLab);
        let records = vec![
            gitlab("Alice", "alice@gmail.com"),
            gitlab("Bob", "bob@co.com"),
            gitlab("Carol", ""),
            gitlab("Bob", "BOB@co.com"),
            gitlab("Alice", "alice@gmail.com"),
        ];
        let agg = Aggregator::new(&rules);

        let first = agg.aggregate(&records, Platform::GitLab);
        let second = agg.aggregate(&records, Platform::GitLab);
        assert_eq!(first, second);

        let reversed: Vec<_> = records.iter().rev().cloned().collect();
        assert_eq!(agg.aggregate(&reversed, Platform::GitLab), first);
    }

    #[test]
    fn test_included_and_excluded_are_disjoint() {
        let rules = gmail_rules(Platform::GitLab);
        let records = vec![
            gitlab("Alice", "alice@gmail.com"),
            gitlab("Alice", "ALICE@GMAIL.COM"),
            gitlab("Bob", "bob@co.com"),
        ];
        let sets = Aggregator::new(&rules).aggregate(&records, Platform::GitLab);
        for key in sets.included.keys() {
            assert!(!sets.excluded.contains_key(key));
        }
    }

    #[test]
    fn test_aggregate_repository_carries_path() {
        let rules = ExclusionRules::new();
        let records = vec![gitlab("Bob", "bob@co.com")];
        let repo = Aggregator::new(&rules).aggregate_repository(
            "acme/api",
            &records,
            Platform::GitLab,
        );
        assert_eq!(repo.repo_path, "acme/api");
        assert_eq!(repo.included.len(), 1);
    }
}
