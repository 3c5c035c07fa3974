use super::{PracticeVerdict, RepoFacts};
use crate::reference::{is_third_party, ClassifiedRef, FirstPartyOwners, ReferenceClassifier};
use std::collections::BTreeMap;

/// P4 — action pinning. Target when any valid workflow references an in-scope
/// third-party action; implemented only when the classified set is non-empty
/// and every reference in it is pinned.
///
/// Identical reference strings across workflows classify once. The returned
/// list is sorted by reference for deterministic output.
pub fn evaluate(
    facts: &RepoFacts,
    classifier: &ReferenceClassifier<'_>,
    first_party: &FirstPartyOwners,
) -> (PracticeVerdict, Vec<ClassifiedRef>) {
    let mut classified: BTreeMap<String, ClassifiedRef> = BTreeMap::new();
    let mut is_target = false;

    for action in facts.valid_actions() {
        if !is_third_party(action, &facts.owner, first_party) {
            continue;
        }
        is_target = true;
        classified
            .entry(action.to_string())
            .or_insert_with(|| classifier.classify(action));
    }

    let detail: Vec<ClassifiedRef> = classified.into_values().collect();

    if !is_target {
        return (PracticeVerdict::not_a_target(), detail);
    }

    let implemented = !detail.is_empty() && detail.iter().all(|c| c.pinned);
    (PracticeVerdict::target(implemented), detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::practices::tests::{facts_from_yaml, repo_facts};
    use crate::reference::metadata::tests::repo_store;
    use crate::reference::{
        InMemoryActionRepoStore, InMemoryMarketplaceStore, NeverFoundProbe, RefKind,
    };

    fn first_party() -> FirstPartyOwners {
        FirstPartyOwners::from_names(["actions", "github"])
    }

    const SHA: &str = "a1b2c3d4e5f6a1b2c3d4e5f6a1b2c3d4e5f6a1b2";

    #[test]
    fn test_no_third_party_actions_not_a_target() {
        let repos = InMemoryActionRepoStore::default();
        let marketplace = InMemoryMarketplaceStore::default();
        let probe = NeverFoundProbe;
        let classifier = ReferenceClassifier::new(&repos, &marketplace, &probe);

        let facts = repo_facts(vec![facts_from_yaml(
            "ci.yml",
            "jobs:\n  build:\n    steps:\n      - uses: actions/checkout@v4\n      - uses: ./local\n",
        )]);
        let (verdict, detail) = evaluate(&facts, &classifier, &first_party());
        assert_eq!(verdict, PracticeVerdict::not_a_target());
        assert!(verdict.is_implemented.is_none());
        assert!(detail.is_empty());
    }

    #[test]
    fn test_all_pinned_implemented() {
        let repos = InMemoryActionRepoStore::default();
        let marketplace = InMemoryMarketplaceStore::default();
        let probe = NeverFoundProbe;
        let classifier = ReferenceClassifier::new(&repos, &marketplace, &probe);

        let yaml = format!(
            "jobs:\n  build:\n    steps:\n      - uses: org/tool@{SHA}\n"
        );
        let facts = repo_facts(vec![facts_from_yaml("ci.yml", &yaml)]);
        let (verdict, detail) = evaluate(&facts, &classifier, &first_party());
        assert_eq!(verdict, PracticeVerdict::target(true));
        assert_eq!(detail.len(), 1);
        assert_eq!(detail[0].kind, RefKind::Sha1);
    }

    #[test]
    fn test_one_unpinned_fails_practice() {
        let repos = repo_store("org/tool", &["v1"], &[]);
        let marketplace = InMemoryMarketplaceStore::default();
        let probe = NeverFoundProbe;
        let classifier = ReferenceClassifier::new(&repos, &marketplace, &probe);

        let yaml = format!(
            "jobs:\n  build:\n    steps:\n      - uses: org/pinned@{SHA}\n      - uses: org/tool@v1\n"
        );
        let facts = repo_facts(vec![facts_from_yaml("ci.yml", &yaml)]);
        let (verdict, detail) = evaluate(&facts, &classifier, &first_party());
        assert_eq!(verdict, PracticeVerdict::target(false));
        assert_eq!(detail.len(), 2);
    }

    #[test]
    fn test_duplicate_reference_classified_once() {
        let repos = InMemoryActionRepoStore::default();
        let marketplace = InMemoryMarketplaceStore::default();
        let probe = NeverFoundProbe;
        let classifier = ReferenceClassifier::new(&repos, &marketplace, &probe);

        let yaml = format!(
            "jobs:\n  a:\n    steps:\n      - uses: org/tool@{SHA}\n  b:\n    steps:\n      - uses: org/tool@{SHA}\n"
        );
        let facts = repo_facts(vec![facts_from_yaml("ci.yml", &yaml)]);
        let (_, detail) = evaluate(&facts, &classifier, &first_party());
        assert_eq!(detail.len(), 1);
    }

    #[test]
    fn test_owner_actions_out_of_scope() {
        let repos = repo_store("acme/tool", &["v1"], &[]);
        let marketplace = InMemoryMarketplaceStore::default();
        let probe = NeverFoundProbe;
        let classifier = ReferenceClassifier::new(&repos, &marketplace, &probe);

        // repo_facts uses owner "acme"; its own unpinned action is ignored.
        let facts = repo_facts(vec![facts_from_yaml(
            "ci.yml",
            "jobs:\n  build:\n    steps:\n      - uses: acme/tool@v1\n",
        )]);
        let (verdict, _) = evaluate(&facts, &classifier, &first_party());
        assert_eq!(verdict, PracticeVerdict::not_a_target());
    }
}
