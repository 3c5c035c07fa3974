use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// Outcome of one tag or branch listing fetch. A failed fetch keeps whatever
/// was recorded but contributes nothing to classification.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchResult {
    pub success: bool,
    #[serde(default)]
    pub names: Vec<String>,
}

impl FetchResult {
    pub fn ok(names: Vec<String>) -> Self {
        FetchResult {
            success: true,
            names,
        }
    }

    pub fn failed() -> Self {
        FetchResult::default()
    }

    /// Names usable for classification: empty unless the fetch succeeded.
    pub fn usable_names(&self) -> Vec<String> {
        if self.success {
            self.names.clone()
        } else {
            Vec::new()
        }
    }
}

/// Tag and branch listings for one action repository.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionRepoMetadata {
    pub tags: FetchResult,
    pub branches: FetchResult,
}

/// Marketplace listing facts for one action repository.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketplaceListing {
    pub has_marketplace_listing: bool,
    pub is_verified_publisher: bool,
}

/// Read-only lookup of tag/branch metadata by `owner/repo` slug.
pub trait ActionRepoStore {
    fn lookup(&self, slug: &str) -> Option<ActionRepoMetadata>;
}

/// Read-only lookup of marketplace listing facts by slug.
pub trait MarketplaceStore {
    fn lookup(&self, slug: &str) -> Option<MarketplaceListing>;
}

/// Existence check for a commit addressed by a short hash.
pub trait CommitProbe {
    fn commit_exists(&self, slug: &str, short_sha: &str) -> bool;
}

/// Probe for offline runs: every short hash is treated as not found.
pub struct NeverFoundProbe;

impl CommitProbe for NeverFoundProbe {
    fn commit_exists(&self, _slug: &str, _short_sha: &str) -> bool {
        false
    }
}

#[derive(Debug, Deserialize)]
struct ActionRepoFile {
    actions: HashMap<String, ActionRepoMetadata>,
}

/// In-memory action repo metadata, optionally loaded from a JSON file of the
/// shape `{"actions": {"owner/repo": {"tags": {...}, "branches": {...}}}}`.
#[derive(Debug, Default)]
pub struct InMemoryActionRepoStore {
    entries: HashMap<String, ActionRepoMetadata>,
}

impl InMemoryActionRepoStore {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read action metadata file {}", path.display()))?;
        let file: ActionRepoFile = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse action metadata file {}", path.display()))?;
        Ok(Self {
            entries: file.actions,
        })
    }

    pub fn insert(&mut self, slug: &str, metadata: ActionRepoMetadata) {
        self.entries.insert(slug.to_string(), metadata);
    }

    pub fn contains(&self, slug: &str) -> bool {
        self.entries.contains_key(slug)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ActionRepoStore for InMemoryActionRepoStore {
    fn lookup(&self, slug: &str) -> Option<ActionRepoMetadata> {
        self.entries.get(slug).cloned()
    }
}

#[derive(Debug, Deserialize)]
struct MarketplaceFile {
    listings: HashMap<String, MarketplaceListing>,
}

/// In-memory marketplace facts, optionally loaded from a JSON file of the
/// shape `{"listings": {"owner/repo": {"has_marketplace_listing": true, ...}}}`.
#[derive(Debug, Default)]
pub struct InMemoryMarketplaceStore {
    entries: HashMap<String, MarketplaceListing>,
}

impl InMemoryMarketplaceStore {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read marketplace file {}", path.display()))?;
        let file: MarketplaceFile = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse marketplace file {}", path.display()))?;
        Ok(Self {
            entries: file.listings,
        })
    }

    pub fn insert(&mut self, slug: &str, listing: MarketplaceListing) {
        self.entries.insert(slug.to_string(), listing);
    }
}

impl MarketplaceStore for InMemoryMarketplaceStore {
    fn lookup(&self, slug: &str) -> Option<MarketplaceListing> {
        self.entries.get(slug).cloned()
    }
}

#[derive(Debug, Deserialize)]
struct FirstPartyFile {
    firstparty: Vec<String>,
}

/// Curated set of platform-owned accounts whose actions are never third-party.
#[derive(Debug, Clone, Default)]
pub struct FirstPartyOwners {
    owners: BTreeSet<String>,
}

impl FirstPartyOwners {
    /// Load from a JSON file of the shape `{"firstparty": ["actions", ...]}`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read first-party list {}", path.display()))?;
        let file: FirstPartyFile = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse first-party list {}", path.display()))?;
        Ok(Self::from_names(file.firstparty))
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FirstPartyOwners {
            owners: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Platform-owned accounts recognized when no curated list is supplied.
    pub fn builtin() -> Self {
        Self::from_names([
            "actions",
            "github",
            "docker",
            "azure",
            "aws-actions",
            "google-github-actions",
        ])
    }

    pub fn contains(&self, owner: &str) -> bool {
        self.owners.contains(owner)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn repo_store(
        slug: &str,
        tags: &[&str],
        branches: &[&str],
    ) -> InMemoryActionRepoStore {
        let mut store = InMemoryActionRepoStore::default();
        store.insert(
            slug,
            ActionRepoMetadata {
                tags: FetchResult::ok(tags.iter().map(|s| s.to_string()).collect()),
                branches: FetchResult::ok(branches.iter().map(|s| s.to_string()).collect()),
            },
        );
        store
    }

    pub(crate) fn verified_marketplace(slug: &str) -> InMemoryMarketplaceStore {
        let mut store = InMemoryMarketplaceStore::default();
        store.insert(
            slug,
            MarketplaceListing {
                has_marketplace_listing: true,
                is_verified_publisher: true,
            },
        );
        store
    }

    pub(crate) struct FixedProbe {
        slug: String,
        short_sha: String,
    }

    pub(crate) fn probe_with(slug: &str, short_sha: &str) -> FixedProbe {
        FixedProbe {
            slug: slug.to_string(),
            short_sha: short_sha.to_string(),
        }
    }

    impl CommitProbe for FixedProbe {
        fn commit_exists(&self, slug: &str, short_sha: &str) -> bool {
            slug == self.slug && short_sha == self.short_sha
        }
    }

    #[test]
    fn test_failed_fetch_has_no_usable_names() {
        let result = FetchResult {
            success: false,
            names: vec!["v1".into()],
        };
        assert!(result.usable_names().is_empty());
    }

    #[test]
    fn test_load_action_repo_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("actions.json");
        std::fs::write(
            &path,
            r#"{"actions": {"org/tool": {
                "tags": {"success": true, "names": ["v1", "v2"]},
                "branches": {"success": true, "names": ["main"]}
            }}}"#,
        )
        .unwrap();

        let store = InMemoryActionRepoStore::load(&path).unwrap();
        let meta = store.lookup("org/tool").unwrap();
        assert_eq!(meta.tags.names, vec!["v1", "v2"]);
        assert_eq!(meta.branches.names, vec!["main"]);
        assert!(store.lookup("org/other").is_none());
    }

    #[test]
    fn test_load_first_party_owners() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("firstparty.json");
        std::fs::write(&path, r#"{"firstparty": ["actions", "github"]}"#).unwrap();

        let owners = FirstPartyOwners::load(&path).unwrap();
        assert!(owners.contains("actions"));
        assert!(!owners.contains("org"));
    }

    #[test]
    fn test_load_marketplace_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("marketplace.json");
        std::fs::write(
            &path,
            r#"{"listings": {"org/tool": {"has_marketplace_listing": true, "is_verified_publisher": false}}}"#,
        )
        .unwrap();

        let store = InMemoryMarketplaceStore::load(&path).unwrap();
        let listing = store.lookup("org/tool").unwrap();
        assert!(listing.has_marketplace_listing);
        assert!(!listing.is_verified_publisher);
    }
}
