pub mod metadata;

pub use metadata::{
    ActionRepoMetadata, ActionRepoStore, CommitProbe, FetchResult, FirstPartyOwners,
    InMemoryActionRepoStore, InMemoryMarketplaceStore, MarketplaceListing, MarketplaceStore,
    NeverFoundProbe,
};

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// How immutably an action reference is pinned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    Sha1,
    ShortSha1,
    Tag,
    Branch,
    UnknownOrNotFound,
    Default,
}

impl RefKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefKind::Sha1 => "sha1",
            RefKind::ShortSha1 => "short_sha1",
            RefKind::Tag => "tag",
            RefKind::Branch => "branch",
            RefKind::UnknownOrNotFound => "unknown_or_notfound",
            RefKind::Default => "default",
        }
    }
}

/// An `owner/repo[@ref]` action reference, split and normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRef {
    /// `owner/repo`, with any leading `/` segment dropped and subdirectory
    /// paths (`owner/repo/sub/dir`) truncated to the repository.
    pub slug: String,
    pub git_ref: Option<String>,
}

impl ActionRef {
    pub fn parse(reference: &str) -> Self {
        let (name, git_ref) = match reference.split_once('@') {
            Some((name, r)) => (name, Some(r.to_string())),
            None => (reference, None),
        };

        let parts: Vec<&str> = name.split('/').collect();
        let slug = if name.starts_with('/') {
            parts.iter().skip(1).take(2).cloned().collect::<Vec<_>>().join("/")
        } else {
            parts.iter().take(2).cloned().collect::<Vec<_>>().join("/")
        };

        ActionRef { slug, git_ref }
    }

    pub fn owner(&self) -> &str {
        self.slug.split('/').next().unwrap_or(&self.slug)
    }
}

/// Is this reference an in-scope third-party action for `repo_owner`?
///
/// Local path actions and container images are never in scope; neither are
/// actions owned by the consuming repository's owner or a first-party account.
pub fn is_third_party(reference: &str, repo_owner: &str, first_party: &FirstPartyOwners) -> bool {
    if reference.starts_with("./") || reference.starts_with("docker://") {
        return false;
    }
    let action = ActionRef::parse(reference);
    let owner = action.owner();
    !owner.is_empty() && owner != repo_owner && !first_party.contains(owner)
}

fn sha1_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9a-fA-F]{40}$").expect("sha1 regex"))
}

fn short_sha1_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9a-fA-F]{4,39}$").expect("short sha1 regex"))
}

/// Classification outcome for one reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedRef {
    pub reference: String,
    pub slug: String,
    pub kind: RefKind,
    pub pinned: bool,
}

/// Classifies action references against injected read-only metadata.
///
/// The classifier itself performs no IO beyond what the injected stores and
/// probe do, so it runs offline against in-memory fixtures in tests.
pub struct ReferenceClassifier<'a> {
    pub repos: &'a dyn ActionRepoStore,
    pub marketplace: &'a dyn MarketplaceStore,
    pub probe: &'a dyn CommitProbe,
}

impl<'a> ReferenceClassifier<'a> {
    pub fn new(
        repos: &'a dyn ActionRepoStore,
        marketplace: &'a dyn MarketplaceStore,
        probe: &'a dyn CommitProbe,
    ) -> Self {
        Self {
            repos,
            marketplace,
            probe,
        }
    }

    /// Classify the ref part of one action reference.
    pub fn ref_kind(&self, action: &ActionRef) -> RefKind {
        let Some(git_ref) = &action.git_ref else {
            return RefKind::Default;
        };

        if sha1_re().is_match(git_ref) {
            return RefKind::Sha1;
        }

        if short_sha1_re().is_match(git_ref) {
            // A short hex ref that fails the commit probe is never retried
            // against tags or branches, even though such a name could exist
            // as either. Longstanding behavior, kept as-is.
            if self.probe.commit_exists(&action.slug, git_ref) {
                return RefKind::ShortSha1;
            }
            return RefKind::UnknownOrNotFound;
        }

        let (tags, branches) = match self.repos.lookup(&action.slug) {
            Some(meta) => (meta.tags.usable_names(), meta.branches.usable_names()),
            None => (Vec::new(), Vec::new()),
        };

        if tags.iter().any(|t| t == git_ref) {
            RefKind::Tag
        } else if branches.iter().any(|b| b == git_ref) {
            RefKind::Branch
        } else {
            RefKind::UnknownOrNotFound
        }
    }

    /// Full classification plus the pinning verdict.
    ///
    /// Commit-pinned refs are pinned unconditionally; tag refs only count when
    /// the marketplace reports a verified publisher; everything else is
    /// mutable and therefore unpinned.
    pub fn classify(&self, reference: &str) -> ClassifiedRef {
        let action = ActionRef::parse(reference);
        let kind = self.ref_kind(&action);

        let pinned = match kind {
            RefKind::Sha1 | RefKind::ShortSha1 => true,
            RefKind::Tag => self.is_verified_publisher(&action.slug),
            RefKind::Branch | RefKind::Default | RefKind::UnknownOrNotFound => false,
        };

        ClassifiedRef {
            reference: reference.to_string(),
            slug: action.slug,
            kind,
            pinned,
        }
    }

    fn is_verified_publisher(&self, slug: &str) -> bool {
        match self.marketplace.lookup(slug) {
            Some(listing) => listing.has_marketplace_listing && listing.is_verified_publisher,
            None => false,
        }
    }
}
