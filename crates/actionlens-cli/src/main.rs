mod display;

use actionlens_core::config::Settings;
use actionlens_core::parser::WorkflowFile;
use actionlens_core::providers::{CachingMetadataStore, GitHubClient};
use actionlens_core::reference::{
    ActionRepoStore, CommitProbe, FirstPartyOwners, InMemoryActionRepoStore,
    InMemoryMarketplaceStore, NeverFoundProbe, ReferenceClassifier,
};
use actionlens_core::repo::{analyze_repository, infer_owner};
use actionlens_core::scan::scan_workflow;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "actionlens",
    version,
    about = "actionlens — security practice analyzer for GitHub Actions workflows",
    long_about = "Evaluate a repository's CI workflows for code-review ownership, \
injection mitigation, scorecard usage, and third-party action pinning."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate all security practices for a repository checkout
    Analyze {
        /// Path to the repository working tree
        path: PathBuf,

        /// Repository owner (defaults to the checkout's parent directory name)
        #[arg(long)]
        owner: Option<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Settings file (actionlens.toml)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Resolve missing tag/branch metadata and short hashes via the
        /// GitHub API instead of classifying them as unknown
        #[arg(long)]
        online: bool,
    },

    /// Show the per-step context label breakdown for one workflow file
    Context {
        /// Path to a workflow YAML file
        path: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Classify a single action reference (owner/repo@ref)
    Classify {
        /// The action reference, e.g. actions/checkout@v4
        reference: String,

        /// Settings file (actionlens.toml)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Consult the GitHub API for metadata not found in local stores
        #[arg(long)]
        online: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            path,
            owner,
            format,
            config,
            online,
        } => cmd_analyze(&path, owner.as_deref(), &format, config.as_deref(), online),
        Commands::Context { path, format } => cmd_context(&path, &format),
        Commands::Classify {
            reference,
            config,
            online,
        } => cmd_classify(&reference, config.as_deref(), online),
    }
}

/// Local stores loaded from the settings' data paths; anything missing is an
/// empty store.
struct Stores {
    actions: Option<InMemoryActionRepoStore>,
    marketplace: InMemoryMarketplaceStore,
    first_party: FirstPartyOwners,
}

fn load_stores(settings: &Settings) -> Result<Stores> {
    let actions = settings
        .actions_data
        .as_deref()
        .map(InMemoryActionRepoStore::load)
        .transpose()?;

    let marketplace = settings
        .marketplace_data
        .as_deref()
        .map(InMemoryMarketplaceStore::load)
        .transpose()?
        .unwrap_or_default();

    let first_party = settings
        .firstparty_data
        .as_deref()
        .map(FirstPartyOwners::load)
        .transpose()?
        .unwrap_or_else(FirstPartyOwners::builtin);

    Ok(Stores {
        actions,
        marketplace,
        first_party,
    })
}

fn cmd_analyze(
    path: &Path,
    owner: Option<&str>,
    format: &str,
    config: Option<&Path>,
    online: bool,
) -> Result<()> {
    let settings = Settings::load_or_default(config)?;
    let stores = load_stores(&settings)?;

    let owner = match owner {
        Some(owner) => owner.to_string(),
        None => infer_owner(path).context(
            "Could not infer the repository owner from the path; pass --owner explicitly",
        )?,
    };

    let report = if online {
        let client = GitHubClient::from_settings(&settings)?;
        let repo_store = CachingMetadataStore::new(&client, stores.actions);
        let classifier =
            ReferenceClassifier::new(&repo_store, &stores.marketplace, &client);
        analyze_repository(path, &owner, &classifier, &stores.first_party)?
    } else {
        let repo_store = stores.actions.unwrap_or_default();
        let probe = NeverFoundProbe;
        let classifier = ReferenceClassifier::new(&repo_store, &stores.marketplace, &probe);
        analyze_repository(path, &owner, &classifier, &stores.first_party)?
    };

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => display::print_repo_report(&report),
    }

    Ok(())
}

fn cmd_context(path: &Path, format: &str) -> Result<()> {
    let parsed = WorkflowFile::parse_file(path);
    let doc = match &parsed {
        WorkflowFile::Valid(doc) => doc,
        WorkflowFile::Invalid { reason } => {
            anyhow::bail!("'{}' is not a valid workflow: {}", path.display(), reason)
        }
    };

    let report = scan_workflow(doc);
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => display::print_context_report(&path.display().to_string(), &report),
    }

    Ok(())
}

fn cmd_classify(reference: &str, config: Option<&Path>, online: bool) -> Result<()> {
    let settings = Settings::load_or_default(config)?;
    let stores = load_stores(&settings)?;

    let classified = if online {
        let client = GitHubClient::from_settings(&settings)?;
        let repo_store = CachingMetadataStore::new(&client, stores.actions);
        classify_one(reference, &repo_store, &stores.marketplace, &client)
    } else {
        let repo_store = stores.actions.unwrap_or_default();
        classify_one(reference, &repo_store, &stores.marketplace, &NeverFoundProbe)
    };

    display::print_classification(&classified);
    Ok(())
}

fn classify_one(
    reference: &str,
    repos: &dyn ActionRepoStore,
    marketplace: &InMemoryMarketplaceStore,
    probe: &dyn CommitProbe,
) -> actionlens_core::ClassifiedRef {
    ReferenceClassifier::new(repos, marketplace, probe).classify(reference)
}
