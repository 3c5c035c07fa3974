use crate::discovery::discover_workflows;
use crate::parser::WorkflowFile;
use crate::practices::{
    self, CodeownersFacts, PracticeSummary, RepoFacts, WorkflowFacts,
};
use crate::reference::{ClassifiedRef, FirstPartyOwners, ReferenceClassifier};
use crate::scan::scan_workflow;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// CODEOWNERS locations GitHub recognizes, highest priority first. The first
/// existing candidate decides the practice, even if it holds no rules.
const CODEOWNERS_CANDIDATES: &[&str] = &[".github/CODEOWNERS", "CODEOWNERS", "docs/CODEOWNERS"];

/// Full analysis result for one repository checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoReport {
    pub repository: String,
    pub owner: String,
    pub workflows: Vec<WorkflowFacts>,
    pub practices: PracticeSummary,
    pub pinning_detail: Vec<ClassifiedRef>,
}

/// Analyze one repository end-to-end: discover and parse workflows, scan
/// context usage, gather CODEOWNERS facts, evaluate all four practices.
///
/// Invalid workflow files are recorded with their reason and excluded from
/// every scan; they never abort the repository.
pub fn analyze_repository(
    repo_dir: &Path,
    owner: &str,
    classifier: &ReferenceClassifier<'_>,
    first_party: &FirstPartyOwners,
) -> Result<RepoReport> {
    let mut workflows = Vec::new();
    for path in discover_workflows(repo_dir)? {
        workflows.push(gather_workflow_facts(&path));
    }

    let facts = RepoFacts {
        owner: owner.to_string(),
        workflows,
        codeowners: gather_codeowners(repo_dir),
    };

    let (practices, pinning_detail) = practices::evaluate_all(&facts, classifier, first_party);

    Ok(RepoReport {
        repository: repo_name(repo_dir),
        owner: facts.owner,
        workflows: facts.workflows,
        practices,
        pinning_detail,
    })
}

/// Parse and scan one workflow file into evaluator-ready facts.
pub fn gather_workflow_facts(path: &Path) -> WorkflowFacts {
    let file = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    match WorkflowFile::parse_file(path) {
        WorkflowFile::Valid(doc) => WorkflowFacts {
            file,
            valid: true,
            invalid_reason: None,
            actions: doc.action_refs(),
            context: Some(scan_workflow(&doc)),
        },
        WorkflowFile::Invalid { reason } => WorkflowFacts {
            file,
            valid: false,
            invalid_reason: Some(reason),
            context: None,
            actions: Vec::new(),
        },
    }
}

/// Locate the effective CODEOWNERS file and count its rule lines.
pub fn gather_codeowners(repo_dir: &Path) -> CodeownersFacts {
    for candidate in CODEOWNERS_CANDIDATES {
        let path = repo_dir.join(candidate);
        if !path.is_file() {
            continue;
        }
        let rule_count = match std::fs::read_to_string(&path) {
            Ok(content) => content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .count(),
            Err(e) => {
                eprintln!("Warning: failed to read {}: {}", path.display(), e);
                0
            }
        };
        return CodeownersFacts {
            path: Some(candidate.to_string()),
            rule_count,
        };
    }
    CodeownersFacts::default()
}

/// Infer the repository owner from a `<owner>/<repo>` checkout layout.
pub fn infer_owner(repo_dir: &Path) -> Option<String> {
    repo_dir
        .parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().to_string())
}

fn repo_name(repo_dir: &Path) -> String {
    repo_dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| repo_dir.display().to_string())
}
