pub mod injection;
pub mod ownership;
pub mod pinning;
pub mod scorecard;

use crate::reference::{ClassifiedRef, FirstPartyOwners, ReferenceClassifier};
use crate::scan::WorkflowContextReport;
use serde::{Deserialize, Serialize};

/// Outcome of one practice for one repository.
///
/// `is_implemented` is `None` exactly when the practice does not apply; it is
/// never `Some(false)` for a non-target repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PracticeVerdict {
    pub is_target: bool,
    pub is_implemented: Option<bool>,
}

impl PracticeVerdict {
    pub fn not_a_target() -> Self {
        PracticeVerdict {
            is_target: false,
            is_implemented: None,
        }
    }

    pub fn target(implemented: bool) -> Self {
        PracticeVerdict {
            is_target: true,
            is_implemented: Some(implemented),
        }
    }
}

/// Everything the evaluators need to know about one workflow file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowFacts {
    pub file: String,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<WorkflowContextReport>,
    pub actions: Vec<String>,
}

/// CODEOWNERS facts gathered from the repository tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodeownersFacts {
    /// Relative path of the highest-priority CODEOWNERS file found, if any.
    pub path: Option<String>,
    /// Non-blank, non-comment lines in that file.
    pub rule_count: usize,
}

/// The full input to practice evaluation for one repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoFacts {
    pub owner: String,
    pub workflows: Vec<WorkflowFacts>,
    pub codeowners: CodeownersFacts,
}

impl RepoFacts {
    /// Context reports of valid workflows, paired with the file name.
    pub fn valid_contexts(&self) -> impl Iterator<Item = (&str, &WorkflowContextReport)> {
        self.workflows.iter().filter_map(|w| {
            let context = w.context.as_ref()?;
            w.valid.then_some((w.file.as_str(), context))
        })
    }

    /// Action references of valid workflows.
    pub fn valid_actions(&self) -> impl Iterator<Item = &str> {
        self.workflows
            .iter()
            .filter(|w| w.valid)
            .flat_map(|w| w.actions.iter().map(String::as_str))
    }
}

/// Verdicts for all four practices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PracticeSummary {
    pub ownership: PracticeVerdict,
    pub injection_mitigation: PracticeVerdict,
    pub scorecard: PracticeVerdict,
    pub pinning: PracticeVerdict,
}

/// Evaluate P1-P4 for one repository. Returns the verdicts plus the per-
/// reference pinning classifications backing P4.
pub fn evaluate_all(
    facts: &RepoFacts,
    classifier: &ReferenceClassifier<'_>,
    first_party: &FirstPartyOwners,
) -> (PracticeSummary, Vec<ClassifiedRef>) {
    let (pinning_verdict, classified) = pinning::evaluate(facts, classifier, first_party);
    let summary = PracticeSummary {
        ownership: ownership::evaluate(facts),
        injection_mitigation: injection::evaluate(facts),
        scorecard: scorecard::evaluate(facts),
        pinning: pinning_verdict,
    };
    (summary, classified)
}
