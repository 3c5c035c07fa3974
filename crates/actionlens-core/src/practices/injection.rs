use super::{PracticeVerdict, RepoFacts};
use crate::scan::{StepLabel, WorkflowContextReport};

/// A step's label list folded to its dominant pattern. Risk dominates: a step
/// that both interpolates directly and routes through an env var is a risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextFold {
    InjectionRisk,
    Practice1,
    Practice2,
}

pub fn fold_step(labels: &[StepLabel]) -> Option<ContextFold> {
    if labels.is_empty() {
        return None;
    }
    if labels.iter().any(StepLabel::is_injection_risk) {
        Some(ContextFold::InjectionRisk)
    } else if labels.iter().any(StepLabel::is_practice1) {
        Some(ContextFold::Practice1)
    } else if labels.contains(&StepLabel::Practice2) {
        Some(ContextFold::Practice2)
    } else {
        None
    }
}

/// Fold every labeled step of a workflow, in step order.
pub fn workflow_folds(report: &WorkflowContextReport) -> Vec<ContextFold> {
    report
        .jobs
        .iter()
        .flat_map(|job| job.steps.iter())
        .filter_map(|step| fold_step(&step.labels))
        .collect()
}

/// P2 — injection mitigation. Target when some valid workflow uses the
/// untrusted context in a classifiable way; implemented only when no step
/// anywhere folds to an injection risk. A single mitigated step does not
/// excuse an unmitigated one elsewhere.
pub fn evaluate(facts: &RepoFacts) -> PracticeVerdict {
    let mut is_target = false;
    let mut risk_found = false;

    for (_, context) in facts.valid_contexts() {
        if !context.use_github_context {
            continue;
        }
        let folds = workflow_folds(context);
        if folds.is_empty() {
            continue;
        }
        is_target = true;
        if folds.contains(&ContextFold::InjectionRisk) {
            risk_found = true;
        }
    }

    if is_target {
        PracticeVerdict::target(!risk_found)
    } else {
        PracticeVerdict::not_a_target()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::practices::tests::{facts_from_yaml, invalid_facts, repo_facts};

    const RISKY: &str = r#"
jobs:
  greet:
    steps:
      - run: echo ${{ github.event.issue.title }}
"#;

    const MITIGATED: &str = r#"
jobs:
  greet:
    env:
      TITLE: ${{ github.event.issue.title }}
    steps:
      - run: echo "$TITLE"
"#;

    const NO_CONTEXT: &str = r#"
jobs:
  build:
    steps:
      - run: make
"#;

    // The signature appears (env value) but no step references it, so there is
    // no classifiable pattern.
    const UNCLASSIFIED: &str = r#"
env:
  TITLE: ${{ github.event.issue.title }}
jobs:
  build:
    steps:
      - run: make
"#;

    #[test]
    fn test_fold_risk_dominates() {
        let labels = vec![StepLabel::Practice2, StepLabel::InjectionRiskBasic];
        assert_eq!(fold_step(&labels), Some(ContextFold::InjectionRisk));
    }

    #[test]
    fn test_fold_idempotent_under_duplicates() {
        let once = vec![StepLabel::Practice2];
        let twice = vec![StepLabel::Practice2, StepLabel::Practice2];
        assert_eq!(fold_step(&once), fold_step(&twice));
    }

    #[test]
    fn test_no_context_is_not_a_target() {
        let facts = repo_facts(vec![facts_from_yaml("ci.yml", NO_CONTEXT)]);
        assert_eq!(evaluate(&facts), PracticeVerdict::not_a_target());
    }

    #[test]
    fn test_unclassified_context_is_not_a_target() {
        let facts = repo_facts(vec![facts_from_yaml("ci.yml", UNCLASSIFIED)]);
        assert_eq!(evaluate(&facts), PracticeVerdict::not_a_target());
    }

    #[test]
    fn test_risk_means_not_implemented() {
        let facts = repo_facts(vec![facts_from_yaml("ci.yml", RISKY)]);
        assert_eq!(evaluate(&facts), PracticeVerdict::target(false));
    }

    #[test]
    fn test_mitigated_only_is_implemented() {
        let facts = repo_facts(vec![facts_from_yaml("ci.yml", MITIGATED)]);
        assert_eq!(evaluate(&facts), PracticeVerdict::target(true));
    }

    #[test]
    fn test_mitigation_does_not_excuse_risk_elsewhere() {
        let facts = repo_facts(vec![
            facts_from_yaml("safe.yml", MITIGATED),
            facts_from_yaml("risky.yml", RISKY),
        ]);
        assert_eq!(evaluate(&facts), PracticeVerdict::target(false));
    }

    #[test]
    fn test_invalid_workflow_ignored() {
        let facts = repo_facts(vec![
            invalid_facts("broken.yml", "invalid YAML"),
            facts_from_yaml("safe.yml", MITIGATED),
        ]);
        assert_eq!(evaluate(&facts), PracticeVerdict::target(true));
    }
}
