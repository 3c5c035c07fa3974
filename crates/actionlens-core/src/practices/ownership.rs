use super::{PracticeVerdict, RepoFacts};

/// P1 — code-review ownership. Every repository is a target; implemented when
/// a recognized CODEOWNERS file exists and carries at least one rule.
pub fn evaluate(facts: &RepoFacts) -> PracticeVerdict {
    PracticeVerdict::target(facts.codeowners.path.is_some() && facts.codeowners.rule_count > 0)
}
