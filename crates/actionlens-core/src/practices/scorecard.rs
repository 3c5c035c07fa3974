use super::{PracticeVerdict, RepoFacts};

/// The scorecard action, matched by name with the ref ignored.
pub const SCORECARD_ACTION: &str = "ossf/scorecard-action";

/// P3 — supply-chain scorecard. Every repository is a target; implemented when
/// any valid workflow invokes the scorecard action.
pub fn evaluate(facts: &RepoFacts) -> PracticeVerdict {
    let uses_scorecard = facts.valid_actions().any(|action| {
        let name = action.split('@').next().unwrap_or(action);
        name == SCORECARD_ACTION
    });
    PracticeVerdict::target(uses_scorecard)
}
