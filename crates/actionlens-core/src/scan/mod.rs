pub mod env;
pub mod matrix;

pub use env::TaintedVar;
pub use matrix::{resolve_matrix_refs, MatrixBinding};

use crate::parser::{value_text, Job, Step, WorkflowDocument};
use serde::{Deserialize, Serialize};

/// Marker for workflow expressions that read event-supplied data. Anything the
/// triggering event controls lives under this prefix.
pub const CONTEXT_SIGNATURE: &str = "github.event.";

/// Per-step classification labels, in emission order. Duplicates can occur
/// (one per matching env var); downstream verdicts use membership only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepLabel {
    InjectionRiskBasic,
    InjectionRiskMatrix,
    Practice1Basic,
    Practice1Matrix,
    Practice1Env,
    Practice2,
}

impl StepLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepLabel::InjectionRiskBasic => "injection_risk_basic",
            StepLabel::InjectionRiskMatrix => "injection_risk_matrix",
            StepLabel::Practice1Basic => "practice1_basic",
            StepLabel::Practice1Matrix => "practice1_matrix",
            StepLabel::Practice1Env => "practice1_env",
            StepLabel::Practice2 => "practice2",
        }
    }

    pub fn is_injection_risk(&self) -> bool {
        matches!(self, StepLabel::InjectionRiskBasic | StepLabel::InjectionRiskMatrix)
    }

    pub fn is_practice1(&self) -> bool {
        matches!(
            self,
            StepLabel::Practice1Basic | StepLabel::Practice1Matrix | StepLabel::Practice1Env
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Run,
    Uses,
    None,
}

/// Context usage breakdown for one workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowContextReport {
    pub use_github_context: bool,
    pub global_env: Vec<TaintedVar>,
    pub jobs: Vec<JobContextReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobContextReport {
    pub job: String,
    pub job_env: Vec<TaintedVar>,
    pub steps: Vec<StepContextReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepContextReport {
    pub index: usize,
    pub kind: StepKind,
    pub labels: Vec<StepLabel>,
    pub step_env: Vec<TaintedVar>,
    pub used_env_keys: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_with: Option<bool>,
}

impl WorkflowContextReport {
    /// True when any step carries at least one label.
    pub fn has_labels(&self) -> bool {
        self.jobs
            .iter()
            .flat_map(|job| job.steps.iter())
            .any(|step| !step.labels.is_empty())
    }
}

/// Scan a workflow for untrusted-context usage.
///
/// The whole-document gate and every per-step check are substring tests over
/// serialized text. That granularity is deliberate: a variable name that
/// happens to occur elsewhere in a script counts as a use. Each step's labels
/// depend only on the three env scopes, the step body, and the job strategy.
pub fn scan_workflow(doc: &WorkflowDocument) -> WorkflowContextReport {
    if !value_text(&doc.raw).contains(CONTEXT_SIGNATURE) {
        return WorkflowContextReport {
            use_github_context: false,
            global_env: Vec::new(),
            jobs: Vec::new(),
        };
    }

    let global_env = env::tainted_env(doc.env.as_ref(), None);

    let jobs = doc
        .jobs
        .iter()
        .map(|job| scan_job(job, &global_env))
        .collect();

    WorkflowContextReport {
        use_github_context: true,
        global_env,
        jobs,
    }
}

fn scan_job(job: &Job, global_env: &[TaintedVar]) -> JobContextReport {
    let job_env = env::tainted_env(job.env.as_ref(), job.strategy.as_ref());

    let steps = job
        .steps
        .iter()
        .map(|step| scan_step(step, job, global_env, &job_env))
        .collect();

    JobContextReport {
        job: job.id.clone(),
        job_env,
        steps,
    }
}

fn scan_step(
    step: &Step,
    job: &Job,
    global_env: &[TaintedVar],
    job_env: &[TaintedVar],
) -> StepContextReport {
    let step_env = env::tainted_env(step.env.as_ref(), job.strategy.as_ref());
    let visible = env::scope_union([global_env, job_env, step_env.as_slice()]);

    let mut kind = StepKind::None;
    let mut labels = Vec::new();
    let mut used_env_keys = Vec::new();
    let mut action = None;
    let mut has_with = None;

    if let Some(run) = &step.run {
        kind = StepKind::Run;

        if run.contains(CONTEXT_SIGNATURE) {
            labels.push(StepLabel::InjectionRiskBasic);
        }

        if run.contains("matrix.") && matrix_resolves_to_context(run, job) {
            labels.push(StepLabel::InjectionRiskMatrix);
        }

        for var in &visible {
            if run.contains(&var.name) {
                labels.push(StepLabel::Practice2);
                used_env_keys.push(var.name.clone());
            }
        }
    }

    if let Some(uses) = &step.uses {
        kind = StepKind::Uses;
        action = Some(uses.clone());

        match &step.with {
            Some(with) => {
                has_with = Some(true);
                let with_text = value_text(with);

                if with_text.contains(CONTEXT_SIGNATURE) {
                    labels.push(StepLabel::Practice1Basic);
                }

                if with_text.contains("matrix.") && matrix_resolves_to_context(&with_text, job) {
                    labels.push(StepLabel::Practice1Matrix);
                }

                for var in &visible {
                    if with_text.contains(&var.name) {
                        labels.push(StepLabel::Practice1Env);
                        used_env_keys.push(var.name.clone());
                    }
                }
            }
            None => has_with = Some(false),
        }
    }

    StepContextReport {
        index: step.index,
        kind,
        labels,
        step_env,
        used_env_keys,
        action,
        has_with,
    }
}

/// Does any matrix binding reachable from `text` carry the signature?
fn matrix_resolves_to_context(text: &str, job: &Job) -> bool {
    resolve_matrix_refs(text, job.strategy.as_ref())
        .iter()
        .any(|binding| value_text(&binding.value).contains(CONTEXT_SIGNATURE))
}
