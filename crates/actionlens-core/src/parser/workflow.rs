use serde_yaml::Value;
use std::path::Path;
use thiserror::Error;

/// Reasons a workflow file fails to produce a document.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("workflow file is empty")]
    Empty,
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("workflow root is not a mapping")]
    NotAMapping,
}

/// One workflow file, either parsed or recorded as invalid.
///
/// Invalid files are kept alongside valid ones so that a repository report can
/// account for every file it looked at; they are excluded from all scans.
#[derive(Debug, Clone)]
pub enum WorkflowFile {
    Valid(WorkflowDocument),
    Invalid { reason: String },
}

impl WorkflowFile {
    /// Parse workflow YAML content. Never fails; malformed input becomes
    /// the `Invalid` marker with a human-readable reason.
    pub fn parse(content: &str) -> Self {
        match WorkflowDocument::parse(content) {
            Ok(doc) => WorkflowFile::Valid(doc),
            Err(e) => WorkflowFile::Invalid {
                reason: e.to_string(),
            },
        }
    }

    /// Read and parse a workflow file. IO failures are recorded as invalid,
    /// not raised; one unreadable file must not abort a repository scan.
    pub fn parse_file(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(e) => WorkflowFile::Invalid {
                reason: format!("failed to read {}: {}", path.display(), e),
            },
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, WorkflowFile::Valid(_))
    }

    pub fn document(&self) -> Option<&WorkflowDocument> {
        match self {
            WorkflowFile::Valid(doc) => Some(doc),
            WorkflowFile::Invalid { .. } => None,
        }
    }
}

/// Normalized in-memory view of one workflow.
///
/// `env` and the per-job `env`/`strategy` fields keep the raw YAML value:
/// an env block may be a mapping or a matrix-expanded expression string, and
/// the scanner decides how to interpret each shape. The full parsed value is
/// retained for whole-document text checks and `with` serialization.
#[derive(Debug, Clone)]
pub struct WorkflowDocument {
    pub name: Option<String>,
    pub env: Option<Value>,
    pub jobs: Vec<Job>,
    pub raw: Value,
}

/// A single job, with steps in document order.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    pub env: Option<Value>,
    pub strategy: Option<Value>,
    pub steps: Vec<Step>,
}

/// A single step. `index` is 1-based within the owning job.
#[derive(Debug, Clone)]
pub struct Step {
    pub index: usize,
    pub name: Option<String>,
    pub env: Option<Value>,
    pub run: Option<String>,
    pub uses: Option<String>,
    pub with: Option<Value>,
}

impl WorkflowDocument {
    pub fn parse(content: &str) -> Result<Self, ParseError> {
        if content.trim().is_empty() {
            return Err(ParseError::Empty);
        }

        let raw: Value = serde_yaml::from_str(content)?;
        if raw.is_null() {
            // A file holding only comments parses to null.
            return Err(ParseError::Empty);
        }
        if !raw.is_mapping() {
            return Err(ParseError::NotAMapping);
        }

        let name = raw.get("name").and_then(|v| v.as_str()).map(String::from);

        let env = raw.get("env").cloned();

        let mut jobs = Vec::new();
        if let Some(jobs_map) = raw.get("jobs").and_then(|v| v.as_mapping()) {
            for (job_id, job_config) in jobs_map {
                let job_id = job_id.as_str().unwrap_or("unknown").to_string();
                jobs.push(Self::parse_job(job_id, job_config));
            }
        }

        Ok(WorkflowDocument {
            name,
            env,
            jobs,
            raw,
        })
    }

    fn parse_job(id: String, config: &Value) -> Job {
        let env = config.get("env").cloned();
        let strategy = config.get("strategy").cloned();

        let mut steps = Vec::new();
        if let Some(seq) = config.get("steps").and_then(|v| v.as_sequence()) {
            for (pos, step) in seq.iter().enumerate() {
                steps.push(Self::parse_step(pos + 1, step));
            }
        }

        Job {
            id,
            env,
            strategy,
            steps,
        }
    }

    fn parse_step(index: usize, step: &Value) -> Step {
        let name = step.get("name").and_then(|v| v.as_str()).map(String::from);
        let env = step.get("env").cloned();
        let run = step.get("run").map(super::value_text);
        let uses = step.get("uses").map(super::value_text);
        let with = step.get("with").cloned();

        Step {
            index,
            name,
            env,
            run,
            uses,
            with,
        }
    }

    /// Every `uses:` reference in the document, in step order.
    pub fn action_refs(&self) -> Vec<String> {
        self.jobs
            .iter()
            .flat_map(|job| job.steps.iter())
            .filter_map(|step| step.uses.clone())
            .collect()
    }
}
