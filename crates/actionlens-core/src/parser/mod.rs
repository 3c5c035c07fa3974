pub mod workflow;

pub use workflow::{Job, ParseError, Step, WorkflowDocument, WorkflowFile};

use serde_yaml::Value;

/// Render a YAML value as plain searchable text.
///
/// Strings come back verbatim; everything else is serialized YAML with the
/// trailing newline stripped. All signature and variable-name checks in the
/// scanner operate on this textual form.
pub(crate) fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .unwrap_or_default()
            .trim_end()
            .to_string(),
    }
}
