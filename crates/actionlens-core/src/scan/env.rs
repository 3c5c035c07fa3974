use super::matrix::resolve_matrix_refs;
use super::CONTEXT_SIGNATURE;
use crate::parser::value_text;
use serde_yaml::Value;
use std::collections::BTreeSet;

/// An environment variable whose value carries the untrusted-context
/// signature. Ordered by name then value so scope unions stay deterministic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct TaintedVar {
    pub name: String,
    pub value: String,
}

/// Extract the context-tainted entries of one env block.
///
/// An env block is usually a mapping, but a job can also set `env` to a single
/// matrix expression string; in that shape the entries come from resolving the
/// expression against the job's strategy. Binding values that are mappings
/// contribute entries directly, sequences of mappings are flattened one level.
pub fn tainted_env(env: Option<&Value>, strategy: Option<&Value>) -> Vec<TaintedVar> {
    let mut out = Vec::new();
    let Some(env) = env else {
        return out;
    };

    match env {
        Value::Mapping(map) => {
            for (key, value) in map {
                push_if_tainted(&mut out, key, value);
            }
        }
        Value::String(text) => {
            if !text.contains("matrix.") {
                if text.contains(CONTEXT_SIGNATURE) {
                    // Context data in a bare env string has no variable name to
                    // mitigate through; surface it and move on.
                    eprintln!("Warning: unexpected string env block carrying event context: {text}");
                }
                return out;
            }
            for binding in resolve_matrix_refs(text, strategy) {
                match binding.value {
                    Value::Mapping(map) => {
                        for (key, value) in &map {
                            push_if_tainted(&mut out, key, value);
                        }
                    }
                    Value::Sequence(seq) => {
                        for item in &seq {
                            if let Value::Mapping(map) = item {
                                for (key, value) in map {
                                    push_if_tainted(&mut out, key, value);
                                }
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        _ => {}
    }

    out
}

fn push_if_tainted(out: &mut Vec<TaintedVar>, key: &Value, value: &Value) {
    let value = value_text(value);
    if value.contains(CONTEXT_SIGNATURE) {
        out.push(TaintedVar {
            name: value_text(key),
            value,
        });
    }
}

/// Union the tainted vars visible at a step: workflow, job, and step scope.
///
/// The union is by (name, value) pair with no precedence between scopes; the
/// scanner only needs the name set, never a resolved value.
pub fn scope_union<'a>(
    scopes: impl IntoIterator<Item = &'a [TaintedVar]>,
) -> BTreeSet<TaintedVar> {
    scopes
        .into_iter()
        .flat_map(|vars| vars.iter().cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    #[test]
    fn test_mapping_env_tainted_entries() {
        let env = yaml("TITLE: ${{ github.event.issue.title }}\nSAFE: hello\n");
        let vars = tainted_env(Some(&env), None);
        assert_eq!(vars.len(), 1);
        assert_eq!(vars[0].name, "TITLE");
    }

    #[test]
    fn test_mapping_env_non_string_value() {
        let env = yaml("COUNT: 3\n");
        assert!(tainted_env(Some(&env), None).is_empty());
    }

    #[test]
    fn test_string_env_without_matrix_contributes_nothing() {
        let env = Value::String("${{ github.event.issue.title }}".into());
        assert!(tainted_env(Some(&env), None).is_empty());
    }

    #[test]
    fn test_string_env_resolved_through_matrix_mapping() {
        let strategy = yaml(
            "matrix:\n  env:\n    - TITLE: ${{ github.event.issue.title }}\n      SAFE: ok\n",
        );
        let env = Value::String("${{ matrix.env }}".into());
        let vars = tainted_env(Some(&env), Some(&strategy));
        assert_eq!(vars.len(), 1);
        assert_eq!(vars[0].name, "TITLE");
    }

    #[test]
    fn test_string_env_matrix_scalar_binding_ignored() {
        let strategy = yaml("matrix:\n  env: [plain]\n");
        let env = Value::String("${{ matrix.env }}".into());
        assert!(tainted_env(Some(&env), Some(&strategy)).is_empty());
    }

    #[test]
    fn test_scope_union_dedupes_identical_pairs() {
        let a = vec![TaintedVar {
            name: "X".into(),
            value: "${{ github.event.a }}".into(),
        }];
        let b = a.clone();
        let union = scope_union([a.as_slice(), b.as_slice()]);
        assert_eq!(union.len(), 1);
    }

    #[test]
    fn test_scope_union_keeps_same_name_different_value() {
        let a = vec![TaintedVar {
            name: "X".into(),
            value: "${{ github.event.a }}".into(),
        }];
        let b = vec![TaintedVar {
            name: "X".into(),
            value: "${{ github.event.b }}".into(),
        }];
        let union = scope_union([a.as_slice(), b.as_slice()]);
        assert_eq!(union.len(), 2);
    }
}
