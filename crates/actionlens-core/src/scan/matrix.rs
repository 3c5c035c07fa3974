use regex::Regex;
use serde_yaml::Value;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// One occurrence of a matrix axis bound to a concrete value.
///
/// The same path can appear more than once when the matrix defines the axis in
/// several places, e.g. once per entry of an `include` list.
#[derive(Debug, Clone)]
pub struct MatrixBinding {
    pub path: String,
    pub value: Value,
}

fn matrix_expr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // The leading group stands in for a left word boundary: `xmatrix.os` and
    // `github.matrix.os` must not count as matrix expressions.
    RE.get_or_init(|| {
        Regex::new(r"(?:^|[^A-Za-z0-9_.])(matrix\.[A-Za-z0-9_-]+(?:\.[A-Za-z0-9_-]+)*)")
            .expect("matrix expression regex")
    })
}

/// Extract every distinct `matrix.<path>` expression appearing in `text`.
pub fn extract_matrix_exprs(text: &str) -> BTreeSet<String> {
    matrix_expr_re()
        .captures_iter(text)
        .map(|cap| cap[1].to_string())
        .collect()
}

/// Resolve every matrix expression found in `text` against a job's `strategy`
/// block, yielding each binding occurrence in walk order.
///
/// `matrix.include.<axis>` paths are collapsed to `matrix.<axis>` before the
/// stop-set test, so an axis defined only through `include` still resolves.
pub fn resolve_matrix_refs(text: &str, strategy: Option<&Value>) -> Vec<MatrixBinding> {
    let stop_set = extract_matrix_exprs(text);
    let mut bindings = Vec::new();
    if stop_set.is_empty() {
        return bindings;
    }
    if let Some(strategy) = strategy {
        walk(strategy, String::new(), &stop_set, &mut bindings);
    }
    bindings
}

fn normalize_path(path: &str) -> String {
    match path.strip_prefix("matrix.include.") {
        Some(rest) => format!("matrix.{rest}"),
        None => path.to_string(),
    }
}

fn walk(node: &Value, path: String, stop_set: &BTreeSet<String>, out: &mut Vec<MatrixBinding>) {
    let normalized = normalize_path(&path);
    if stop_set.contains(&normalized) {
        out.push(MatrixBinding {
            path: normalized,
            value: node.clone(),
        });
        // A matched node can still contain deeper matches; keep walking.
    }

    match node {
        Value::Mapping(map) => {
            for (key, value) in map {
                let key = crate::parser::value_text(key);
                let child = if path.is_empty() {
                    key
                } else {
                    format!("{path}.{key}")
                };
                walk(value, child, stop_set, out);
            }
        }
        Value::Sequence(seq) => {
            // Sequence entries do not add a path segment.
            for value in seq {
                walk(value, path.clone(), stop_set, out);
            }
        }
        _ => {}
    }
}
