use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Locate the workflow files of a repository checkout.
///
/// GitHub only executes workflows directly under `.github/workflows/`, so the
/// scan does not recurse further. The result is sorted for deterministic
/// report ordering. A repository without the directory simply has no
/// workflows.
pub fn discover_workflows(repo_dir: &Path) -> Result<Vec<PathBuf>> {
    if !repo_dir.is_dir() {
        anyhow::bail!("'{}' is not a directory", repo_dir.display());
    }

    let workflows_dir = repo_dir.join(".github").join("workflows");
    if !workflows_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files: Vec<PathBuf> = Vec::new();
    for pattern in ["*.yml", "*.yaml"] {
        let full = format!("{}/{}", workflows_dir.display(), pattern);
        files.extend(
            glob::glob(&full)
                .context("Failed to read glob pattern")?
                .filter_map(|r| r.ok()),
        );
    }
    files.sort();
    Ok(files)
}
