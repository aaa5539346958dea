//! Best-effort git side effects. Version control is a convenience around
//! the research workflow: failures here are warnings, never fatal.

use std::path::Path;
use std::process::Command;
use tracing::warn;

pub fn installed() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

pub fn is_repo(project_dir: &Path) -> bool {
    project_dir.join(".git").exists()
}

pub fn init(project_dir: &Path) -> anyhow::Result<()> {
    let output = Command::new("git")
        .arg("init")
        .current_dir(project_dir)
        .output()?;

    if !output.status.success() {
        anyhow::bail!(
            "git init failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(())
}

/// Stage the given paths and commit them. Any failure is logged and
/// swallowed.
pub fn commit(project_dir: &Path, paths: &[&Path], message: &str) {
    for path in paths {
        let added = Command::new("git")
            .arg("add")
            .arg(path)
            .current_dir(project_dir)
            .output();

        match added {
            Ok(output) if output.status.success() => {}
            Ok(output) => {
                warn!(
                    "failed to stage {}: {}",
                    path.display(),
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                return;
            }
            Err(err) => {
                warn!("failed to run git add: {err}");
                return;
            }
        }
    }

    let committed = Command::new("git")
        .args(["commit", "-m", message])
        .current_dir(project_dir)
        .output();

    match committed {
        Ok(output) if output.status.success() => {}
        Ok(output) => warn!(
            "failed to commit to git: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        ),
        Err(err) => warn!("failed to run git commit: {err}"),
    }
}
