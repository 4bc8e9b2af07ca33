//! Git integration for the sync workflow.
//!
//! The generated file lives inside a git work tree; a sync run stages
//! exactly the target file and commits only when the staged diff is
//! non-empty.

use std::path::Path;
use std::process::Command;

use crate::domain::error::{RegsyncError, Result};

/// Capture the HEAD commit SHA from a git repository.
///
/// Runs `git rev-parse HEAD` in the given directory. Returns an error if the
/// directory is not inside a git repository or if git is not available.
pub fn capture_head_sha(repo_dir: &Path) -> Result<String> {
    let output = run_git(repo_dir, &["rev-parse", "HEAD"])?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(RegsyncError::GitError(format!(
            "git rev-parse HEAD failed: {stderr}"
        )));
    }

    let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if sha.is_empty() {
        return Err(RegsyncError::GitError(
            "git rev-parse HEAD returned empty output".to_string(),
        ));
    }

    Ok(sha)
}

/// Check whether a directory is inside a git work tree.
pub fn is_git_repo(dir: &Path) -> bool {
    Command::new("git")
        .args(["rev-parse", "--is-inside-work-tree"])
        .current_dir(dir)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Stage the given paths and commit them with `message`.
///
/// Returns `Ok(None)` without creating a commit when the staged diff is
/// empty: re-running a sync against unchanged upstream data must not grow
/// the history. On commit, returns the new HEAD SHA.
pub fn commit_paths(repo_dir: &Path, paths: &[&Path], message: &str) -> Result<Option<String>> {
    let mut add_args: Vec<&str> = vec!["add", "--"];
    let path_strs: Vec<&str> = paths
        .iter()
        .map(|p| p.to_str().ok_or_else(|| {
            RegsyncError::GitError(format!("non-UTF-8 path: {}", p.display()))
        }))
        .collect::<Result<_>>()?;
    add_args.extend(&path_strs);

    let output = run_git(repo_dir, &add_args)?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(RegsyncError::GitError(format!("git add failed: {stderr}")));
    }

    // Exit code 0: nothing staged for these paths; 1: differences exist.
    let mut diff_args: Vec<&str> = vec!["diff", "--cached", "--quiet", "--"];
    diff_args.extend(&path_strs);
    let diff = run_git(repo_dir, &diff_args)?;
    match diff.status.code() {
        Some(0) => return Ok(None),
        Some(1) => {}
        _ => {
            let stderr = String::from_utf8_lossy(&diff.stderr);
            return Err(RegsyncError::GitError(format!(
                "git diff --cached failed: {stderr}"
            )));
        }
    }

    // Limit the commit to the listed paths; anything else already sitting
    // in the index stays out of this commit.
    let mut commit_args: Vec<&str> = vec!["commit", "-m", message, "--"];
    commit_args.extend(&path_strs);
    let output = run_git(repo_dir, &commit_args)?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(RegsyncError::GitError(format!(
            "git commit failed: {stderr}"
        )));
    }

    capture_head_sha(repo_dir).map(Some)
}

/// Paths touched by the HEAD commit, relative to the repository root.
pub fn head_commit_paths(repo_dir: &Path) -> Result<Vec<String>> {
    let output = run_git(repo_dir, &["show", "--pretty=format:", "--name-only", "HEAD"])?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(RegsyncError::GitError(format!(
            "git show failed: {stderr}"
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

fn run_git(repo_dir: &Path, args: &[&str]) -> Result<std::process::Output> {
    Command::new("git")
        .args(args)
        .current_dir(repo_dir)
        .output()
        .map_err(|e| RegsyncError::GitError(format!("failed to run git: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::process::Command as StdCommand;

    fn run(repo_dir: &Path, args: &[&str]) {
        let output = StdCommand::new("git")
            .args(args)
            .current_dir(repo_dir)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }

    fn make_git_repo() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        run(dir.path(), &["init"]);
        run(dir.path(), &["config", "user.name", "test-user"]);
        run(dir.path(), &["config", "user.email", "test@example.com"]);
        run(dir.path(), &["commit", "--allow-empty", "-m", "initial"]);
        dir
    }

    #[test]
    fn capture_head_sha_returns_40_hex_chars() {
        let repo = make_git_repo();
        let sha = capture_head_sha(repo.path()).unwrap();
        assert_eq!(sha.len(), 40, "SHA should be 40 hex chars, got: {sha}");
        assert!(sha.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn capture_head_sha_fails_outside_repo() {
        let dir = tempfile::tempdir().unwrap();
        assert!(capture_head_sha(dir.path()).is_err());
    }

    #[test]
    fn is_git_repo_true_for_repo() {
        let repo = make_git_repo();
        assert!(is_git_repo(repo.path()));
    }

    #[test]
    fn is_git_repo_false_for_non_repo() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_git_repo(dir.path()));
    }

    #[test]
    fn commit_paths_commits_new_file() {
        let repo = make_git_repo();
        std::fs::write(repo.path().join("registers.rs"), "// generated\n").unwrap();

        let sha = commit_paths(
            repo.path(),
            &[Path::new("registers.rs")],
            "Update register tables",
        )
        .unwrap();

        let sha = sha.expect("changed file should produce a commit");
        assert_eq!(sha.len(), 40);
        assert_eq!(sha, capture_head_sha(repo.path()).unwrap());
    }

    #[test]
    fn commit_paths_noop_when_unchanged() {
        let repo = make_git_repo();
        std::fs::write(repo.path().join("registers.rs"), "// generated\n").unwrap();

        let first = commit_paths(repo.path(), &[Path::new("registers.rs")], "Update")
            .unwrap()
            .expect("first run commits");

        // Second run with identical content: no commit, HEAD unchanged.
        let second = commit_paths(repo.path(), &[Path::new("registers.rs")], "Update").unwrap();
        assert!(second.is_none());
        assert_eq!(capture_head_sha(repo.path()).unwrap(), first);
    }

    #[test]
    fn commit_paths_stages_only_given_paths() {
        let repo = make_git_repo();
        std::fs::write(repo.path().join("registers.rs"), "// generated\n").unwrap();
        std::fs::write(repo.path().join("unrelated.txt"), "left alone\n").unwrap();

        commit_paths(repo.path(), &[Path::new("registers.rs")], "Update")
            .unwrap()
            .expect("commit created");

        let paths = head_commit_paths(repo.path()).unwrap();
        assert_eq!(paths, vec!["registers.rs".to_string()]);
    }
}
