//! Version-control capability used by overlay acquisition and passthrough
//! commands, implemented by shelling out to `git`.
use std::path::Path;
use std::sync::Arc;

use crate::error::GitError;
use crate::exec::{ExecResult, Executor, SystemExecutor};

/// Operations repoverlay needs from a version-control system.
///
/// Streaming operations (`status`, `diff`, `commit`, `merge`) inherit the
/// terminal and return git's exit code.
#[cfg_attr(test, mockall::automock)]
pub trait VersionControl {
    /// Clone `url` into `dest`.
    ///
    /// # Errors
    ///
    /// Returns [`GitError`] when git fails or cannot be started; the same
    /// applies to every method below that returns a `Result`.
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), GitError>;
    /// Check out a branch, tag, or commit.
    fn checkout(&self, repo: &Path, reference: &str) -> Result<(), GitError>;
    /// Fetch from the default remote.
    fn fetch(&self, repo: &Path) -> Result<(), GitError>;
    /// Pull from the default remote.
    fn pull(&self, repo: &Path) -> Result<(), GitError>;
    /// Merge `branch` of the repository at `source` into `repo`'s checkout.
    fn pull_from(&self, repo: &Path, source: &Path, branch: &str) -> Result<(), GitError>;
    /// Push to the default remote.
    fn push(&self, repo: &Path) -> Result<(), GitError>;
    /// Stage files (everything when `files` is empty).
    fn add(&self, repo: &Path, files: &[String]) -> Result<(), GitError>;
    /// Commit with extra arguments.
    fn commit(&self, repo: &Path, args: &[String]) -> Result<i32, GitError>;
    /// Merge with extra arguments.
    fn merge(&self, repo: &Path, args: &[String]) -> Result<i32, GitError>;
    /// Show working-tree status.
    fn status(&self, repo: &Path) -> Result<i32, GitError>;
    /// Show a diff with extra arguments.
    fn diff(&self, repo: &Path, args: &[String]) -> Result<i32, GitError>;
    /// Checked-out branch name, `None` when HEAD is detached.
    fn current_branch(&self, repo: &Path) -> Result<Option<String>, GitError>;
    /// `true` for a bare repository.
    fn is_bare(&self, path: &Path) -> Result<bool, GitError>;
    /// URL of `origin`, if configured.
    fn remote_url(&self, repo: &Path) -> Result<Option<String>, GitError>;
    /// Commits on HEAD not on its upstream; `0` when there is no upstream.
    fn unpushed_commit_count(&self, repo: &Path) -> Result<usize, GitError>;
    /// Paths with uncommitted changes.
    fn uncommitted_changes(&self, repo: &Path) -> Result<Vec<String>, GitError>;
}

/// [`VersionControl`] backed by the `git` binary.
#[derive(Debug, Clone)]
pub struct GitCli {
    executor: Arc<dyn Executor>,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

impl GitCli {
    /// Use the real process executor.
    #[must_use]
    pub fn new() -> Self {
        Self::with_executor(Arc::new(SystemExecutor))
    }

    /// Use a caller-supplied executor.
    #[must_use]
    pub fn with_executor(executor: Arc<dyn Executor>) -> Self {
        Self { executor }
    }

    /// `true` when `git` is on PATH.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.executor.which("git")
    }

    fn capture(&self, dir: &Path, args: &[&str]) -> Result<ExecResult, GitError> {
        self.executor
            .run_in_unchecked(dir, "git", args)
            .map_err(|e| GitError::Spawn {
                command: args.first().copied().unwrap_or_default().to_string(),
                message: format!("{e:#}"),
            })
    }

    fn checked(&self, dir: &Path, args: &[&str]) -> Result<ExecResult, GitError> {
        let result = self.capture(dir, args)?;
        if result.success {
            Ok(result)
        } else {
            Err(GitError::Failed {
                command: args.join(" "),
                stderr: result.stderr.trim().to_string(),
            })
        }
    }

    fn streaming(&self, dir: &Path, args: &[&str]) -> Result<i32, GitError> {
        self.executor
            .run_in_streaming(dir, "git", args)
            .map_err(|e| GitError::Spawn {
                command: args.first().copied().unwrap_or_default().to_string(),
                message: format!("{e:#}"),
            })
    }
}

fn with_extra<'a>(base: &[&'a str], extra: &'a [String]) -> Vec<&'a str> {
    base.iter()
        .copied()
        .chain(extra.iter().map(String::as_str))
        .collect()
}

impl VersionControl for GitCli {
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), GitError> {
        let parent = dest.parent().unwrap_or_else(|| Path::new("."));
        let dest = dest.to_string_lossy();
        self.checked(parent, &["clone", url, &dest]).map(drop)
    }

    fn checkout(&self, repo: &Path, reference: &str) -> Result<(), GitError> {
        self.checked(repo, &["checkout", reference]).map(drop)
    }

    fn fetch(&self, repo: &Path) -> Result<(), GitError> {
        self.checked(repo, &["fetch"]).map(drop)
    }

    fn pull(&self, repo: &Path) -> Result<(), GitError> {
        self.checked(repo, &["pull"]).map(drop)
    }

    fn pull_from(&self, repo: &Path, source: &Path, branch: &str) -> Result<(), GitError> {
        let source = source.to_string_lossy();
        self.checked(repo, &["pull", "--no-rebase", "--no-edit", &source, branch])
            .map(drop)
    }

    fn push(&self, repo: &Path) -> Result<(), GitError> {
        self.checked(repo, &["push"]).map(drop)
    }

    fn add(&self, repo: &Path, files: &[String]) -> Result<(), GitError> {
        let args = if files.is_empty() {
            vec!["add", "-A"]
        } else {
            with_extra(&["add", "--"], files)
        };
        self.checked(repo, &args).map(drop)
    }

    fn commit(&self, repo: &Path, args: &[String]) -> Result<i32, GitError> {
        self.streaming(repo, &with_extra(&["commit"], args))
    }

    fn merge(&self, repo: &Path, args: &[String]) -> Result<i32, GitError> {
        self.streaming(repo, &with_extra(&["merge"], args))
    }

    fn status(&self, repo: &Path) -> Result<i32, GitError> {
        self.streaming(repo, &["status"])
    }

    fn diff(&self, repo: &Path, args: &[String]) -> Result<i32, GitError> {
        self.streaming(repo, &with_extra(&["diff"], args))
    }

    fn current_branch(&self, repo: &Path) -> Result<Option<String>, GitError> {
        let result = self.capture(repo, &["symbolic-ref", "--quiet", "--short", "HEAD"])?;
        let branch = result.stdout.trim();
        Ok((result.success && !branch.is_empty()).then(|| branch.to_string()))
    }

    fn is_bare(&self, path: &Path) -> Result<bool, GitError> {
        let result = self.checked(path, &["rev-parse", "--is-bare-repository"])?;
        Ok(result.stdout.trim() == "true")
    }

    fn remote_url(&self, repo: &Path) -> Result<Option<String>, GitError> {
        let result = self.capture(repo, &["remote", "get-url", "origin"])?;
        let url = result.stdout.trim();
        Ok((result.success && !url.is_empty()).then(|| url.to_string()))
    }

    fn unpushed_commit_count(&self, repo: &Path) -> Result<usize, GitError> {
        let result = self.capture(repo, &["rev-list", "--count", "@{u}..HEAD"])?;
        if !result.success {
            return Ok(0);
        }
        Ok(result.stdout.trim().parse().unwrap_or(0))
    }

    fn uncommitted_changes(&self, repo: &Path) -> Result<Vec<String>, GitError> {
        let result = self.checked(repo, &["status", "--porcelain"])?;
        Ok(result
            .stdout
            .lines()
            .filter(|l| l.len() > 3)
            .filter_map(|l| l.get(3..))
            .map(ToString::to_string)
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::exec::test_helpers::MockExecutor;

    fn cli(responses: Vec<(bool, &str)>) -> (GitCli, Arc<MockExecutor>) {
        let mock = Arc::new(MockExecutor::with_responses(
            responses
                .into_iter()
                .map(|(ok, out)| (ok, out.to_string()))
                .collect(),
        ));
        (GitCli::with_executor(mock.clone()), mock)
    }

    #[test]
    fn clone_runs_from_parent_directory() {
        let (git, mock) = cli(vec![]);
        git.clone_repo("git@github.com:me/o.git", Path::new("/w/.repoverlay/repo"))
            .unwrap();
        let calls = mock.calls();
        assert_eq!(calls[0].dir, Path::new("/w/.repoverlay"));
        assert_eq!(
            calls[0].command,
            "git clone git@github.com:me/o.git /w/.repoverlay/repo"
        );
    }

    #[test]
    fn failure_carries_command_and_stderr() {
        let (git, _mock) = cli(vec![(false, "")]);
        let err = git.push(Path::new("/r")).unwrap_err();
        assert!(matches!(err, GitError::Failed { ref command, .. } if command == "push"));
    }

    #[test]
    fn pull_from_names_source_and_branch() {
        let (git, mock) = cli(vec![]);
        git.pull_from(Path::new("/remote"), Path::new("/w/.repoverlay/repo"), "main")
            .unwrap();
        assert_eq!(
            mock.commands(),
            vec!["git pull --no-rebase --no-edit /w/.repoverlay/repo main".to_string()]
        );
    }

    #[test]
    fn detached_head_has_no_branch() {
        let (git, _mock) = cli(vec![(false, ""), (true, "feature\n")]);
        assert_eq!(git.current_branch(Path::new("/r")).unwrap(), None);
        assert_eq!(
            git.current_branch(Path::new("/r")).unwrap(),
            Some("feature".to_string())
        );
    }

    #[test]
    fn unpushed_count_without_upstream_is_zero() {
        let (git, _mock) = cli(vec![(false, ""), (true, "4\n")]);
        assert_eq!(git.unpushed_commit_count(Path::new("/r")).unwrap(), 0);
        assert_eq!(git.unpushed_commit_count(Path::new("/r")).unwrap(), 4);
    }

    #[test]
    fn porcelain_lines_become_paths() {
        let (git, _mock) = cli(vec![(true, " M envrc\n?? new.txt\n")]);
        assert_eq!(
            git.uncommitted_changes(Path::new("/r")).unwrap(),
            vec!["envrc".to_string(), "new.txt".to_string()]
        );
    }

    #[test]
    fn add_without_files_stages_everything() {
        let (git, mock) = cli(vec![(true, ""), (true, "")]);
        git.add(Path::new("/r"), &[]).unwrap();
        git.add(Path::new("/r"), &["a b".to_string()]).unwrap();
        assert_eq!(
            mock.commands(),
            vec!["git add -A".to_string(), "git add -- a b".to_string()]
        );
    }

    #[test]
    fn streaming_commands_return_exit_code() {
        let (git, mock) = cli(vec![(false, "")]);
        assert_eq!(git.diff(Path::new("/r"), &["--stat".to_string()]).unwrap(), 1);
        assert_eq!(mock.commands(), vec!["git diff --stat".to_string()]);
    }
}
