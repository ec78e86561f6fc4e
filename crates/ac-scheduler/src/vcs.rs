//! The version-control capability used by the executor.
//!
//! [`Vcs`] abstracts the four operations a flush needs. [`GitCli`] implements
//! it by running the `git` executable in the repository directory and
//! capturing combined stdout and stderr, so failures keep git's own
//! explanation.

use std::future::Future;
use std::io;
use std::process::Stdio;

use camino::{Utf8Path, Utf8PathBuf};
use tokio::process::Command;
use tracing::debug;

/// Result of one VCS invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VcsOutput {
    /// Whether the operation reported success.
    pub success: bool,

    /// Captured combined output.
    pub output: String,
}

impl VcsOutput {
    /// A successful invocation with the given output.
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    /// A failed invocation with the given output.
    pub fn failed(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
        }
    }
}

/// Version-control operations needed to commit a batch.
///
/// Each method returns `Err` only when the operation could not be run at all;
/// an operation that ran and failed returns `Ok` with `success == false`.
pub trait Vcs: Send + Sync {
    /// Stages the given paths in a single invocation.
    fn stage(&self, paths: &[Utf8PathBuf]) -> impl Future<Output = io::Result<VcsOutput>> + Send;

    /// Lists staged differences. Empty output means nothing is staged.
    fn status(&self) -> impl Future<Output = io::Result<VcsOutput>> + Send;

    /// Commits the staged changes.
    fn commit(&self, message: &str) -> impl Future<Output = io::Result<VcsOutput>> + Send;

    /// Pushes to the configured remote.
    fn push(&self) -> impl Future<Output = io::Result<VcsOutput>> + Send;
}

/// [`Vcs`] backed by the `git` command line.
#[derive(Debug, Clone)]
pub struct GitCli {
    repo: Utf8PathBuf,
    remote: Option<String>,
}

impl GitCli {
    /// Creates a backend operating on the working tree at `repo`.
    #[must_use]
    pub fn new(repo: impl Into<Utf8PathBuf>) -> Self {
        Self {
            repo: repo.into(),
            remote: None,
        }
    }

    /// Pushes to `remote` instead of the branch's default.
    #[must_use]
    pub fn with_remote(mut self, remote: Option<String>) -> Self {
        self.remote = remote;
        self
    }

    /// Returns the repository path.
    #[must_use]
    pub fn repo(&self) -> &Utf8Path {
        &self.repo
    }

    async fn run<I, S>(&self, args: I) -> io::Result<VcsOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let mut command = Command::new("git");
        command
            .args(args)
            .current_dir(&self.repo)
            .stdin(Stdio::null())
            .env("GIT_TERMINAL_PROMPT", "0");
        debug!(command = ?command.as_std(), "Running git");

        let output = command.output().await?;
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(VcsOutput {
            success: output.status.success(),
            output: combined,
        })
    }

    /// Drops paths that no longer exist and were never tracked. A single
    /// such path makes `git add` reject the whole batch.
    async fn stageable(&self, paths: &[Utf8PathBuf]) -> io::Result<Vec<Utf8PathBuf>> {
        let mut kept = Vec::with_capacity(paths.len());
        for path in paths {
            let on_disk = tokio::fs::try_exists(self.repo.join(path)).await.unwrap_or(true);
            if on_disk || self.is_tracked(path).await? {
                kept.push(path.clone());
            } else {
                debug!(path = %path, "Skipping vanished untracked path");
            }
        }
        Ok(kept)
    }

    async fn is_tracked(&self, path: &Utf8Path) -> io::Result<bool> {
        let output = self
            .run(["ls-files", "--error-unmatch", "--", path.as_str()])
            .await?;
        Ok(output.success)
    }
}

impl Vcs for GitCli {
    async fn stage(&self, paths: &[Utf8PathBuf]) -> io::Result<VcsOutput> {
        let paths = self.stageable(paths).await?;
        if paths.is_empty() {
            return Ok(VcsOutput::ok(""));
        }

        // -A also stages deletions of tracked paths that were renamed away
        let args = ["add", "-A", "--"]
            .into_iter()
            .chain(paths.iter().map(|p| p.as_str()));
        self.run(args).await
    }

    async fn status(&self) -> io::Result<VcsOutput> {
        self.run(["diff", "--cached", "--name-only"]).await
    }

    async fn commit(&self, message: &str) -> io::Result<VcsOutput> {
        self.run(["commit", "-m", message]).await
    }

    async fn push(&self) -> io::Result<VcsOutput> {
        match &self.remote {
            Some(remote) => self.run(["push", remote.as_str()]).await,
            None => self.run(["push"]).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vcs_output_constructors() {
        assert!(VcsOutput::ok("").success);
        let failed = VcsOutput::failed("boom");
        assert!(!failed.success);
        assert_eq!(failed.output, "boom");
    }

    #[test]
    fn test_git_cli_configuration() {
        let git = GitCli::new("/srv/site").with_remote(Some("origin".to_owned()));
        assert_eq!(git.repo().as_str(), "/srv/site");
        assert_eq!(git.remote.as_deref(), Some("origin"));
    }

    #[tokio::test]
    async fn test_git_cli_missing_repository_is_spawn_error() {
        let git = GitCli::new("/nonexistent/repository/path");
        // current_dir does not exist, so the process cannot even be spawned
        assert!(git.status().await.is_err());
    }

    /// A scratch repository, or `None` when git is not installed.
    async fn scratch_repo(dir: &tempfile::TempDir) -> Option<GitCli> {
        let root = Utf8PathBuf::from_path_buf(dir.path().canonicalize().ok()?).ok()?;
        let git = GitCli::new(root);
        git.run(["init", "--quiet"]).await.ok().filter(|o| o.success)?;
        Some(git)
    }

    #[tokio::test]
    async fn test_stage_skips_vanished_untracked_paths() {
        let dir = tempfile::tempdir().unwrap();
        let Some(git) = scratch_repo(&dir).await else {
            return;
        };
        let kept = git.repo().join("d.asp");
        std::fs::write(&kept, "<% %>").unwrap();
        let vanished = git.repo().join("c.asp");

        let staged = git.stage(&[vanished, kept]).await.unwrap();
        assert!(staged.success, "{}", staged.output);

        let status = git.status().await.unwrap();
        assert_eq!(status.output.trim(), "d.asp");
    }

    #[tokio::test]
    async fn test_stage_keeps_deleted_tracked_paths() {
        let dir = tempfile::tempdir().unwrap();
        let Some(git) = scratch_repo(&dir).await else {
            return;
        };
        let removed = git.repo().join("e.asp");
        std::fs::write(&removed, "<% %>").unwrap();
        assert!(git.run(["add", "e.asp"]).await.unwrap().success);
        std::fs::remove_file(&removed).unwrap();

        let kept = git.stageable(std::slice::from_ref(&removed)).await.unwrap();
        assert_eq!(kept, [removed.clone()]);

        let staged = git.stage(&[removed]).await.unwrap();
        assert!(staged.success, "{}", staged.output);
    }

    #[tokio::test]
    async fn test_stage_of_only_vanished_paths_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let Some(git) = scratch_repo(&dir).await else {
            return;
        };

        let staged = git.stage(&[git.repo().join("gone.asp")]).await.unwrap();

        assert!(staged.success);
        assert!(git.status().await.unwrap().output.trim().is_empty());
    }
}
