//! Git backend.
//!
//! Shells out to the `git` binary inside the catapult root.

use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use tracing::trace;

use super::Vcs;
use crate::error::{Result, VcsError};

/// `git` executed in a fixed working directory.
pub struct Git {
    binary: PathBuf,
    root: PathBuf,
}

impl Git {
    /// Locate `git` on `PATH`.
    ///
    /// # Errors
    ///
    /// Returns `VcsError::NotFound` when the binary is missing.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let binary = which::which("git").map_err(|_| VcsError::NotFound)?;
        Ok(Self {
            binary,
            root: root.into(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn output(&self, args: &[&str]) -> Result<Output> {
        trace!(args = ?args, "git");
        Command::new(&self.binary)
            .args(args)
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                VcsError::CommandFailed {
                    command: args.join(" "),
                    stderr: e.to_string(),
                }
                .into()
            })
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let output = self.output(args)?;
        if !output.status.success() {
            return Err(VcsError::CommandFailed {
                command: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl Vcs for Git {
    fn current_branch(&self) -> Result<String> {
        self.run(&["rev-parse", "--abbrev-ref", "HEAD"])
    }

    fn checkout_path(&self, reference: &str, path: &str) -> Result<()> {
        self.run(&["checkout", "--force", reference, "--", path])
            .map(|_| ())
    }

    fn unstage(&self, path: &str) -> Result<()> {
        self.run(&["reset", "--quiet", "--", path]).map(|_| ())
    }

    fn has_diff(&self, a: &str, b: &str) -> Result<bool> {
        let args = ["diff", "--quiet", a, b];
        let output = self.output(&args)?;
        match output.status.code() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(VcsError::CommandFailed {
                command: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into()),
        }
    }

    fn fetch(&self, remote: &str) -> Result<()> {
        self.run(&["fetch", "--quiet", remote]).map(|_| ())
    }

    fn pull(&self, remote: &str, branch: &str) -> Result<()> {
        self.run(&["pull", "--quiet", remote, branch]).map(|_| ())
    }

    fn push(&self, remote: &str, branch: &str) -> Result<()> {
        self.run(&["push", "--quiet", remote, branch]).map(|_| ())
    }

    fn staged_files(&self) -> Result<Vec<String>> {
        let listing = self.run(&["diff", "--cached", "--name-only"])?;
        Ok(listing
            .lines()
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }
}
