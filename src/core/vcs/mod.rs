//! Version control branch gate.
//!
//! Git branches are the only channel teams synchronize through. The engine
//! asks a `Vcs` capability which branch it is on and classifies it into a
//! `BranchState` that gates every secret mutation.

use tracing::{debug, info};

use crate::core::layout::Layout;
use crate::error::{Result, VcsError};

mod git;
pub mod hook;

pub use git::Git;

/// Remote every propagation goes through.
pub const ORIGIN: &str = "origin";

/// Workflow state derived from the current branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchState {
    /// Configuration branch; the only one where secrets are re-encrypted.
    Develop,
    /// Core contribution branch; secrets are borrowed from develop.
    DevelopCatapult,
    Release,
    Master,
}

impl BranchState {
    /// Classify a branch name.
    ///
    /// # Errors
    ///
    /// Returns `VcsError::UnsupportedBranch` for any other branch.
    pub fn classify(branch: &str) -> Result<Self> {
        match branch {
            "develop" => Ok(Self::Develop),
            "develop-catapult" => Ok(Self::DevelopCatapult),
            "release" => Ok(Self::Release),
            "master" => Ok(Self::Master),
            other => Err(VcsError::UnsupportedBranch(other.to_string()).into()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Develop => "develop",
            Self::DevelopCatapult => "develop-catapult",
            Self::Release => "release",
            Self::Master => "master",
        }
    }

    /// Whether this state pulls and pushes on every run.
    pub fn propagates(&self) -> bool {
        matches!(self, Self::Develop | Self::DevelopCatapult)
    }
}

impl std::fmt::Display for BranchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Version control capability, consumed rather than reimplemented.
pub trait Vcs {
    /// Name of the checked out branch.
    fn current_branch(&self) -> Result<String>;

    /// Overwrite `path` in the working tree with its content at `reference`.
    fn checkout_path(&self, reference: &str, path: &str) -> Result<()>;

    /// Remove `path` from the index, keeping the working tree copy.
    fn unstage(&self, path: &str) -> Result<()>;

    /// Whether two refs differ.
    fn has_diff(&self, a: &str, b: &str) -> Result<bool>;

    fn fetch(&self, remote: &str) -> Result<()>;

    fn pull(&self, remote: &str, branch: &str) -> Result<()>;

    fn push(&self, remote: &str, branch: &str) -> Result<()>;

    /// Paths staged for the next commit.
    fn staged_files(&self) -> Result<Vec<String>>;
}

/// Bring the branch up to date with its remote.
///
/// Touches the changes marker when the remote had commits this checkout did
/// not, so the deployment pipeline knows to rebuild.
pub fn update(vcs: &dyn Vcs, state: BranchState, layout: &Layout) -> Result<()> {
    if !state.propagates() {
        debug!(branch = %state, "no propagation for branch");
        return Ok(());
    }

    let branch = state.as_str();
    vcs.fetch(ORIGIN)?;
    if vcs.has_diff("HEAD", &format!("{}/{}", ORIGIN, branch))? {
        info!(branch, "remote has changes");
        layout.touch_changes()?;
    }
    vcs.pull(ORIGIN, branch)
}

/// Publish local commits. Only called once a run has validated and
/// persisted.
pub fn publish(vcs: &dyn Vcs, state: BranchState) -> Result<()> {
    if !state.propagates() {
        return Ok(());
    }
    debug!(branch = %state, "publishing");
    vcs.push(ORIGIN, state.as_str())
}
