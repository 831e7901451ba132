//! Pre-commit hook commands.

use std::path::Path;

use crate::cli::output;
use crate::core::layout::Layout;
use crate::core::vcs::{hook, Git, Vcs};
use crate::error::Result;

/// Enforce the branch policy on the staged files.
pub fn pre_commit(root: &Path) -> Result<()> {
    let git = Git::new(root)?;
    let branch = git.current_branch()?;
    let staged = git.staged_files()?;

    hook::check(&branch, &staged)?;
    Ok(())
}

/// Install the pre-commit hook.
pub fn install(root: &Path) -> Result<()> {
    let layout = Layout::new(root);
    let path = hook::install(&layout)?;
    output::success(&format!("installed {}", output::path(&path.display().to_string())));
    Ok(())
}
