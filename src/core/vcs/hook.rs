//! Pre-commit policy.
//!
//! Keeps configuration ciphertexts and core changes on separate branches,
//! and makes release and master reachable only through pull requests.

use std::path::PathBuf;

use tracing::debug;

use crate::core::constants;
use crate::core::layout::Layout;
use crate::error::{HookError, Result};

const HOOK_SCRIPT: &str = "#!/bin/sh\n# installed by catapult\nexec catapult hook pre-commit\n";

/// Whether a staged path is a secret ciphertext.
pub fn is_secret(path: &str) -> bool {
    path.strip_prefix(constants::SECRETS_DIR)
        .and_then(|rest| rest.strip_prefix('/'))
        .is_some_and(|name| {
            !name.contains('/') && name.ends_with(constants::CIPHERTEXT_SUFFIX)
        })
}

/// Check the staged files of a commit on `branch`.
///
/// Branches outside the workflow are not policed.
pub fn check(branch: &str, staged: &[String]) -> std::result::Result<(), HookError> {
    debug!(branch, staged = staged.len(), "checking pre-commit policy");

    match branch {
        "develop-catapult" => {
            if let Some(secret) = staged.iter().find(|p| is_secret(p)) {
                return Err(HookError::SecretOnContribution(secret.clone()));
            }
            if !staged.iter().any(|p| p == constants::VERSION_MARKER) {
                return Err(HookError::VersionNotBumped(constants::VERSION_MARKER));
            }
            Ok(())
        }
        "develop" => {
            if staged.iter().any(|p| is_secret(p)) {
                Ok(())
            } else {
                Err(HookError::NoSecretOnDevelop)
            }
        }
        "release" | "master" => match staged.iter().find(|p| !is_secret(p)) {
            Some(file) => Err(HookError::DirectCommit {
                branch: branch.to_string(),
                file: file.clone(),
            }),
            None => Ok(()),
        },
        _ => Ok(()),
    }
}

/// Install the pre-commit hook into `.git/hooks`.
pub fn install(layout: &Layout) -> Result<PathBuf> {
    let dir = layout.git_hooks_dir();
    std::fs::create_dir_all(&dir)?;
    let path = dir.join("pre-commit");
    std::fs::write(&path, HOOK_SCRIPT)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
    }

    debug!(path = %path.display(), "installed pre-commit hook");
    Ok(path)
}

/// Whether the installed hook is ours and current.
pub fn is_installed(layout: &Layout) -> bool {
    std::fs::read_to_string(layout.git_hooks_dir().join("pre-commit"))
        .map(|body| body == HOOK_SCRIPT)
        .unwrap_or(false)
}
