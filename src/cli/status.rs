//! Quick status overview command. Never decrypts.

use std::path::Path;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::cli::output;
use crate::core::lock;
use crate::core::layout::{BlobPaths, Layout};
use crate::core::vcs::{hook, BranchState, Git, Vcs};
use crate::error::Result;

#[derive(Debug, Serialize)]
struct BlobStatus {
    file: String,
    /// First 16 hex characters of the ciphertext's SHA-256.
    fingerprint: Option<String>,
    plaintext: bool,
    /// Plaintext permission bits, where the platform has them.
    mode: Option<u32>,
}

#[derive(Debug, Serialize)]
struct Status {
    branch: Option<String>,
    supported: bool,
    blobs: Vec<BlobStatus>,
    locks: Vec<String>,
    hook_installed: bool,
    changes_pending: bool,
}

fn fingerprint(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let digest = Sha256::digest(std::fs::read(path)?);
    Ok(Some(digest.iter().take(8).map(|b| format!("{:02x}", b)).collect()))
}

fn mode(path: &Path) -> Result<Option<u32>> {
    if !path.exists() {
        return Ok(None);
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let metadata = std::fs::metadata(path)?;
        Ok(Some(metadata.permissions().mode() & 0o777))
    }
    #[cfg(not(unix))]
    {
        Ok(None)
    }
}

fn blob_status(blob: &BlobPaths) -> Result<BlobStatus> {
    Ok(BlobStatus {
        file: blob.ciphertext_relative(),
        fingerprint: fingerprint(&blob.ciphertext)?,
        plaintext: blob.plaintext.exists(),
        mode: mode(&blob.plaintext)?,
    })
}

fn locks(root: &Path) -> Result<Vec<String>> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let name = entry?.file_name().to_string_lossy().to_string();
        if lock::is_marker(&name) {
            found.push(name);
        }
    }
    found.sort();
    Ok(found)
}

fn collect(root: &Path) -> Result<Status> {
    let layout = Layout::new(root);
    let branch = Git::new(root).and_then(|git| git.current_branch()).ok();
    let supported = branch
        .as_deref()
        .is_some_and(|b| BranchState::classify(b).is_ok());

    let mut blobs = vec![blob_status(&layout.configuration())?];
    for blob in layout.keypair() {
        blobs.push(blob_status(&blob)?);
    }

    Ok(Status {
        branch,
        supported,
        blobs,
        locks: locks(root)?,
        hook_installed: hook::is_installed(&layout),
        changes_pending: layout.changes_marker().exists(),
    })
}

/// Show branch, blob and lock state.
pub fn execute(root: &Path, json: bool) -> Result<()> {
    let status = collect(root)?;

    if json {
        let body = serde_json::to_string_pretty(&status)
            .map_err(std::io::Error::other)?;
        println!("{}", body);
        return Ok(());
    }

    output::section("Catapult Status");
    match &status.branch {
        Some(branch) if status.supported => output::kv("branch", branch),
        Some(branch) => output::kv("branch", format!("{} (unsupported)", branch)),
        None => output::kv("branch", "unknown"),
    }
    output::kv("hook", if status.hook_installed { "installed" } else { "missing" });
    output::kv("changes", if status.changes_pending { "pending" } else { "none" });

    output::section("Secrets");
    for blob in &status.blobs {
        let cipher = blob.fingerprint.as_deref().unwrap_or("missing");
        let plain = match (blob.plaintext, blob.mode) {
            (false, _) => "locked".to_string(),
            (true, Some(0o600)) | (true, None) => "unlocked".to_string(),
            (true, Some(mode)) => format!("unlocked (insecure permissions: {:o})", mode),
        };
        output::kv(&blob.file, format!("{}  {}", cipher, plain));
    }

    if !status.locks.is_empty() {
        println!();
        for lock in &status.locks {
            output::warn(&format!("lock held: {}", lock));
        }
    }

    if !status.hook_installed {
        output::hint("install the pre-commit hook with: catapult hook install");
    }
    Ok(())
}
