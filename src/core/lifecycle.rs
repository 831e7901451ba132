//! Secret lifecycle: bootstrap, unlock, compare, guard and persist.
//!
//! Ciphertext is only ever written from here. Writes go through a temp file
//! and a rename so a ciphertext is never observed half written. Hand edits
//! found while unlocking are held until [`Lifecycle::seal`], after the run
//! has validated them.

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::core::cipher::{Cipher, Passphrase};
use crate::core::domain::{Configuration, Workflow};
use crate::core::layout::{BlobPaths, Layout, SecretKind};
use crate::core::vcs::{BranchState, Vcs};
use crate::error::{ConfigError, Result, SecretError};

const CONFIGURATION_TEMPLATE: &str = include_str!("../../templates/configuration.toml");

/// Outcome of [`Lifecycle::persist`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persisted {
    Written,
    /// Not on `develop`; nothing was written.
    Skipped,
}

/// Hand-edited plaintexts awaiting re-encryption.
#[derive(Default)]
pub struct Edits {
    blobs: Vec<(SecretKind, Zeroizing<Vec<u8>>)>,
}

impl Edits {
    fn push(&mut self, kind: SecretKind, plaintext: Vec<u8>) {
        self.blobs.push((kind, Zeroizing::new(plaintext)));
    }

    pub fn kinds(&self) -> Vec<SecretKind> {
        self.blobs.iter().map(|(kind, _)| *kind).collect()
    }

    pub fn contains(&self, kind: SecretKind) -> bool {
        self.blobs.iter().any(|(k, _)| *k == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

impl fmt::Debug for Edits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.kinds()).finish()
    }
}

/// Decrypted state after unlocking.
#[derive(Debug)]
pub struct Unlocked {
    pub configuration: Configuration,
    /// Nothing is written for these until `seal`.
    pub edits: Edits,
}

/// Removes a scratch file when dropped.
struct Scratch<'a>(&'a Path);

impl Drop for Scratch<'_> {
    fn drop(&mut self) {
        if self.0.exists() {
            if let Err(e) = fs::remove_file(self.0) {
                warn!(path = %self.0.display(), error = %e, "failed to remove compare file");
            }
        }
    }
}

/// Write `contents` next to `path` and rename over it.
fn write_atomic(path: &Path, contents: &[u8], private: bool) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        if private {
            options.mode(0o600);
        }
    }
    #[cfg(not(unix))]
    let _ = private;

    let mut file = options.open(&tmp)?;
    file.write_all(contents)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp, path)?;
    Ok(())
}

fn is_empty_file(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true)
}

fn read(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|source| {
        ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        }
        .into()
    })
}

/// Remediation for a workflow switch, keyed by the new workflow.
pub fn workflow_remediation(to: Workflow) -> &'static str {
    match to {
        Workflow::Downstream => {
            "Please first run a Production then Test deployment followed by a LocalDev provision."
        }
        Workflow::Upstream => "Please first run a Test deployment followed by a LocalDev deployment.",
    }
}

/// Require today's backup for every website whose workflow changed.
///
/// # Errors
///
/// Returns `SecretError::WorkflowBackupMissing` for the first website whose
/// backup does not exist.
pub fn check_workflow_change(
    layout: &Layout,
    edited: &Configuration,
    committed: &Configuration,
    today: NaiveDate,
) -> Result<()> {
    for (service, instances) in &edited.websites {
        for instance in instances {
            let Some(previous) = committed.website(service, &instance.domain) else {
                continue;
            };
            let (Some(from), Some(to)) = (previous.workflow(), instance.workflow()) else {
                continue;
            };
            if from == to {
                continue;
            }

            let backup = layout.backup(service, &instance.domain, today);
            if !backup.exists() {
                return Err(SecretError::WorkflowBackupMissing {
                    domain: instance.domain.clone(),
                    from: from.as_str().to_string(),
                    to: to.as_str().to_string(),
                    backup,
                    remediation: workflow_remediation(to).to_string(),
                }
                .into());
            }
            info!(domain = %instance.domain, from = from.as_str(), to = to.as_str(), "workflow change backed up");
        }
    }
    Ok(())
}

/// Drives every read and write of the secret store for one run.
pub struct Lifecycle<'a> {
    layout: &'a Layout,
    cipher: &'a dyn Cipher,
    passphrase: &'a Passphrase,
    edit: bool,
    today: NaiveDate,
}

impl<'a> Lifecycle<'a> {
    pub fn new(
        layout: &'a Layout,
        cipher: &'a dyn Cipher,
        passphrase: &'a Passphrase,
        edit: bool,
        today: NaiveDate,
    ) -> Self {
        Self {
            layout,
            cipher,
            passphrase,
            edit,
            today,
        }
    }

    fn decrypt(&self, blob: &BlobPaths) -> Result<Zeroizing<Vec<u8>>> {
        let armored = read(&blob.ciphertext)?;
        let armored = String::from_utf8_lossy(&armored);
        self.cipher.decrypt(&armored, self.passphrase)
    }

    fn encrypt_to(&self, blob: &BlobPaths, plaintext: &[u8]) -> Result<()> {
        let armored = self.cipher.encrypt(plaintext, self.passphrase)?;
        write_atomic(&blob.ciphertext, armored.as_bytes(), false)?;
        debug!(blob = %blob.ciphertext.display(), "encrypted");
        Ok(())
    }

    /// Seed the configuration from the template and encrypt the keypair on
    /// first use.
    ///
    /// # Errors
    ///
    /// Returns `SecretError::MissingKeypair` when a keypair ciphertext is
    /// missing and the plaintext pair is incomplete.
    pub fn bootstrap(&self) -> Result<()> {
        let configuration = self.layout.configuration();
        if is_empty_file(&configuration.ciphertext) {
            info!("seeding configuration from template");
            self.encrypt_to(&configuration, CONFIGURATION_TEMPLATE.as_bytes())?;
        }

        let keypair = self.layout.keypair();
        if keypair.iter().any(|b| is_empty_file(&b.ciphertext)) {
            if let Some(missing) = keypair.iter().find(|b| !b.plaintext.exists()) {
                return Err(SecretError::MissingKeypair {
                    missing: missing.plaintext.clone(),
                }
                .into());
            }
            for blob in &keypair {
                let plaintext = Zeroizing::new(read(&blob.plaintext)?);
                self.encrypt_to(blob, &plaintext)?;
            }
            info!("encrypted ssh keypair");
        }
        Ok(())
    }

    /// Compare the on-disk plaintext with the committed ciphertext.
    /// Returns `(plaintext, committed, changed)`.
    fn cycle(&self, blob: &BlobPaths) -> Result<(Vec<u8>, Vec<u8>, bool)> {
        let committed = self.decrypt(blob)?;
        if !blob.plaintext.exists() {
            write_atomic(&blob.plaintext, &committed, true)?;
            debug!(blob = %blob.plaintext.display(), "decrypted");
        }

        let _scratch = Scratch(&blob.compare);
        write_atomic(&blob.compare, &committed, true)?;
        let compare = read(&blob.compare)?;
        let current = read(&blob.plaintext)?;

        let changed = current != compare;
        Ok((current, compare, changed))
    }

    /// Materialize the keypair plaintext for ssh consumers.
    fn unlock_keypair(&self, state: BranchState, edits: &mut Edits) -> Result<()> {
        for blob in self.layout.keypair() {
            if state == BranchState::Develop && self.edit {
                let (current, _, changed) = self.cycle(&blob)?;
                if changed {
                    debug!(blob = %blob.plaintext.display(), "keypair edited by hand");
                    edits.push(blob.kind, current);
                }
            } else {
                let plaintext = self.decrypt(&blob)?;
                write_atomic(&blob.plaintext, &plaintext, true)?;
            }
        }
        Ok(())
    }

    /// Unlock the secret store for a branch state. No ciphertext is
    /// rewritten from hand edits here.
    ///
    /// # Errors
    ///
    /// Returns `CipherError::DecryptionFailed` for a wrong passphrase,
    /// `ConfigError::Parse` for a malformed configuration, or
    /// `SecretError::WorkflowBackupMissing` from the workflow guard.
    pub fn unlock(&self, state: BranchState, vcs: &dyn Vcs) -> Result<Unlocked> {
        let configuration = self.layout.configuration();
        let mut edits = Edits::default();

        match state {
            BranchState::DevelopCatapult => {
                let keypair = self.layout.keypair();
                for blob in std::iter::once(&configuration).chain(keypair.iter()) {
                    let relative = blob.ciphertext_relative();
                    vcs.checkout_path("develop", &relative)?;
                    vcs.unstage(&relative)?;
                }
                info!("restored secrets from develop");
            }
            BranchState::Develop => self.bootstrap()?,
            BranchState::Release | BranchState::Master => {
                debug!(branch = %state, "read-only unlock");
            }
        }

        let parsed = if state == BranchState::Develop && self.edit {
            let (current, committed, changed) = self.cycle(&configuration)?;
            let edited = Configuration::from_bytes(&current)?;
            if changed {
                let previous = Configuration::from_bytes(&committed)?;
                check_workflow_change(self.layout, &edited, &previous, self.today)?;
                info!("configuration changed by hand");
                edits.push(SecretKind::Configuration, current);
            }
            edited
        } else {
            let plaintext = self.decrypt(&configuration)?;
            Configuration::from_bytes(&plaintext)?
        };

        self.unlock_keypair(state, &mut edits)?;

        Ok(Unlocked {
            configuration: parsed,
            edits,
        })
    }

    /// The single write pass of a run: re-encrypt hand edits and persist
    /// reconciled state. A reconciled configuration supersedes its hand
    /// edit, so each blob is encrypted at most once.
    ///
    /// # Errors
    ///
    /// Returns a cipher, serialization or IO error.
    pub fn seal(
        &self,
        state: BranchState,
        edits: &Edits,
        reconciled: Option<&Configuration>,
    ) -> Result<Option<Persisted>> {
        if state != BranchState::Develop && !edits.is_empty() {
            warn!(branch = %state, "discarding hand edits outside develop");
        } else {
            for (kind, plaintext) in &edits.blobs {
                if *kind == SecretKind::Configuration && reconciled.is_some() {
                    continue;
                }
                self.encrypt_to(&self.layout.blob(*kind), plaintext)?;
                info!(blob = kind.file_name(), "re-encrypted hand edit");
            }
        }

        reconciled
            .map(|configuration| self.persist(state, configuration))
            .transpose()
    }

    /// Write reconciled state back. Only `develop` writes.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Serialize`, a cipher error, or an IO error.
    pub fn persist(&self, state: BranchState, configuration: &Configuration) -> Result<Persisted> {
        if state != BranchState::Develop {
            info!(branch = %state, "skipping write-back outside develop");
            return Ok(Persisted::Skipped);
        }

        let blob = self.layout.configuration();
        let contents = configuration.to_toml()?;
        if self.edit {
            write_atomic(&blob.plaintext, contents.as_bytes(), true)?;
        }
        self.encrypt_to(&blob, contents.as_bytes())?;
        self.layout.touch_changes()?;
        info!("persisted reconciled configuration");
        Ok(Persisted::Written)
    }
}
