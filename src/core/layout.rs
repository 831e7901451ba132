//! On-disk layout of a catapult root.
//!
//! Every path the engine reads or writes is derived here from the root
//! directory, so tests can point a whole run at a temporary directory.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::core::constants;
use crate::error::Result;

/// Which secret blob a path set belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretKind {
    Configuration,
    PrivateKey,
    PublicKey,
}

impl SecretKind {
    /// Plaintext file name inside the secrets directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Configuration => constants::CONFIGURATION_FILE,
            Self::PrivateKey => constants::PRIVATE_KEY_FILE,
            Self::PublicKey => constants::PUBLIC_KEY_FILE,
        }
    }
}

/// Paths of one secret blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobPaths {
    pub kind: SecretKind,
    /// Decrypted form. Only present transiently.
    pub plaintext: PathBuf,
    /// Committed encrypted form.
    pub ciphertext: PathBuf,
    /// Disposable decrypted copy of the committed ciphertext.
    pub compare: PathBuf,
}

impl BlobPaths {
    /// Ciphertext path relative to the root, as git sees it.
    pub fn ciphertext_relative(&self) -> String {
        format!(
            "{}/{}{}",
            constants::SECRETS_DIR,
            self.kind.file_name(),
            constants::CIPHERTEXT_SUFFIX
        )
    }
}

/// Root-relative layout.
#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn secrets_dir(&self) -> PathBuf {
        self.root.join(constants::SECRETS_DIR)
    }

    /// Paths for a secret blob.
    pub fn blob(&self, kind: SecretKind) -> BlobPaths {
        let dir = self.secrets_dir();
        let name = kind.file_name();
        BlobPaths {
            kind,
            plaintext: dir.join(name),
            ciphertext: dir.join(format!("{}{}", name, constants::CIPHERTEXT_SUFFIX)),
            compare: dir.join(format!("{}{}", name, constants::COMPARE_SUFFIX)),
        }
    }

    pub fn configuration(&self) -> BlobPaths {
        self.blob(SecretKind::Configuration)
    }

    /// Both halves of the ssh keypair, private first.
    pub fn keypair(&self) -> [BlobPaths; 2] {
        [
            self.blob(SecretKind::PrivateKey),
            self.blob(SecretKind::PublicKey),
        ]
    }

    pub fn settings(&self) -> PathBuf {
        self.secrets_dir().join(constants::SETTINGS_FILE)
    }

    pub fn changes_marker(&self) -> PathBuf {
        self.root.join(constants::CHANGES_MARKER)
    }

    pub fn software_catalog(&self) -> PathBuf {
        self.root.join(constants::SOFTWARE_CATALOG)
    }

    /// Same-day database backup for a website, `repositories/{service}/{domain}/_sql/{YYYYMMDD}.sql`.
    pub fn backup(&self, service: &str, domain: &str, day: NaiveDate) -> PathBuf {
        self.root
            .join(constants::REPOSITORIES_DIR)
            .join(service)
            .join(domain)
            .join("_sql")
            .join(format!("{}.sql", day.format("%Y%m%d")))
    }

    pub fn git_hooks_dir(&self) -> PathBuf {
        self.root.join(".git").join("hooks")
    }

    /// Touch the changes marker, creating parent directories.
    pub fn touch_changes(&self) -> Result<()> {
        let marker = self.changes_marker();
        if let Some(parent) = marker.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&marker)?;
        Ok(())
    }

    /// Ensure `.gitignore` keeps every plaintext form out of history.
    pub fn ensure_gitignore(&self) -> Result<()> {
        let gitignore = self.root.join(".gitignore");

        let existing = if gitignore.exists() {
            std::fs::read_to_string(&gitignore)?
        } else {
            String::new()
        };

        let mut updated = existing.clone();
        for entry in constants::GITIGNORE_ENTRIES {
            if !existing.lines().any(|l| l.trim() == *entry) {
                if !updated.is_empty() && !updated.ends_with('\n') {
                    updated.push('\n');
                }
                updated.push_str(entry);
                updated.push('\n');
            }
        }

        if updated != existing {
            std::fs::write(gitignore, updated)?;
        }

        Ok(())
    }
}
