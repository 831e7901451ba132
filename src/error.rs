//! Error types.
//!
//! Each concern owns a small `thiserror` enum; [`Error`] composes them so the
//! binary can map any failure to a single summary line and remediation hint.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::validation::Rule;

/// Top-level error.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Cipher(#[from] CipherError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Vcs(#[from] VcsError),

    #[error(transparent)]
    Secret(#[from] SecretError),

    #[error(transparent)]
    Hook(#[from] HookError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// One remediation instruction for the operator, if the error class has one.
    pub fn hint(&self) -> Option<String> {
        match self {
            Error::Config(ConfigError::SettingsMissing(path)) => Some(format!(
                "set your team's passphrase in {} and re-run",
                path.display()
            )),
            Error::Config(ConfigError::InvalidSetting { .. }) => {
                Some("correct secrets/configuration-user.toml and re-run".to_string())
            }
            Error::Config(ConfigError::Parse(_)) => {
                Some("correct the syntax of secrets/configuration.toml and re-run".to_string())
            }
            Error::Validation(_) => {
                Some("correct secrets/configuration.toml and re-run".to_string())
            }
            Error::Cipher(CipherError::DecryptionFailed(_)) => Some(
                "confirm your team's passphrase in secrets/configuration-user.toml is correct"
                    .to_string(),
            ),
            Error::Provider(ProviderError::Auth { provider, .. }) => Some(format!(
                "verify the {} credentials under [company.credentials] in secrets/configuration.toml",
                provider
            )),
            Error::Lock(LockError::Contention { .. }) => Some(
                "verify no other run is active, then remove the stale .lock file and try again"
                    .to_string(),
            ),
            Error::Vcs(VcsError::UnsupportedBranch(_)) => Some(
                "switch to develop (configuration) or develop-catapult (core contribution)"
                    .to_string(),
            ),
            Error::Vcs(VcsError::NotFound) => Some("install git and re-run".to_string()),
            Error::Secret(SecretError::MissingKeypair { .. }) => Some(
                "place your team's ssh keypair at secrets/id_rsa and secrets/id_rsa.pub"
                    .to_string(),
            ),
            Error::Secret(SecretError::WorkflowBackupMissing { remediation, .. }) => {
                Some(remediation.clone())
            }
            _ => None,
        }
    }
}

/// Configuration and settings errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("toml parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("toml serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("operator settings were missing and have been created at {0}")]
    SettingsMissing(PathBuf),

    #[error("invalid setting {field}: {reason}")]
    InvalidSetting { field: &'static str, reason: String },
}

/// A single violated rule in the declared configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid configuration at {field}: {reason}")]
pub struct ValidationError {
    /// Dotted path to the offending field.
    pub field: String,
    /// The rule that was violated.
    pub rule: Rule,
    /// Human-readable explanation.
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, rule: Rule, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            rule,
            reason: reason.into(),
        }
    }
}

/// Encryption backend errors.
#[derive(Error, Debug)]
pub enum CipherError {
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("armor failed: {0}")]
    ArmorFailed(String),
}

/// Fatal provider errors. Unavailability is not an error, see `Listing`.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{status} the {provider} API could not authenticate")]
    Auth { provider: &'static str, status: u16 },

    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("{provider} remediation failed: {reason}")]
    Remediation {
        provider: &'static str,
        reason: String,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Advisory lock errors.
#[derive(Error, Debug)]
pub enum LockError {
    #[error("waited too long for {marker}; another run may have hung or ended unexpectedly")]
    Contention { marker: PathBuf },

    #[error("lock file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Version control errors.
#[derive(Error, Debug)]
pub enum VcsError {
    #[error("git executable not found")]
    NotFound,

    #[error("`git {command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("unsupported branch '{0}'")]
    UnsupportedBranch(String),
}

/// Secret lifecycle errors.
#[derive(Error, Debug)]
pub enum SecretError {
    #[error("no ssh keypair ciphertext exists and {missing} is not present")]
    MissingKeypair { missing: PathBuf },

    #[error(
        "software_workflow for {domain} changed from {from} to {to} and today's backup does not exist ({backup})"
    )]
    WorkflowBackupMissing {
        domain: String,
        from: String,
        to: String,
        backup: PathBuf,
        remediation: String,
    },
}

/// Pre-commit policy violations.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum HookError {
    #[error("increment the version in {0} for every commit on develop-catapult")]
    VersionNotBumped(&'static str),

    #[error("commit {0} on the develop branch; develop-catapult must not contain your configuration")]
    SecretOnContribution(String),

    #[error("the develop branch is only meant for configuration ciphertexts; switch to develop-catapult to contribute")]
    NoSecretOnDevelop,

    #[error("direct commits of {file} to {branch} are not allowed; open a pull request instead")]
    DirectCommit { branch: String, file: String },
}

pub type Result<T> = std::result::Result<T, Error>;
