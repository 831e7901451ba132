//! Constants used throughout catapult.
//!
//! Centralizes file names, provider vocabulary and policy limits.

/// Directory holding every secret blob, relative to the root.
pub const SECRETS_DIR: &str = "secrets";

/// Declarative configuration plaintext.
pub const CONFIGURATION_FILE: &str = "configuration.toml";

/// Team ssh private key plaintext.
pub const PRIVATE_KEY_FILE: &str = "id_rsa";

/// Team ssh public key plaintext.
pub const PUBLIC_KEY_FILE: &str = "id_rsa.pub";

/// Operator settings (passphrase, edit mode). Never committed.
pub const SETTINGS_FILE: &str = "configuration-user.toml";

/// Suffix of committed ciphertext files.
pub const CIPHERTEXT_SUFFIX: &str = ".age";

/// Suffix of the disposable comparison copy.
pub const COMPARE_SUFFIX: &str = ".compare";

/// Suffix of the advisory lock marker.
pub const LOCK_SUFFIX: &str = ".lock";

/// Marker consumed by the deployment pipeline to decide on a rebuild.
pub const CHANGES_MARKER: &str = "provisioners/redhat/logs/catapult.changes";

/// Optional software catalog, keyed by service.
pub const SOFTWARE_CATALOG: &str = "provisioners/provisioners.toml";

/// Website repositories and their database backups.
pub const REPOSITORIES_DIR: &str = "repositories";

/// Version marker required on every core contribution commit.
pub const VERSION_MARKER: &str = "VERSION.toml";

/// Environment variable overriding the settings passphrase.
pub const PASSPHRASE_ENV: &str = "CATAPULT_PASSPHRASE";

/// Service whose websites skip repository checks.
pub const CORE_SERVICE: &str = "catapult";

/// Code hosts a website repository may live on.
pub const ALLOWED_REPO_HOSTS: &[&str] = &["github.com", "bitbucket.org"];

/// Branches every website repository must carry.
pub const CANONICAL_BRANCHES: &[&str] = &["master", "release", "develop"];

/// Maximum length of the company name (63 char hostname minus the longest suffix).
pub const MAX_COMPANY_NAME: usize = 39;

/// Maximum combined length of domain and tld override (64 minus `production_`).
pub const MAX_DOMAIN_LENGTH: usize = 53;

/// DigitalOcean GrubLoader kernel every droplet must boot.
pub const REQUIRED_KERNEL_ID: u64 = 7516;

/// Upper bound for a single provider call.
pub const PROVIDER_TIMEOUT_SECS: u64 = 30;

/// Lock acquisition polling interval.
pub const LOCK_POLL_SECS: u64 = 5;

/// Lock acquisition deadline.
pub const LOCK_TIMEOUT_SECS: u64 = 60;

/// Capabilities degraded when a provider cannot be reached.
pub const DEGRADED_CAPABILITIES: &str = "provisioning, deployments, and dashboard reporting";

/// Gitignore entries keeping plaintext out of history.
pub const GITIGNORE_ENTRIES: &[&str] = &[
    "secrets/configuration.toml",
    "secrets/configuration-user.toml",
    "secrets/id_rsa",
    "secrets/id_rsa.pub",
    "secrets/*.compare",
    "*.lock",
];
