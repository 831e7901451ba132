//! Catapult - branch-gated configuration reconciliation with an encrypted,
//! git-versioned secret store.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── cli/              # Command-line interface
//! │   ├── run           # Reconcile, validate and persist
//! │   ├── status        # Branch, blob and lock overview
//! │   ├── hook          # Pre-commit policy and installer
//! │   └── completions   # Shell completions
//! └── core/             # Core library components
//!     ├── engine        # Run orchestration
//!     ├── lifecycle     # Bootstrap, unlock, compare, seal, persist
//!     ├── reconcile     # Provider fact merge
//!     ├── generate      # Per-environment credentials
//!     ├── validation    # Configuration rules
//!     ├── cipher/       # Cipher trait and age backend
//!     ├── provider/     # VirtualBox, EC2 and DigitalOcean readers
//!     ├── repository    # GitHub and Bitbucket probes
//!     ├── vcs/          # Vcs trait, git backend, pre-commit policy
//!     ├── lock          # Advisory run lock
//!     ├── settings      # Operator settings
//!     └── layout        # On-disk paths
//! ```
//!
//! # Branches
//!
//! - `develop`: configuration changes are decrypted, compared and re-encrypted
//! - `develop-catapult`: secrets are restored from `develop` and never committed
//! - `release`, `master`: read-only

pub mod cli;
pub mod core;
pub mod error;
