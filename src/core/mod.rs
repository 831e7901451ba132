//! Core library components.
//!
//! Reconciliation, validation and the encrypted secret lifecycle, with the
//! VCS, cipher, providers and code hosts behind traits.

pub mod cipher;
pub mod constants;
pub mod domain;
pub mod engine;
pub mod generate;
pub mod http;
pub mod layout;
pub mod lifecycle;
pub mod lock;
pub mod provider;
pub mod reconcile;
pub mod repository;
pub mod settings;
pub mod types;
pub mod validation;
pub mod vcs;
