//! Cryptographic operations.
//!
//! Secret blobs are sealed with a single team passphrase. The `Cipher`
//! trait keeps the lifecycle manager independent of the primitive; the
//! default backend is age with an scrypt recipient.

use std::fmt;

use zeroize::Zeroizing;

use crate::core::types::Ciphertext;
use crate::error::Result;

mod age;

pub use age::Age;

/// The team passphrase. Redacted in debug output and zeroed on drop.
#[derive(Clone)]
pub struct Passphrase(Zeroizing<String>);

impl Passphrase {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passphrase(***)")
    }
}

/// Symmetric encryption backend.
pub trait Cipher {
    /// Encrypt plaintext bytes into an ASCII-armored ciphertext.
    ///
    /// # Errors
    ///
    /// Returns `CipherError` if encryption fails.
    fn encrypt(&self, plaintext: &[u8], passphrase: &Passphrase) -> Result<Ciphertext>;

    /// Decrypt an ASCII-armored ciphertext.
    ///
    /// # Errors
    ///
    /// Returns `CipherError::DecryptionFailed` for a wrong passphrase or a
    /// tampered ciphertext.
    fn decrypt(&self, ciphertext: &str, passphrase: &Passphrase) -> Result<Zeroizing<Vec<u8>>>;

    /// Backend name for display.
    fn name(&self) -> &'static str;
}
