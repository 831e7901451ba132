//! Age passphrase backend.
//!
//! Uses an scrypt recipient (ChaCha20-Poly1305 payload) and ASCII armor so
//! ciphertexts diff and merge sensibly in git.

use std::io::{Read, Write};

use ::age::secrecy::SecretString;
use tracing::trace;
use zeroize::Zeroizing;

use super::{Cipher, Passphrase};
use crate::core::types::Ciphertext;
use crate::error::{CipherError, Result};

/// scrypt work factor (log2 N) for new ciphertexts.
const DEFAULT_WORK_FACTOR: u8 = 18;

/// Ceiling accepted when decrypting, so a hostile header cannot stall a run.
const MAX_WORK_FACTOR: u8 = 22;

/// Age-based passphrase cipher.
#[derive(Debug, Clone, Copy)]
pub struct Age {
    work_factor: u8,
}

impl Default for Age {
    fn default() -> Self {
        Self {
            work_factor: DEFAULT_WORK_FACTOR,
        }
    }
}

impl Age {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom scrypt work factor. Low values are only suitable for tests.
    pub fn with_work_factor(work_factor: u8) -> Self {
        Self { work_factor }
    }
}

fn secret(passphrase: &Passphrase) -> SecretString {
    SecretString::from(passphrase.expose().to_owned())
}

impl Cipher for Age {
    fn name(&self) -> &'static str {
        "age"
    }

    fn encrypt(&self, plaintext: &[u8], passphrase: &Passphrase) -> Result<Ciphertext> {
        trace!(plaintext_len = plaintext.len(), "encrypting");

        let mut recipient = ::age::scrypt::Recipient::new(secret(passphrase));
        recipient.set_work_factor(self.work_factor);

        let encryptor =
            ::age::Encryptor::with_recipients(std::iter::once(&recipient as &dyn ::age::Recipient))
                .map_err(|e| CipherError::EncryptionFailed(format!("{}", e)))?;

        let mut encrypted = Vec::new();
        let mut writer = encryptor
            .wrap_output(::age::armor::ArmoredWriter::wrap_output(
                &mut encrypted,
                ::age::armor::Format::AsciiArmor,
            )?)
            .map_err(|e| CipherError::EncryptionFailed(format!("{}", e)))?;

        writer.write_all(plaintext)?;
        let armored = writer
            .finish()
            .map_err(|e| CipherError::EncryptionFailed(format!("{}", e)))?;
        armored
            .finish()
            .map_err(|e| CipherError::ArmorFailed(format!("{}", e)))?;

        trace!(ciphertext_len = encrypted.len(), "encrypted");

        String::from_utf8(encrypted)
            .map_err(|e| CipherError::EncryptionFailed(format!("UTF-8 error: {}", e)).into())
    }

    fn decrypt(&self, ciphertext: &str, passphrase: &Passphrase) -> Result<Zeroizing<Vec<u8>>> {
        trace!(ciphertext_len = ciphertext.len(), "decrypting");

        let reader = ::age::armor::ArmoredReader::new(ciphertext.as_bytes());
        let decryptor = ::age::Decryptor::new(reader)
            .map_err(|e| CipherError::DecryptionFailed(format!("{}", e)))?;

        let mut identity = ::age::scrypt::Identity::new(secret(passphrase));
        identity.set_max_work_factor(MAX_WORK_FACTOR);

        let mut reader = decryptor
            .decrypt(std::iter::once(&identity as &dyn ::age::Identity))
            .map_err(|e| CipherError::DecryptionFailed(format!("{}", e)))?;

        let mut decrypted = Zeroizing::new(Vec::new());
        reader
            .read_to_end(&mut decrypted)
            .map_err(|e| CipherError::DecryptionFailed(format!("{}", e)))?;

        trace!(plaintext_len = decrypted.len(), "decrypted");

        Ok(decrypted)
    }
}
