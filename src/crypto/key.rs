use std::fmt;

use super::{CryptoError, CryptoResult};

/// Key width for AES-256
pub const KEY_LEN: usize = 32;

/// Symmetric key material derived from the operator passphrase
#[derive(Clone, PartialEq, Eq)]
pub struct Key([u8; KEY_LEN]);

impl Key {
    /// Derive a key from a passphrase.
    ///
    /// Surrounding whitespace is trimmed and the remainder is padded on the
    /// left with spaces up to [`KEY_LEN`] bytes. No KDF is applied: the padded
    /// passphrase is the key. Passphrases longer than the key are rejected.
    pub fn derive(passphrase: &str) -> CryptoResult<Self> {
        let trimmed = passphrase.trim().as_bytes();
        if trimmed.len() > KEY_LEN {
            return Err(CryptoError::PassphraseTooLong { len: trimmed.len() });
        }

        let mut bytes = [b' '; KEY_LEN];
        bytes[KEY_LEN - trimmed.len()..].copy_from_slice(trimmed);
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Key(<redacted>)")
    }
}
