//! At-rest encryption for invoice descriptors
//!
//! Descriptors are stored as hex text of `IV || ciphertext`, produced by
//! AES-256 in CFB mode with a fresh random IV per encryption. The key is the
//! operator passphrase padded to 32 bytes (see [`Key::derive`]).
//!
//! The scheme gives confidentiality only: there is no authentication tag, so
//! decrypting with the wrong key yields garbage instead of an error.

mod cipher;
mod key;

pub use cipher::{decrypt, encrypt, BLOCK_SIZE};
pub use key::{Key, KEY_LEN};

/// Result type for crypto operations
pub type CryptoResult<T> = std::result::Result<T, CryptoError>;

/// Errors raised by key derivation and the cipher
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// Passphrase does not fit in the key
    #[error("password is too long ({len} bytes, max 32)")]
    PassphraseTooLong { len: usize },

    /// Blob is not valid hex or shorter than one IV
    #[error("corrupted encrypted data: {0}")]
    Corrupt(String),

    /// Cipher rejected the key or IV length
    #[error("invalid key or iv length")]
    InvalidLength,

    /// The secure random source failed
    #[error("cannot generate iv: {0}")]
    Entropy(String),
}
