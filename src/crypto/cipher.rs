//! AES-256-CFB encrypter with a random IV prefix, hex encoded.

use aes::Aes256;
use cfb_mode::cipher::{AsyncStreamCipher, KeyIvInit};
use rand::{rngs::OsRng, RngCore};

use super::{CryptoError, CryptoResult, Key};

type Aes256CfbEnc = cfb_mode::Encryptor<Aes256>;
type Aes256CfbDec = cfb_mode::Decryptor<Aes256>;

/// AES block width, also the IV length
pub const BLOCK_SIZE: usize = 16;

/// Encrypt `plaintext` and return the hex encoding of `IV || ciphertext`.
///
/// A new IV is drawn from the OS random source on every call.
pub fn encrypt(key: &Key, plaintext: &[u8]) -> CryptoResult<String> {
    let mut iv = [0u8; BLOCK_SIZE];
    OsRng
        .try_fill_bytes(&mut iv)
        .map_err(|e| CryptoError::Entropy(e.to_string()))?;

    let mut buf = Vec::with_capacity(BLOCK_SIZE + plaintext.len());
    buf.extend_from_slice(&iv);
    buf.extend_from_slice(plaintext);

    Aes256CfbEnc::new_from_slices(key.as_bytes(), &iv)
        .map_err(|_| CryptoError::InvalidLength)?
        .encrypt(&mut buf[BLOCK_SIZE..]);

    Ok(hex::encode(buf))
}

/// Decrypt a hex blob produced by [`encrypt`].
///
/// Surrounding whitespace is ignored. Fails when the blob is not hex or
/// decodes to fewer than [`BLOCK_SIZE`] bytes. A wrong key is not detected.
pub fn decrypt(key: &Key, blob: &[u8]) -> CryptoResult<Vec<u8>> {
    let text = std::str::from_utf8(blob)
        .map_err(|_| CryptoError::Corrupt("blob is not ascii hex".into()))?;
    let mut raw = hex::decode(text.trim()).map_err(|e| CryptoError::Corrupt(e.to_string()))?;

    if raw.len() < BLOCK_SIZE {
        return Err(CryptoError::Corrupt(format!(
            "ciphertext too short ({} bytes)",
            raw.len()
        )));
    }

    let mut plaintext = raw.split_off(BLOCK_SIZE);
    Aes256CfbDec::new_from_slices(key.as_bytes(), &raw)
        .map_err(|_| CryptoError::InvalidLength)?
        .decrypt(&mut plaintext);

    Ok(plaintext)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> Key {
        Key::derive("correct horse battery").unwrap()
    }

    #[test]
    fn test_roundtrip() {
        let blob = encrypt(&key(), b"{\"number\":\"0000001\"}").unwrap();
        let plain = decrypt(&key(), blob.as_bytes()).unwrap();
        assert_eq!(plain, b"{\"number\":\"0000001\"}");
    }

    #[test]
    fn test_output_is_hex_with_iv_prefix() {
        let blob = encrypt(&key(), b"abc").unwrap();
        assert_eq!(blob.len(), (BLOCK_SIZE + 3) * 2);
        assert!(blob.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_empty_plaintext() {
        let blob = encrypt(&key(), b"").unwrap();
        assert_eq!(decrypt(&key(), blob.as_bytes()).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_trailing_newline_tolerated() {
        let blob = format!("{}\n", encrypt(&key(), b"abc").unwrap());
        assert_eq!(decrypt(&key(), blob.as_bytes()).unwrap(), b"abc");
    }

    #[test]
    fn test_short_blob_is_corrupt() {
        let err = decrypt(&key(), hex::encode([0u8; 15]).as_bytes()).unwrap_err();
        assert!(matches!(err, CryptoError::Corrupt(_)));
    }

    #[test]
    fn test_non_hex_is_corrupt() {
        let err = decrypt(&key(), b"not hex at all").unwrap_err();
        assert!(matches!(err, CryptoError::Corrupt(_)));
    }

    #[test]
    fn test_wrong_key_yields_garbage() {
        let blob = encrypt(&key(), b"sensitive").unwrap();
        let other = Key::derive("another password").unwrap();
        let plain = decrypt(&other, blob.as_bytes()).unwrap();
        assert_ne!(plain, b"sensitive");
    }
}
