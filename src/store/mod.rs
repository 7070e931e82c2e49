//! Encrypted invoice workspace
//!
//! Every rendered invoice lives in the workspace as `<number>.json.cfb`: the
//! JSON descriptor encrypted with [`crate::crypto`]. These files are the
//! system of record; the search index is derived from them.

use std::fs;
use std::path::{Path, PathBuf};

use crate::crypto::{self, CryptoError, Key};
use crate::models::Invoice;

/// Extension of encrypted descriptors
pub const EXT_ENCRYPTED: &str = "json.cfb";

/// Extension of plain descriptors
pub const EXT_PLAIN: &str = "json";

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors raised by the encrypted store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem failure
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Decryption or deserialization failed.
    ///
    /// Without an integrity tag a wrong password and a damaged file look the
    /// same, so both end up here.
    #[error("cannot read document {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    /// Descriptor could not be serialized or encrypted
    #[error("cannot write document {path}: {reason}")]
    Unwritable { path: PathBuf, reason: String },
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Outcome of looking up a document by invoice number
#[derive(Debug)]
pub enum DocumentLookup<T> {
    /// The document exists and was read
    Found(T),
    /// No document at the expected path
    NotFound(PathBuf),
}

/// Reads and writes encrypted descriptors in one workspace directory
#[derive(Debug, Clone)]
pub struct EncryptedDocumentStore {
    workspace: PathBuf,
}

impl EncryptedDocumentStore {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
        }
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// Path of the encrypted descriptor for an invoice number
    pub fn path_for(&self, number: &str) -> PathBuf {
        self.workspace.join(format!("{}.{}", number, EXT_ENCRYPTED))
    }

    /// Path of the plain descriptor for a name
    pub fn plain_path_for(&self, name: &str) -> PathBuf {
        self.workspace.join(format!("{}.{}", name, EXT_PLAIN))
    }

    /// Enumerate the encrypted descriptors in the workspace.
    ///
    /// The scan is lazy and single-pass; files created or removed while it
    /// runs may or may not be seen.
    pub fn list(&self) -> StoreResult<EncryptedDocuments> {
        let entries =
            fs::read_dir(&self.workspace).map_err(|e| StoreError::io(&self.workspace, e))?;
        Ok(EncryptedDocuments { entries })
    }

    /// Read and decrypt a descriptor
    pub fn read(&self, path: &Path, key: &Key) -> StoreResult<Invoice> {
        let raw = fs::read(path).map_err(|e| StoreError::io(path, e))?;
        let plain = crypto::decrypt(key, &raw).map_err(|e| unreadable(path, e))?;
        serde_json::from_slice(&plain).map_err(|e| StoreError::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Encrypt and write a descriptor, creating missing directories
    pub fn write(&self, path: &Path, key: &Key, invoice: &Invoice) -> StoreResult<()> {
        let content = serde_json::to_vec_pretty(invoice).map_err(|e| StoreError::Unwritable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let blob = crypto::encrypt(key, &content).map_err(|e| StoreError::Unwritable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        write_file(path, blob.as_bytes())
    }

    /// Look up and decrypt the descriptor of an invoice number
    pub fn open(&self, number: &str, key: &Key) -> StoreResult<DocumentLookup<Invoice>> {
        let path = self.path_for(number);
        if !path.exists() {
            return Ok(DocumentLookup::NotFound(path));
        }
        self.read(&path, key).map(DocumentLookup::Found)
    }

    /// Encrypt an invoice into its canonical workspace path
    pub fn seal(&self, invoice: &Invoice, key: &Key) -> StoreResult<PathBuf> {
        let path = self.path_for(invoice.number());
        self.write(&path, key, invoice)?;
        tracing::debug!(number = invoice.number(), path = %path.display(), "Sealed descriptor");
        Ok(path)
    }

    /// Read an unencrypted descriptor
    pub fn read_plain(&self, path: &Path) -> StoreResult<Invoice> {
        let raw = fs::read(path).map_err(|e| StoreError::io(path, e))?;
        serde_json::from_slice(&raw).map_err(|e| StoreError::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Write an unencrypted descriptor
    pub fn write_plain(&self, path: &Path, invoice: &Invoice) -> StoreResult<()> {
        let content = serde_json::to_vec_pretty(invoice).map_err(|e| StoreError::Unwritable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        write_file(path, &content)
    }
}

/// Lazy iterator over the encrypted descriptors of a workspace
pub struct EncryptedDocuments {
    entries: fs::ReadDir,
}

impl Iterator for EncryptedDocuments {
    type Item = PathBuf;

    fn next(&mut self) -> Option<Self::Item> {
        for entry in self.entries.by_ref() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable workspace entry");
                    continue;
                }
            };
            let path = entry.path();
            if path.is_file() && is_encrypted_descriptor(&path) {
                return Some(path);
            }
        }
        None
    }
}

/// Whether a path names an encrypted descriptor
pub fn is_encrypted_descriptor(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| {
            name.strip_suffix(EXT_ENCRYPTED)
                .is_some_and(|stem| stem.len() > 1 && stem.ends_with('.'))
        })
        .unwrap_or(false)
}

fn unreadable(path: &Path, err: CryptoError) -> StoreError {
    StoreError::Unreadable {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

fn write_file(path: &Path, content: &[u8]) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
    }
    fs::write(path, content).map_err(|e| StoreError::io(path, e))
}
