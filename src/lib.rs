//! Encrypted invoice workspace with a rebuildable full-text index.
//!
//! Invoice descriptors are stored as AES-256-CFB encrypted JSON files, one
//! per invoice number. The [`search`] index is a disposable projection of
//! those files that can be rebuilt at any time with the workspace password.

pub mod config;
pub mod crypto;
pub mod error;
pub mod models;
pub mod search;
pub mod store;

pub use error::{AppError, Result};
