//! Rebuildable full-text index over the encrypted invoice workspace
//!
//! The index is a disposable cache. It holds a flat projection of every
//! invoice (number, customer, total, issue date, item text) and can be
//! dropped and rebuilt from the encrypted descriptors at any time.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │           Query Engine                           │
//! ├─────────────────────────────────────────────────┤
//! │  - search()                                      │
//! └─────────────────────────────────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────────────┐
//! │           Index Manager                          │
//! ├─────────────────────────────────────────────────┤
//! │  - rebuild()  - add()  - seal()                  │
//! └─────────────────────────────────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────────────┐
//! │   Encrypted workspace (*.json.cfb)               │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use invoice_vault::crypto::Key;
//! use invoice_vault::search::{InvoiceQuery, QueryEngine, SearchConfig};
//! use invoice_vault::store::EncryptedDocumentStore;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = EncryptedDocumentStore::new("/srv/invoices");
//!     let key = Key::derive("correct horse")?;
//!
//!     let engine = QueryEngine::new(SearchConfig::default())?;
//!     engine.index_manager().rebuild(&store, &key, None)?;
//!
//!     let response = engine.search(&InvoiceQuery::new().with_customer("hecht"))?;
//!     println!("Found {} invoices", response.total_hits);
//!     Ok(())
//! }
//! ```

mod config;
mod date_format;
mod document;
mod error;
mod fuzzy;
mod index;
mod query;
mod service;

pub use config::{SearchConfig, SearchConfigBuilder, MAX_FUZZINESS};
pub use date_format::{parse_query_date, DateFormat, QUERY_DATE_FORMAT};
pub use document::{
    build_invoice_schema, FieldExtractor, IndexedInvoiceRecord, InvoiceFields, SearchDocument,
};
pub use error::{SearchError, SearchResult};
pub use fuzzy::WideFuzzyTermQuery;
pub use index::{IndexState, IndexStats, RebuildReport, SealReport, SearchIndexManager};
pub use query::{InvoiceQuery, QueryBuilder};
pub use service::{QueryEngine, SearchHit, SearchResponse};
