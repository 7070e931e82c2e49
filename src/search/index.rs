//! Search index management

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use strum::Display;
use tantivy::schema::Schema;
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, Term};
use validator::Validate;

use crate::crypto::Key;
use crate::models::Invoice;
use crate::search::config::{SearchConfig, MIN_WRITER_HEAP_PER_THREAD};
use crate::search::document::{
    build_invoice_schema, FieldExtractor, IndexedInvoiceRecord, InvoiceFields, SearchDocument,
};
use crate::search::error::{SearchError, SearchResult};
use crate::store::EncryptedDocumentStore;

/// On-disk state of the index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum IndexState {
    /// Never created, or deleted
    Absent,
    /// A rebuild started and has not finished; the index may be partial
    Building,
    /// Created and committed, possibly empty
    Ready,
}

/// Appended to the index path to mark a rebuild in progress
const BUILDING_MARKER_SUFFIX: &str = ".building";

/// Index statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    /// Total number of documents in the index
    pub total_documents: u64,

    /// Index size in bytes
    pub index_size_bytes: u64,

    /// Number of segments
    pub num_segments: usize,
}

/// Outcome of a full rebuild
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuildReport {
    /// Documents in the index afterwards, read back from the index
    pub documents: u64,

    /// Descriptors that could not be decrypted or extracted
    pub skipped: usize,

    /// Wall-clock time spent indexing
    pub elapsed: Duration,
}

/// Outcome of sealing one invoice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealReport {
    /// Encrypted descriptor written to the workspace
    pub path: PathBuf,

    /// Whether the invoice was added to the index
    pub indexed: bool,
}

/// Owns the on-disk invoice index.
///
/// The index is a cache of the encrypted workspace: it may be deleted and
/// rebuilt at any time. Only one process may use an index at a time.
pub struct SearchIndexManager {
    /// The schema
    schema: Schema,

    /// Resolved field handles
    fields: InvoiceFields,

    /// Builds index records from invoices
    extractor: FieldExtractor,

    /// Configuration
    config: SearchConfig,
}

impl SearchIndexManager {
    /// Create a new manager; the index itself is not touched
    pub fn new(config: SearchConfig) -> SearchResult<Self> {
        config.validate()?;
        if config.heap_per_thread() < MIN_WRITER_HEAP_PER_THREAD {
            return Err(SearchError::InvalidConfiguration(format!(
                "writer heap of {} bytes is too small for {} threads",
                config.writer_heap_size, config.indexing_threads
            )));
        }

        let schema = build_invoice_schema();
        let fields = InvoiceFields::from_schema(&schema)?;
        let extractor = FieldExtractor::new(config.default_date_format.clone());

        Ok(Self {
            schema,
            fields,
            extractor,
            config,
        })
    }

    /// Check if an index exists at the given path
    fn index_exists(path: &Path) -> bool {
        path.join("meta.json").exists()
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Get the schema
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn fields(&self) -> &InvoiceFields {
        &self.fields
    }

    /// Marker file present while a rebuild runs.
    ///
    /// A rebuild that crashed or was cancelled leaves it behind.
    fn building_marker(&self) -> PathBuf {
        let mut marker = self.config.index_path.as_os_str().to_owned();
        marker.push(BUILDING_MARKER_SUFFIX);
        PathBuf::from(marker)
    }

    pub fn state(&self) -> IndexState {
        if self.building_marker().exists() {
            IndexState::Building
        } else if Self::index_exists(&self.config.index_path) {
            IndexState::Ready
        } else {
            IndexState::Absent
        }
    }

    /// Create an empty index if none exists. Idempotent.
    ///
    /// A partial index left by an unfinished rebuild is kept as is.
    pub fn ensure_exists(&self) -> SearchResult<()> {
        if Self::index_exists(&self.config.index_path) {
            return Ok(());
        }
        self.create()?;
        tracing::info!(path = %self.config.index_path.display(), "Created empty search index");
        Ok(())
    }

    /// Open the existing index
    pub fn open(&self) -> SearchResult<Index> {
        if !Self::index_exists(&self.config.index_path) {
            return Err(SearchError::IndexNotFound(
                self.config.index_path.display().to_string(),
            ));
        }
        Index::open_in_dir(&self.config.index_path).map_err(|e| {
            SearchError::IndexInitFailed(format!("Failed to open existing index: {}", e))
        })
    }

    /// Open a reader that only sees what was committed when it was created
    pub fn reader(&self, index: &Index) -> SearchResult<IndexReader> {
        index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| SearchError::IndexInitFailed(format!("Failed to create reader: {}", e)))
    }

    /// Drop the index and rebuild it from every descriptor in the workspace.
    ///
    /// Descriptors that cannot be decrypted or whose fields cannot be
    /// extracted are logged and skipped. Commits happen every
    /// `batch_size` documents and once at the end. When `cancel` becomes
    /// true the rebuild stops before the next document, leaving whatever
    /// was already committed and the state stays [`IndexState::Building`];
    /// running the rebuild again recovers.
    pub fn rebuild(
        &self,
        store: &EncryptedDocumentStore,
        key: &Key,
        cancel: Option<&AtomicBool>,
    ) -> SearchResult<RebuildReport> {
        let descriptors = store.list()?;

        let path = &self.config.index_path;
        let marker = self.building_marker();
        if let Some(parent) = marker.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&marker, b"")?;

        if path.exists() {
            std::fs::remove_dir_all(path)?;
            tracing::debug!(path = %path.display(), "Removed previous search index");
        }

        let index = self.create()?;
        let mut writer = self.writer(&index)?;
        let start = Instant::now();

        let mut indexed = 0usize;
        let mut skipped = 0usize;
        for descriptor in descriptors {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                tracing::warn!(indexed, "Rebuild cancelled, index is partial");
                return Err(SearchError::Cancelled { indexed });
            }

            let record = match store
                .read(&descriptor, key)
                .map_err(SearchError::from)
                .and_then(|invoice| self.extractor.extract(&invoice))
            {
                Ok(record) => record,
                Err(e) => {
                    skipped += 1;
                    tracing::warn!(
                        path = %descriptor.display(),
                        error = %e,
                        "Cannot index descriptor, the invoice will not be searchable"
                    );
                    continue;
                }
            };

            self.upsert(&writer, &record)?;
            indexed += 1;
            if indexed % self.config.batch_size == 0 {
                writer.commit().map_err(|e| {
                    SearchError::IndexingFailed(format!("Failed to commit batch: {}", e))
                })?;
                tracing::debug!(indexed, "Flushed index batch");
            }
        }

        writer
            .commit()
            .map_err(|e| SearchError::IndexingFailed(format!("Failed to commit batch: {}", e)))?;
        writer.wait_merging_threads()?;
        std::fs::remove_file(&marker)?;
        let elapsed = start.elapsed();

        let documents = self.reader(&index)?.searcher().num_docs();
        tracing::info!(
            documents,
            skipped,
            elapsed_ms = elapsed.as_millis() as u64,
            "Rebuilt search index"
        );

        Ok(RebuildReport {
            documents,
            skipped,
            elapsed,
        })
    }

    /// Index a single invoice, replacing any entry with the same number
    pub fn add(&self, invoice: &Invoice) -> SearchResult<()> {
        if !Self::index_exists(&self.config.index_path) {
            return Err(SearchError::IndexMissing(
                self.config.index_path.display().to_string(),
            ));
        }
        let record = self.extractor.extract(invoice)?;
        self.index_record(&record)
    }

    /// Encrypt an invoice into the workspace and index it.
    ///
    /// Fields are extracted before anything is written, so an invoice whose
    /// date doesn't match its format never reaches the workspace. Without an
    /// index the invoice is still sealed and `indexed` is false.
    pub fn seal(
        &self,
        store: &EncryptedDocumentStore,
        key: &Key,
        invoice: &Invoice,
    ) -> SearchResult<SealReport> {
        let record = self.extractor.extract(invoice)?;
        let path = store.seal(invoice, key)?;

        if !Self::index_exists(&self.config.index_path) {
            tracing::warn!(
                number = %record.number,
                "Invoice sealed but not indexed, no search index exists"
            );
            return Ok(SealReport {
                path,
                indexed: false,
            });
        }
        self.index_record(&record)?;
        Ok(SealReport {
            path,
            indexed: true,
        })
    }

    fn index_record(&self, record: &IndexedInvoiceRecord) -> SearchResult<()> {
        let index = self.open()?;
        let mut writer = self.writer(&index)?;
        self.upsert(&writer, record)?;
        writer.commit().map_err(|e| {
            SearchError::IndexingFailed(format!("Failed to commit document: {}", e))
        })?;
        writer.wait_merging_threads()?;

        tracing::debug!(number = %record.number, "Indexed invoice");
        Ok(())
    }

    /// Get index statistics
    pub fn stats(&self) -> SearchResult<IndexStats> {
        let index = self.open()?;
        let searcher = self.reader(&index)?.searcher();

        // Calculate approximate index size
        let index_size_bytes = std::fs::read_dir(&self.config.index_path)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter_map(|e| e.metadata().ok())
                    .map(|m| m.len())
                    .sum()
            })
            .unwrap_or(0);

        Ok(IndexStats {
            total_documents: searcher.num_docs(),
            index_size_bytes,
            num_segments: searcher.segment_readers().len(),
        })
    }

    fn create(&self) -> SearchResult<Index> {
        std::fs::create_dir_all(&self.config.index_path).map_err(|e| {
            SearchError::IndexInitFailed(format!("Failed to create index directory: {}", e))
        })?;
        Index::create_in_dir(&self.config.index_path, self.schema.clone()).map_err(|e| {
            SearchError::IndexInitFailed(format!("Failed to create new index: {}", e))
        })
    }

    fn writer(&self, index: &Index) -> SearchResult<IndexWriter> {
        index
            .writer_with_num_threads(self.config.indexing_threads, self.config.writer_heap_size)
            .map_err(|e| SearchError::IndexInitFailed(format!("Failed to create writer: {}", e)))
    }

    fn upsert(&self, writer: &IndexWriter, record: &IndexedInvoiceRecord) -> SearchResult<()> {
        writer.delete_term(Term::from_field_text(self.fields.number, record.document_id()));
        writer
            .add_document(record.to_tantivy_doc(&self.fields))
            .map_err(|e| {
                SearchError::IndexingFailed(format!(
                    "Failed to add document {}: {}",
                    record.document_id(),
                    e
                ))
            })?;
        Ok(())
    }
}
