//! Search configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use validator::Validate;

/// Largest edit distance accepted for fuzzy matching
pub const MAX_FUZZINESS: u8 = 4;

/// Smallest writer heap tantivy accepts per indexing thread
pub const MIN_WRITER_HEAP_PER_THREAD: usize = 15_000_000;

/// Search index configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SearchConfig {
    /// Path to the search index directory
    pub index_path: PathBuf,

    /// Date format used by invoices that don't set their own
    #[validate(length(min = 2))]
    pub default_date_format: String,

    /// Index writer heap size in bytes (default: 50MB)
    #[validate(range(min = 15000000))]
    pub writer_heap_size: usize,

    /// Number of threads for indexing
    #[validate(range(min = 1, max = 8))]
    pub indexing_threads: usize,

    /// Documents per commit during a rebuild
    #[validate(range(min = 1))]
    pub batch_size: usize,

    /// Maximum hits returned by a search
    #[validate(range(min = 1, max = 10000))]
    pub page_size: usize,

    /// Edit distance tolerated on the customer name
    #[validate(range(max = 4))]
    pub customer_fuzziness: u8,

    /// Edit distance tolerated on item descriptions
    #[validate(range(max = 4))]
    pub text_fuzziness: u8,
}

impl SearchConfig {
    /// Heap handed to each indexing thread
    pub fn heap_per_thread(&self) -> usize {
        self.writer_heap_size / self.indexing_threads.max(1)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            index_path: crate::config::config_home().join("index.tantivy"),
            default_date_format: "%d.%m.%y".to_string(),
            writer_heap_size: 50_000_000, // 50MB
            indexing_threads: 1,
            batch_size: 100,
            page_size: 50,
            customer_fuzziness: 2,
            text_fuzziness: 4,
        }
    }
}

/// Builder for SearchConfig
pub struct SearchConfigBuilder {
    config: SearchConfig,
}

impl SearchConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SearchConfig::default(),
        }
    }

    pub fn index_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.index_path = path.into();
        self
    }

    pub fn default_date_format(mut self, format: impl Into<String>) -> Self {
        self.config.default_date_format = format.into();
        self
    }

    pub fn writer_heap_size(mut self, size: usize) -> Self {
        self.config.writer_heap_size = size;
        self
    }

    pub fn indexing_threads(mut self, threads: usize) -> Self {
        self.config.indexing_threads = threads;
        self
    }

    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = size;
        self
    }

    pub fn page_size(mut self, size: usize) -> Self {
        self.config.page_size = size;
        self
    }

    pub fn customer_fuzziness(mut self, distance: u8) -> Self {
        self.config.customer_fuzziness = distance;
        self
    }

    pub fn text_fuzziness(mut self, distance: u8) -> Self {
        self.config.text_fuzziness = distance;
        self
    }

    pub fn build(self) -> SearchConfig {
        self.config
    }
}

impl Default for SearchConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
