//! Query execution against the invoice index

use std::cmp::Ordering;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tantivy::collector::DocSetCollector;
use tantivy::schema::Value;
use tantivy::TantivyDocument;

use crate::search::config::SearchConfig;
use crate::search::error::{SearchError, SearchResult};
use crate::search::index::{IndexState, SearchIndexManager};
use crate::search::query::{InvoiceQuery, QueryBuilder};

/// A single search result hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Invoice number
    pub number: String,

    /// Customer name
    pub customer: String,

    /// Total including tax
    pub amount: f64,

    /// Issue date
    pub date: DateTime<Utc>,
}

/// Search response with results and metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Hits sorted by date descending, then number ascending
    pub entries: Vec<SearchHit>,

    /// Number of matching documents, before the page cap
    pub total_hits: usize,

    /// Time spent executing the query
    pub elapsed: Duration,

    /// Sum of `amount` over `entries`
    pub total_amount: f64,
}

/// Executes [`InvoiceQuery`]s against a built index
pub struct QueryEngine {
    /// Index manager
    index_manager: SearchIndexManager,
}

impl QueryEngine {
    pub fn new(config: SearchConfig) -> SearchResult<Self> {
        Ok(Self {
            index_manager: SearchIndexManager::new(config)?,
        })
    }

    /// Wrap an existing manager
    pub fn with_manager(index_manager: SearchIndexManager) -> Self {
        Self { index_manager }
    }

    pub fn index_manager(&self) -> &SearchIndexManager {
        &self.index_manager
    }

    /// Search for invoices.
    ///
    /// Returns at most `page_size` hits. `total_hits` counts every match.
    pub fn search(&self, query: &InvoiceQuery) -> SearchResult<SearchResponse> {
        let start_time = Instant::now();
        let config = self.index_manager.config();

        let query_builder = QueryBuilder::new(*self.index_manager.fields(), config);
        let tantivy_query = query_builder.build(query)?;

        match self.index_manager.state() {
            IndexState::Absent => {
                return Err(SearchError::IndexNotFound(
                    config.index_path.display().to_string(),
                ));
            }
            IndexState::Building => {
                tracing::warn!("Index rebuild unfinished, results may be incomplete");
            }
            IndexState::Ready => {}
        }
        let index = self.index_manager.open()?;
        let searcher = self.index_manager.reader(&index)?.searcher();

        let addresses = searcher
            .search(&*tantivy_query, &DocSetCollector)
            .map_err(|e| SearchError::SearchFailed(format!("Search execution failed: {}", e)))?;
        let total_hits = addresses.len();

        let mut entries = Vec::with_capacity(total_hits);
        for address in addresses {
            let doc: TantivyDocument = searcher
                .doc(address)
                .map_err(|e| SearchError::SearchFailed(format!("Failed to retrieve doc: {}", e)))?;
            entries.push(self.doc_to_search_hit(&doc)?);
        }

        entries.sort_by(compare_hits);
        entries.truncate(config.page_size);
        let total_amount = entries.iter().map(|hit| hit.amount).sum();
        let elapsed = start_time.elapsed();

        tracing::debug!(
            query = %query.describe(),
            total_hits,
            returned = entries.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Executed invoice search"
        );

        Ok(SearchResponse {
            entries,
            total_hits,
            elapsed,
            total_amount,
        })
    }

    /// Convert Tantivy document to SearchHit
    fn doc_to_search_hit(&self, doc: &TantivyDocument) -> SearchResult<SearchHit> {
        let fields = self.index_manager.fields();
        let missing = |name: &str| SearchError::SearchFailed(format!("stored field {} is missing", name));

        let number = doc
            .get_first(fields.number)
            .and_then(|v| v.as_str())
            .ok_or_else(|| missing("number"))?
            .to_string();
        let customer = doc
            .get_first(fields.customer)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let amount = doc
            .get_first(fields.amount)
            .and_then(|v| v.as_f64())
            .ok_or_else(|| missing("amount"))?;
        let date = doc
            .get_first(fields.date)
            .and_then(|v| v.as_datetime())
            .and_then(|d| DateTime::from_timestamp(d.into_timestamp_secs(), 0))
            .ok_or_else(|| missing("date"))?;

        Ok(SearchHit {
            number,
            customer,
            amount,
            date,
        })
    }
}

/// Newest first, ties broken by number
fn compare_hits(a: &SearchHit, b: &SearchHit) -> Ordering {
    b.date.cmp(&a.date).then_with(|| a.number.cmp(&b.number))
}
