//! Search document structures and field extraction

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tantivy::schema::*;
use tantivy::TantivyDocument;

use crate::models::Invoice;
use crate::search::date_format::DateFormat;
use crate::search::error::{SearchError, SearchResult};

pub const FIELD_NUMBER: &str = "number";
pub const FIELD_CUSTOMER: &str = "customer";
pub const FIELD_TEXT: &str = "text";
pub const FIELD_AMOUNT: &str = "amount";
pub const FIELD_DATE: &str = "date";

/// Trait for documents that can be indexed and searched
pub trait SearchDocument {
    /// Convert to Tantivy document
    fn to_tantivy_doc(&self, fields: &InvoiceFields) -> TantivyDocument;

    /// Get document ID
    fn document_id(&self) -> &str;
}

/// Flat projection of an invoice as stored in the index.
///
/// Always rebuilt from the decrypted descriptor, never persisted elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedInvoiceRecord {
    /// Invoice number, doubles as the document id
    pub number: String,

    /// Customer name
    pub customer: String,

    /// Total including tax
    pub amount: f64,

    /// Issue date at midnight UTC
    pub date: DateTime<Utc>,

    /// Lower-cased item descriptions joined by spaces
    pub text: String,
}

impl SearchDocument for IndexedInvoiceRecord {
    fn to_tantivy_doc(&self, fields: &InvoiceFields) -> TantivyDocument {
        let mut doc = TantivyDocument::new();
        doc.add_text(fields.number, &self.number);
        doc.add_text(fields.customer, &self.customer);
        doc.add_text(fields.text, &self.text);
        doc.add_f64(fields.amount, self.amount);
        doc.add_date(fields.date, tantivy_date(self.date));
        doc
    }

    fn document_id(&self) -> &str {
        &self.number
    }
}

/// Builds [`IndexedInvoiceRecord`]s from decrypted invoices
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    default_date_format: String,
}

impl FieldExtractor {
    /// `default_date_format` applies to invoices without their own format
    pub fn new(default_date_format: impl Into<String>) -> Self {
        Self {
            default_date_format: default_date_format.into(),
        }
    }

    pub fn extract(&self, invoice: &Invoice) -> SearchResult<IndexedInvoiceRecord> {
        let format = DateFormat::new(invoice.date_format(&self.default_date_format));
        let date = format.parse(&invoice.invoice.date)?;
        let (_, total) = invoice.totals();

        let text = invoice
            .items
            .iter()
            .map(|item| item.description.to_lowercase())
            .collect::<Vec<_>>()
            .join(" ");

        Ok(IndexedInvoiceRecord {
            number: invoice.invoice.number.clone(),
            customer: invoice.to.name.clone(),
            amount: total,
            date: midnight_utc(date),
            text,
        })
    }
}

/// Resolved field handles of the invoice schema
#[derive(Debug, Clone, Copy)]
pub struct InvoiceFields {
    pub number: Field,
    pub customer: Field,
    pub text: Field,
    pub amount: Field,
    pub date: Field,
}

impl InvoiceFields {
    pub fn from_schema(schema: &Schema) -> SearchResult<Self> {
        let field = |name: &str| {
            schema
                .get_field(name)
                .map_err(|e| SearchError::SchemaError(format!("missing field {}: {}", name, e)))
        };
        Ok(Self {
            number: field(FIELD_NUMBER)?,
            customer: field(FIELD_CUSTOMER)?,
            text: field(FIELD_TEXT)?,
            amount: field(FIELD_AMOUNT)?,
            date: field(FIELD_DATE)?,
        })
    }
}

/// Build the search schema for invoices
pub fn build_invoice_schema() -> Schema {
    let mut schema_builder = Schema::builder();

    // Number - exact match, used as document id
    schema_builder.add_text_field(FIELD_NUMBER, STRING | STORED | FAST);

    // Customer - tokenized for fuzzy matching, stored for display
    schema_builder.add_text_field(FIELD_CUSTOMER, TEXT | STORED);

    // Item descriptions - tokenized only
    schema_builder.add_text_field(FIELD_TEXT, TEXT);

    // Total amount - numeric range queries and aggregation
    schema_builder.add_f64_field(FIELD_AMOUNT, INDEXED | STORED | FAST);

    // Issue date - range queries and sorting
    schema_builder.add_date_field(FIELD_DATE, INDEXED | STORED | FAST);

    schema_builder.build()
}

pub(crate) fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

pub(crate) fn tantivy_date(date: DateTime<Utc>) -> tantivy::DateTime {
    tantivy::DateTime::from_timestamp_secs(date.timestamp())
}
