//! Shared fixtures for the integration tests

#![allow(dead_code)]

use invoice_vault::crypto::Key;
use invoice_vault::models::{Invoice, InvoiceData, InvoiceSettings, Recipient};
use invoice_vault::search::{SearchConfig, SearchConfigBuilder};
use invoice_vault::store::EncryptedDocumentStore;
use std::path::PathBuf;
use tempfile::TempDir;

pub const PASSWORD: &str = "correct horse";

/// A temporary workspace with its own index directory
pub struct Fixture {
    pub dir: TempDir,
    pub store: EncryptedDocumentStore,
    pub key: Key,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let store = EncryptedDocumentStore::new(dir.path().join("workspace"));
        std::fs::create_dir_all(store.workspace()).unwrap();
        Self {
            dir,
            store,
            key: Key::derive(PASSWORD).unwrap(),
        }
    }

    pub fn index_path(&self) -> PathBuf {
        self.dir.path().join("index")
    }

    pub fn search_config(&self) -> SearchConfig {
        SearchConfigBuilder::new().index_path(self.index_path()).build()
    }

    /// Encrypt `invoice` into the workspace with the fixture key
    pub fn seal(&self, invoice: &Invoice) -> PathBuf {
        self.store.seal(invoice, &self.key).unwrap()
    }
}

/// Invoice with a single item billed at `amount`, no tax, dated `%y-%m-%d`
pub fn invoice(number: &str, customer: &str, date: &str, amount: f64, description: &str) -> Invoice {
    let mut invoice = Invoice {
        from: Recipient {
            name: "Jane Freelancer".into(),
            ..Default::default()
        },
        to: Recipient {
            name: customer.into(),
            ..Default::default()
        },
        payment_details: Default::default(),
        invoice: InvoiceData {
            number: number.into(),
            date: date.into(),
            due: String::new(),
        },
        settings: InvoiceSettings {
            items_price: 0.0,
            vat_rate: 0.0,
            currency_symbol: "EUR".into(),
            date_format: "%y-%m-%d".into(),
            ..Default::default()
        },
        items: vec![],
        notes: vec![],
    };
    invoice.push_item(description, 1.0, amount);
    invoice
}

/// The three invoices of the reference workspace
pub fn reference_invoices() -> Vec<Invoice> {
    vec![
        invoice("0000001", "Brauerei Hecht", "2016-06-27", 100.0, "Web development"),
        invoice("0000002", "Acme Corporation", "2016-09-01", 500.0, "Server maintenance"),
        invoice("0000003", "Brauerei Hecht", "2017-01-05", 2000.0, "Web shop redesign"),
    ]
}

/// Descriptor as older releases wrote it: `notes` is `null`, plus a `dailytime` block
pub const LEGACY_DESCRIPTOR: &str = r#"{"from":{"name":"Jane Freelancer","address":"","city":"","area_code":"","country":"","tax_id":"","vat_number":"","email":""},"to":{"name":"Brauerei Hecht","address":"","city":"","area_code":"","country":"","tax_id":"","vat_number":"","email":""},"payment_details":{"account_holder":"","account_bank":"","account_iban":"","account_bic":""},"invoice":{"number":"0000009","date":"2016-10-10","due":""},"settings":{"items_price":45,"items_quantity_symbol":"","vat_rate":0,"currency_symbol":"EUR","lang":"en","date_format":"%y-%m-%d"},"dailytime":{"enabled":false},"items":[{"description":"Web development","quantity":2,"price":0,"quantity_symbol":""}],"notes":null}"#;

impl Fixture {
    /// Encrypt the raw legacy descriptor into the workspace as invoice 0000009
    pub fn write_legacy(&self) -> PathBuf {
        let blob = invoice_vault::crypto::encrypt(&self.key, LEGACY_DESCRIPTOR.as_bytes()).unwrap();
        let path = self.store.path_for("0000009");
        std::fs::write(&path, blob).unwrap();
        path
    }
}
