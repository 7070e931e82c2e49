use serde::{Deserialize, Deserializer, Serialize};

/// An invoice descriptor as stored in the workspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    /// Issuer
    pub from: Recipient,

    /// Customer
    pub to: Recipient,

    /// Bank details printed on the invoice
    #[serde(default)]
    pub payment_details: BankCoordinates,

    /// Number and dates
    pub invoice: InvoiceData,

    /// Pricing, tax and formatting settings
    pub settings: InvoiceSettings,

    /// Billed line items
    #[serde(default, deserialize_with = "null_as_empty")]
    pub items: Vec<Item>,

    /// Free-form notes
    #[serde(default, deserialize_with = "null_as_empty")]
    pub notes: Vec<String>,
}

impl Invoice {
    /// Invoice number, also the document identifier
    pub fn number(&self) -> &str {
        &self.invoice.number
    }

    /// Compute `(subtotal, total)`.
    ///
    /// The total adds `vat_rate` percent on top of the subtotal; with a zero
    /// rate both values are equal.
    pub fn totals(&self) -> (f64, f64) {
        let subtotal: f64 = self
            .items
            .iter()
            .map(|item| item.cost(self.settings.items_price).1)
            .sum();

        let mut total = subtotal;
        if self.settings.vat_rate > 0.0 {
            total += total * (self.settings.vat_rate / 100.0);
        }
        (subtotal, total)
    }

    /// Append a line item
    pub fn push_item(&mut self, description: impl Into<String>, quantity: f64, price: f64) {
        self.items.push(Item {
            description: description.into(),
            quantity,
            price,
            quantity_symbol: String::new(),
        });
    }

    /// Date format of this invoice, falling back to `global` when unset
    pub fn date_format<'a>(&'a self, global: &'a str) -> &'a str {
        if self.settings.date_format.trim().is_empty() {
            global
        } else {
            &self.settings.date_format
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub area_code: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub tax_id: String,
    #[serde(default)]
    pub vat_number: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BankCoordinates {
    pub account_holder: String,
    #[serde(rename = "account_bank")]
    pub bank: String,
    #[serde(rename = "account_iban")]
    pub iban: String,
    #[serde(rename = "account_bic")]
    pub bic: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceData {
    pub number: String,
    /// Issue date, written in the invoice's date format
    pub date: String,
    #[serde(default)]
    pub due: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceSettings {
    /// Unit price used by items without their own price
    pub items_price: f64,
    #[serde(default)]
    pub items_quantity_symbol: String,
    /// Tax rate in percent
    pub vat_rate: f64,
    #[serde(default)]
    pub currency_symbol: String,
    #[serde(rename = "lang", default)]
    pub language: String,
    /// `%d`/`%m`/`%y` layout of `InvoiceData::date`; empty means the global one
    #[serde(default)]
    pub date_format: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub description: String,
    pub quantity: f64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub price: f64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub quantity_symbol: String,
}

impl Item {
    /// Return `(unit price, cost)`.
    ///
    /// The quantity is rounded up to the next half unit. Items without a
    /// price of their own are billed at `base_price`.
    pub fn cost(&self, base_price: f64) -> (f64, f64) {
        let quantity = (self.quantity * 2.0).ceil() / 2.0;
        let price = if self.price > 0.0 { self.price } else { base_price };
        (price, price * quantity)
    }
}

/// Older descriptors write empty lists as `null`
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn is_zero(v: &f64) -> bool {
    *v == 0.0
}
