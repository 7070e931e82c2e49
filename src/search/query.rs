//! Search query building

use std::ops::Bound;

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use tantivy::query::{AllQuery, BooleanQuery, Occur, Query, RangeQuery};
use tantivy::schema::Field;

use crate::search::config::{SearchConfig, MAX_FUZZINESS};
use crate::search::date_format::QUERY_DATE_FORMAT;
use crate::search::document::{
    midnight_utc, tantivy_date, InvoiceFields, FIELD_AMOUNT, FIELD_DATE,
};
use crate::search::error::{SearchError, SearchResult};
use crate::search::fuzzy::fuzzy_term_query;

/// Structured invoice query.
///
/// Every dimension is optional; an unset dimension adds no filter. All set
/// dimensions must match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceQuery {
    /// Fuzzy match on the customer name
    pub customer: Option<String>,

    /// Fuzzy match on the item descriptions
    pub text: Option<String>,

    /// Inclusive lower bound on the total
    pub amount_ge: Option<f64>,

    /// Inclusive upper bound on the total
    pub amount_le: Option<f64>,

    /// Inclusive first issue date
    pub date_from: Option<NaiveDate>,

    /// Inclusive last issue date
    pub date_to: Option<NaiveDate>,
}

impl InvoiceQuery {
    /// Query matching every invoice
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_customer(mut self, customer: impl Into<String>) -> Self {
        self.customer = Some(customer.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_amount_range(mut self, ge: Option<f64>, le: Option<f64>) -> Self {
        self.amount_ge = ge;
        self.amount_le = le;
        self
    }

    pub fn with_date_range(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.date_from = from;
        self.date_to = to;
        self
    }

    /// Restrict to the last `months` months up to `today`.
    ///
    /// Replaces any explicit date range; `months == 0` leaves the query
    /// unchanged.
    pub fn last_months(mut self, months: u32, today: NaiveDate) -> Self {
        if months > 0 {
            self.date_from = today.checked_sub_months(Months::new(months));
            self.date_to = Some(today);
        }
        self
    }

    /// Whether no dimension is set
    pub fn is_unconstrained(&self) -> bool {
        self == &Self::default()
    }

    /// Human readable summary of the active filters
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(customer) = &self.customer {
            parts.push(format!("customer like {}", customer));
        }
        if let Some(text) = &self.text {
            parts.push(format!("text like {}", text));
        }
        if let Some(from) = self.date_from {
            parts.push(format!("date >= {}", from.format(QUERY_DATE_FORMAT)));
        }
        if let Some(to) = self.date_to {
            parts.push(format!("date <= {}", to.format(QUERY_DATE_FORMAT)));
        }
        if let Some(ge) = self.amount_ge {
            parts.push(format!("amount >= {}", ge));
        }
        if let Some(le) = self.amount_le {
            parts.push(format!("amount <= {}", le));
        }
        if parts.is_empty() {
            "all invoices".to_string()
        } else {
            parts.join(" and ")
        }
    }

    /// Structural checks run before any sub-query is built
    pub fn validate(&self) -> SearchResult<()> {
        for (name, bound) in [("lower", self.amount_ge), ("upper", self.amount_le)] {
            if bound.is_some_and(f64::is_nan) {
                return Err(SearchError::InvalidQuery(format!(
                    "{} amount bound is not a number",
                    name
                )));
            }
        }
        if let (Some(ge), Some(le)) = (self.amount_ge, self.amount_le) {
            if ge > le {
                return Err(SearchError::InvalidQuery(format!(
                    "amount lower bound {} exceeds upper bound {}",
                    ge, le
                )));
            }
        }
        if let (Some(from), Some(to)) = (self.date_from, self.date_to) {
            if from > to {
                return Err(SearchError::InvalidQuery(format!(
                    "date range starts after it ends ({} > {})",
                    from.format(QUERY_DATE_FORMAT),
                    to.format(QUERY_DATE_FORMAT)
                )));
            }
        }
        for (name, value) in [("customer", &self.customer), ("text", &self.text)] {
            if let Some(value) = value {
                if tokenize(value).is_empty() {
                    return Err(SearchError::InvalidQuery(format!(
                        "{} filter {:?} has no searchable terms",
                        name, value
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Translates [`InvoiceQuery`] into a tantivy query
pub struct QueryBuilder {
    fields: InvoiceFields,
    customer_fuzziness: u8,
    text_fuzziness: u8,
}

impl QueryBuilder {
    pub fn new(fields: InvoiceFields, config: &SearchConfig) -> Self {
        Self {
            fields,
            customer_fuzziness: config.customer_fuzziness,
            text_fuzziness: config.text_fuzziness,
        }
    }

    /// Build the conjunction of one sub-query per set dimension.
    ///
    /// Nothing is built when validation fails. An unconstrained query
    /// matches every document.
    pub fn build(&self, query: &InvoiceQuery) -> SearchResult<Box<dyn Query>> {
        query.validate()?;
        for distance in [self.customer_fuzziness, self.text_fuzziness] {
            if distance > MAX_FUZZINESS {
                return Err(SearchError::InvalidQuery(format!(
                    "fuzziness {} exceeds the supported maximum of {}",
                    distance, MAX_FUZZINESS
                )));
            }
        }

        let mut subqueries: Vec<(Occur, Box<dyn Query>)> = Vec::new();

        if let Some(ref customer) = query.customer {
            subqueries.push((
                Occur::Must,
                fuzzy_all_terms(self.fields.customer, customer, self.customer_fuzziness),
            ));
        }

        if let Some(ref text) = query.text {
            subqueries.push((
                Occur::Must,
                fuzzy_all_terms(self.fields.text, text, self.text_fuzziness),
            ));
        }

        if query.amount_ge.is_some() || query.amount_le.is_some() {
            let range = RangeQuery::new_f64_bounds(
                FIELD_AMOUNT.to_string(),
                query.amount_ge.map_or(Bound::Unbounded, Bound::Included),
                query.amount_le.map_or(Bound::Unbounded, Bound::Included),
            );
            subqueries.push((Occur::Must, Box::new(range)));
        }

        if query.date_from.is_some() || query.date_to.is_some() {
            let lower = query
                .date_from
                .map_or(Bound::Unbounded, |d| Bound::Included(tantivy_date(midnight_utc(d))));
            // stored dates sit at midnight, so the day after excludes nothing on `date_to`
            let upper = query.date_to.map_or(Bound::Unbounded, |d| {
                match d.succ_opt() {
                    Some(next) => Bound::Excluded(tantivy_date(midnight_utc(next))),
                    None => Bound::Unbounded,
                }
            });
            let range = RangeQuery::new_date_bounds(FIELD_DATE.to_string(), lower, upper);
            subqueries.push((Occur::Must, Box::new(range)));
        }

        if subqueries.is_empty() {
            Ok(Box::new(AllQuery))
        } else {
            Ok(Box::new(BooleanQuery::from(subqueries)))
        }
    }
}

/// Split like the default tokenizer: lower-cased alphanumeric runs
pub(crate) fn tokenize(value: &str) -> Vec<String> {
    value
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn fuzzy_all_terms(field: Field, value: &str, distance: u8) -> Box<dyn Query> {
    let terms: Vec<(Occur, Box<dyn Query>)> = tokenize(value)
        .into_iter()
        .map(|token| (Occur::Must, fuzzy_term_query(field, &token, distance)))
        .collect();
    Box::new(BooleanQuery::from(terms))
}
