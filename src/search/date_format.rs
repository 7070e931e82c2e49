//! Translation of the `%d`/`%m`/`%y` invoice date formats

use chrono::NaiveDate;

use crate::search::error::{SearchError, SearchResult};

/// Fixed format of dates exchanged with the query surface
pub const QUERY_DATE_FORMAT: &str = "%Y-%m-%d";

/// Date format configured on an invoice, e.g. `%d.%m.%y`.
///
/// `%d` is the two digit day, `%m` the two digit month and `%y` the four
/// digit year. Everything else is literal text. The same translation is used
/// for parsing when indexing and for formatting when rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFormat {
    pattern: String,
    layout: String,
}

impl DateFormat {
    pub fn new(pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        let layout = to_layout(&pattern);
        Self { pattern, layout }
    }

    /// The format as configured by the operator
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The equivalent chrono layout
    pub fn layout(&self) -> &str {
        &self.layout
    }

    /// Parse a date written in this format
    pub fn parse(&self, raw: &str) -> SearchResult<NaiveDate> {
        NaiveDate::parse_from_str(raw.trim(), &self.layout).map_err(|_| SearchError::DateParse {
            raw: raw.to_string(),
            format: self.pattern.clone(),
        })
    }

    /// Render a date in this format
    pub fn format(&self, date: NaiveDate) -> String {
        date.format(&self.layout).to_string()
    }
}

/// Parse a `YYYY-MM-DD` date from the query surface
pub fn parse_query_date(raw: &str) -> SearchResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), QUERY_DATE_FORMAT).map_err(|_| SearchError::DateParse {
        raw: raw.to_string(),
        format: "YYYY-MM-DD".to_string(),
    })
}

/// Lexical translation to chrono's strftime layout.
///
/// Unknown `%` sequences are escaped so they stay literal.
fn to_layout(pattern: &str) -> String {
    let mut layout = String::with_capacity(pattern.len() + 4);
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            layout.push(c);
            continue;
        }
        match chars.peek() {
            Some('d') => layout.push_str("%d"),
            Some('m') => layout.push_str("%m"),
            Some('y') => layout.push_str("%Y"),
            _ => {
                layout.push_str("%%");
                continue;
            }
        }
        chars.next();
    }
    layout
}
