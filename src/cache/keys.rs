//! Cache key derivation for task listings.
//!
//! A key is the configured prefix followed by a canonical rendering of the
//! query: filters sorted by field name and form-encoded, then the page and
//! page size. Every listing key shares the prefix, which is what coarse
//! invalidation deletes by.

use sha2::{Digest, Sha256};
use url::form_urlencoded;

use crate::application::query::TaskQuery;

pub const DEFAULT_LISTING_PREFIX: &str = "tasks:list:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingKeyEncoder {
    prefix: String,
    hash: bool,
}

impl Default for ListingKeyEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_LISTING_PREFIX, false)
    }
}

impl ListingKeyEncoder {
    pub fn new(prefix: impl Into<String>, hash: bool) -> Self {
        Self {
            prefix: prefix.into(),
            hash,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn encode(&self, query: &TaskQuery) -> String {
        let canonical = canonical_query(query);
        if self.hash {
            let digest = Sha256::digest(canonical.as_bytes());
            format!("{}{}", self.prefix, hex::encode(digest.as_slice()))
        } else {
            format!("{}{}", self.prefix, canonical)
        }
    }
}

/// Deterministic textual form of a query.
///
/// Filter values are form-encoded, so the `|` separators cannot appear inside
/// them and distinct queries never render the same string.
fn canonical_query(query: &TaskQuery) -> String {
    let mut filters = form_urlencoded::Serializer::new(String::new());
    for (field, value) in &query.filters {
        filters.append_pair(field.as_str(), value);
    }
    format!(
        "{}|page={}|per_page={}",
        filters.finish(),
        query.page,
        query.per_page
    )
}
