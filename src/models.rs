//! Data models for scraped articles.
//!
//! This module defines the core data structure produced by the pipeline:
//! - [`ArticleRecord`]: per-article extraction result, built up field by
//!   field as extraction stages succeed
//!
//! Records are keyed by [`url_hash`], a SHA-256 digest of the article URL
//! that doubles as the storage filename and the dedup key. A record is
//! *complete* when every content field was successfully extracted; the
//! distinction drives the `complete`/`incomplete` storage partition.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Compute the stable storage/dedup key for an article URL.
///
/// Equal URLs always produce equal hashes, so concurrent writers for the
/// same URL converge on the same storage key.
pub fn url_hash(url: &str) -> String {
    format!("{:x}", Sha256::digest(url.as_bytes()))
}

/// Extraction result for a single article URL.
///
/// Every content field is optional: a bounded wait that times out leaves its
/// field as `None` and extraction carries on (best-effort field
/// independence). The record is mutated stage by stage inside the extractor
/// and becomes immutable once handed to the store.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArticleRecord {
    /// The article URL this record was extracted from.
    pub url: String,
    /// SHA-256 hex digest of `url`; the sole storage and dedup key.
    pub url_hash: String,
    /// Article headline text.
    pub title: Option<String>,
    /// Publication timestamp as displayed on the page.
    pub datetime: Option<String>,
    /// Article body text.
    pub content: Option<String>,
    /// Moodmeter reactions: label mapped to a percentage (or raw count when
    /// read from the votes API).
    pub moods: Option<BTreeMap<String, String>>,
}

impl ArticleRecord {
    /// Create an empty record for `url` with its hash computed up front.
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            url_hash: url_hash(url),
            title: None,
            datetime: None,
            content: None,
            moods: None,
        }
    }

    /// True iff every content field was extracted.
    ///
    /// Any `None` field, including `moods`, routes the record to the
    /// `incomplete` partition.
    pub fn is_complete(&self) -> bool {
        self.title.is_some()
            && self.datetime.is_some()
            && self.content.is_some()
            && self.moods.is_some()
    }
}
