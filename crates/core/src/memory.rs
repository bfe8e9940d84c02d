//! Memory records and the two capabilities built on them.
//!
//! - [`MemoryStore`] appends immutable records (no update or delete path).
//! - [`MemorySearch`] finds records by case-sensitive substring over the
//!   content and each tag, most recent first.
//!
//! Validation, NFKC normalization, id generation and ordering live here so
//! every backend applies exactly the same rules.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

use crate::error::{OathError, StorageError};

/// A single stored memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Unique ID, assigned at creation and never reused
    pub id: String,

    /// NFKC-normalized text, never empty
    pub content: String,

    /// Labels in caller order
    #[serde(default)]
    pub tags: Vec<String>,

    /// Creation time in seconds since the Unix epoch
    #[serde(rename = "ts", alias = "timestamp")]
    pub timestamp: f64,
}

impl MemoryRecord {
    /// Validate and normalize caller input into a fresh record.
    ///
    /// Content must contain something other than whitespace. The stored text
    /// is the NFKC form of the input, untrimmed.
    pub fn new(content: &str, tags: &[String]) -> Result<Self, OathError> {
        if content.trim().is_empty() {
            return Err(OathError::validation("content must not be empty"));
        }

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            content: normalize(content),
            tags: tags.iter().map(|t| normalize(t)).collect(),
            timestamp: now_epoch_secs(),
        })
    }

    /// Substring containment over content and every individual tag.
    pub fn matches(&self, needle: &str) -> bool {
        self.content.contains(needle) || self.tags.iter().any(|t| t.contains(needle))
    }
}

/// Canonical compatibility composition (NFKC).
pub fn normalize(text: &str) -> String {
    text.nfkc().collect()
}

/// Current time as fractional seconds, microsecond resolution.
pub fn now_epoch_secs() -> f64 {
    let now = Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1_000_000.0
}

/// Most recent first; equal timestamps fall back to ascending id.
pub fn recent_first(a: &MemoryRecord, b: &MemoryRecord) -> Ordering {
    b.timestamp
        .total_cmp(&a.timestamp)
        .then_with(|| a.id.cmp(&b.id))
}

/// A validated search request.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    /// NFKC-normalized needle (may be blank)
    pub text: String,

    /// Maximum number of results, already range-checked
    pub limit: usize,
}

impl SearchQuery {
    /// Build a query, rejecting limits outside `1..=max_limit`.
    pub fn new(text: &str, limit: usize, max_limit: usize) -> Result<Self, OathError> {
        if limit == 0 || limit > max_limit {
            return Err(OathError::validation(format!(
                "limit must be between 1 and {max_limit}, got {limit}"
            )));
        }
        Ok(Self {
            text: normalize(text),
            limit,
        })
    }

    /// Blank queries match nothing.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Append-only durable record storage.
///
/// Implementations: SQLite (production), in-memory (tests, ephemeral runs).
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "in_memory").
    fn name(&self) -> &str;

    /// Persist a prepared record. Must never overwrite an existing id.
    async fn insert(&self, record: MemoryRecord) -> std::result::Result<(), StorageError>;

    /// Get a memory by ID.
    async fn get(&self, id: &str) -> std::result::Result<Option<MemoryRecord>, StorageError>;

    /// Get total memory count.
    async fn count(&self) -> std::result::Result<usize, StorageError>;

    /// Can the store currently be read?
    async fn health(&self) -> bool {
        self.count().await.is_ok()
    }

    /// Validate, normalize, and persist a new memory; returns its id.
    async fn store(&self, content: &str, tags: &[String]) -> std::result::Result<String, OathError> {
        let record = MemoryRecord::new(content, tags)?;
        let id = record.id.clone();
        self.insert(record).await?;
        Ok(id)
    }
}

/// Retrieval capability consumed by Compose.
///
/// The only implementation today is plain substring matching; a ranked or
/// indexed search can replace it without touching the composer.
#[async_trait]
pub trait MemorySearch: Send + Sync {
    /// Largest `limit` this search accepts.
    fn max_limit(&self) -> usize;

    /// Run an already validated query.
    async fn search_query(
        &self,
        query: &SearchQuery,
    ) -> std::result::Result<Vec<MemoryRecord>, StorageError>;

    /// Validate `limit`, then search. Blank queries return no results.
    async fn search(
        &self,
        text: &str,
        limit: usize,
    ) -> std::result::Result<Vec<MemoryRecord>, OathError> {
        let query = SearchQuery::new(text, limit, self.max_limit())?;
        if query.is_blank() {
            return Ok(Vec::new());
        }
        Ok(self.search_query(&query).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, content: &str, ts: f64) -> MemoryRecord {
        MemoryRecord {
            id: id.into(),
            content: content.into(),
            tags: vec![],
            timestamp: ts,
        }
    }

    #[test]
    fn new_record_rejects_blank_content() {
        assert!(matches!(
            MemoryRecord::new("", &[]),
            Err(OathError::Validation(_))
        ));
        assert!(matches!(
            MemoryRecord::new(" \n\t ", &[]),
            Err(OathError::Validation(_))
        ));
    }

    #[test]
    fn new_record_keeps_surrounding_whitespace() {
        let r = MemoryRecord::new("  buy milk  ", &["errand".into()]).unwrap();
        assert_eq!(r.content, "  buy milk  ");
        assert_eq!(r.tags, vec!["errand"]);
        assert!(!r.id.is_empty());
        assert!(r.timestamp > 0.0);
    }

    #[test]
    fn new_record_applies_nfkc() {
        // Fullwidth letters and the "ﬁ" ligature fold to their ASCII forms.
        let r = MemoryRecord::new("ｈｅｌｌｏ ﬁle", &["ｔａｇ".into()]).unwrap();
        assert_eq!(r.content, "hello file");
        assert_eq!(r.tags, vec!["tag"]);
    }

    #[test]
    fn ids_are_unique() {
        let a = MemoryRecord::new("a", &[]).unwrap();
        let b = MemoryRecord::new("a", &[]).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn matches_content_and_individual_tags() {
        let mut r = record("1", "Buy milk", 1.0);
        r.tags = vec!["errand".into(), "home".into()];
        assert!(r.matches("milk"));
        assert!(r.matches("rran"));
        assert!(r.matches("home"));
        assert!(!r.matches("buy"), "matching is case-sensitive");
        assert!(!r.matches("errandhome"), "tags are matched one at a time");
    }

    #[test]
    fn recent_first_orders_by_time_then_id() {
        let mut v = vec![
            record("b", "x", 1.0),
            record("c", "x", 2.0),
            record("a", "x", 1.0),
        ];
        v.sort_by(recent_first);
        let ids: Vec<&str> = v.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn query_limit_bounds() {
        assert!(SearchQuery::new("x", 0, 100).is_err());
        assert!(SearchQuery::new("x", 101, 100).is_err());
        assert_eq!(SearchQuery::new("x", 100, 100).unwrap().limit, 100);
    }

    #[test]
    fn blank_query_detected() {
        assert!(SearchQuery::new("   ", 5, 100).unwrap().is_blank());
        assert!(!SearchQuery::new(" a ", 5, 100).unwrap().is_blank());
    }

    #[test]
    fn record_serializes_timestamp_as_ts() {
        let json = serde_json::to_value(record("m1", "hello", 12.5)).unwrap();
        assert_eq!(json["ts"], 12.5);
        assert!(json.get("timestamp").is_none());
    }
}
