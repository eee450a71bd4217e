//! Core data models used throughout reg-census.
//!
//! These types represent the agency references, count results, and persisted
//! metrics rows that flow through the ingestion and aggregation pipeline.

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};

/// One agency's claim to a subtree of the regulatory corpus.
///
/// `title` names the document; `chapter` and `part` optionally narrow the
/// claim to a subdivision. Additional keys in the upstream feed (subtitle,
/// subchapter, ...) are ignored — navigation is title → chapter → part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CfrReference {
    pub title: u32,
    #[serde(default, deserialize_with = "de_identifier")]
    pub chapter: Option<String>,
    #[serde(default, deserialize_with = "de_identifier")]
    pub part: Option<String>,
}

/// The upstream feed encodes subdivision identifiers inconsistently: chapters
/// are roman-numeral strings, parts may be bare numbers. Navigation compares
/// identifiers as strings, so both forms normalize to `String` here.
fn de_identifier<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Section and word totals for one located subtree.
///
/// Deterministic for a given (document content, reference) pair, which is
/// what licenses caching these on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CountResult {
    pub section_count: u64,
    pub word_count: u64,
}

impl CountResult {
    pub fn add(&mut self, other: CountResult) {
        self.section_count += other.section_count;
        self.word_count += other.word_count;
    }
}

/// One persisted metrics row, keyed by agency name.
#[derive(Debug, Clone, Serialize)]
pub struct AgencyMetrics {
    pub name: String,
    pub scope: serde_json::Value,
    pub section_count: i64,
    pub word_count: i64,
    pub updated_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_accepts_numeric_and_string_identifiers() {
        let r: CfrReference =
            serde_json::from_str(r#"{"title": 2, "chapter": "XXX", "part": 3000}"#).unwrap();
        assert_eq!(r.title, 2);
        assert_eq!(r.chapter.as_deref(), Some("XXX"));
        assert_eq!(r.part.as_deref(), Some("3000"));
    }

    #[test]
    fn reference_ignores_unknown_levels() {
        let r: CfrReference = serde_json::from_str(r#"{"title": 7, "subtitle": "A"}"#).unwrap();
        assert_eq!(r.title, 7);
        assert_eq!(r.chapter, None);
        assert_eq!(r.part, None);
    }
}
