//! Paper record model shared by the fetch, store, and export layers.

use serde::{Deserialize, Serialize};

/// One bibliographic entry.
///
/// Field names serialize exactly as clients see them (`ID`, `Title`, ...),
/// so the same struct backs the JSON snapshot, the CSV export, and every
/// HTTP response body. All fields are always present, possibly empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperRecord {
    /// PubMed identifier (PMID)
    #[serde(rename = "ID")]
    pub id: String,

    /// Paper title
    #[serde(rename = "Title")]
    pub title: String,

    /// Authors as free text (semicolon-separated)
    #[serde(rename = "Authors")]
    pub authors: String,

    /// Journal name
    #[serde(rename = "Journal")]
    pub journal: String,

    /// Publication date in `YYYY-MM-DD` form (not validated)
    #[serde(rename = "Publication Date")]
    pub publication_date: String,
}

impl PaperRecord {
    /// Create a record with the given id and every other field empty.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            authors: String::new(),
            journal: String::new(),
            publication_date: String::new(),
        }
    }
}

/// Find a record by id. Linear scan, first match wins.
///
/// `None` means the id is absent, which is distinct from a found record
/// whose other fields happen to be empty.
pub fn find_by_id<'a>(records: &'a [PaperRecord], id: &str) -> Option<&'a PaperRecord> {
    records.iter().find(|record| record.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, title: &str) -> PaperRecord {
        PaperRecord {
            id: id.to_string(),
            title: title.to_string(),
            authors: "Sample Author".to_string(),
            journal: "Sample Journal".to_string(),
            publication_date: "2025-03-01".to_string(),
        }
    }

    #[test]
    fn test_wire_field_names() {
        let value = serde_json::to_value(record("1", "Sample Title for 1")).unwrap();
        let object = value.as_object().unwrap();

        assert_eq!(object.len(), 5);
        for key in ["ID", "Title", "Authors", "Journal", "Publication Date"] {
            assert!(object.contains_key(key), "missing key {}", key);
        }
        assert_eq!(object["ID"], "1");
        assert_eq!(object["Publication Date"], "2025-03-01");
    }

    #[test]
    fn test_wire_round_trip() {
        let original = record("40064631", "Test Paper");
        let json = serde_json::to_string(&original).unwrap();
        let parsed: PaperRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_find_by_id() {
        let records = vec![record("1", "First"), record("2", "Second")];

        assert_eq!(find_by_id(&records, "2").unwrap().title, "Second");
        assert!(find_by_id(&records, "3").is_none());
    }

    #[test]
    fn test_find_by_id_empty_record_is_found() {
        // A record with empty fields is still "found" - only an absent id
        // yields None.
        let records = vec![PaperRecord::new("1")];

        let found = find_by_id(&records, "1").unwrap();
        assert!(found.title.is_empty());
        assert!(find_by_id(&records, "missing").is_none());
    }
}
