//! Mock fetcher for testing purposes.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::fetch::PaperFetcher;
use crate::models::PaperRecord;

/// A mock fetcher that returns a predefined record set.
#[derive(Debug, Default)]
pub struct MockFetcher {
    papers: Mutex<Option<Vec<PaperRecord>>>,
}

impl MockFetcher {
    /// Create a new mock fetcher.
    pub fn new() -> Self {
        Self {
            papers: Mutex::new(None),
        }
    }

    /// Set the records to return from [`PaperFetcher::fetch`].
    pub fn set_papers(&self, papers: Vec<PaperRecord>) {
        let mut guard = self.papers.lock().unwrap();
        *guard = Some(papers);
    }

    /// Clear the configured records.
    pub fn clear(&self) {
        let mut guard = self.papers.lock().unwrap();
        *guard = None;
    }
}

#[async_trait]
impl PaperFetcher for MockFetcher {
    async fn fetch(&self, _query: &str, max_results: usize) -> Vec<PaperRecord> {
        let guard = self.papers.lock().unwrap();
        match &*guard {
            Some(papers) => papers.iter().take(max_results).cloned().collect(),
            None => Vec::new(),
        }
    }
}

/// Helper function to create a record for testing.
pub fn make_paper(id: &str, title: &str) -> PaperRecord {
    PaperRecord {
        id: id.to_string(),
        title: title.to_string(),
        authors: "Sample Author".to_string(),
        journal: "Sample Journal".to_string(),
        publication_date: "2025-03-01".to_string(),
    }
}
