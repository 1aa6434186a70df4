use std::time::Instant;

use serde_json::json;

use crate::contract::SearchResponse;
use crate::filters::{BackendFilters, FilterMatcher};
use crate::normalize::{normalize_record, RawRecord};

pub const DEFAULT_MOCK_MAX_RESULTS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    #[error("index service unavailable: {0}")]
    Unavailable(String),
    #[error("index service is still initializing")]
    NotReady,
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("index service error: {0}")]
    Backend(String),
}

/// The capability set the launcher needs from a file index.
pub trait IndexService: Send + Sync {
    fn check_ready(&self) -> bool;
    fn search(&self, query: &str, filters: &BackendFilters) -> Result<SearchResponse, IndexError>;
}

/// In-memory index over a fixed sample set. Always ready.
pub struct MockIndex {
    records: Vec<RawRecord>,
    max_results: usize,
}

impl Default for MockIndex {
    fn default() -> Self {
        Self::with_records(sample_records())
    }
}

impl MockIndex {
    pub fn with_records(records: Vec<RawRecord>) -> Self {
        Self {
            records,
            max_results: DEFAULT_MOCK_MAX_RESULTS,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }
}

impl IndexService for MockIndex {
    fn check_ready(&self) -> bool {
        true
    }

    fn search(&self, query: &str, filters: &BackendFilters) -> Result<SearchResponse, IndexError> {
        let started = Instant::now();
        let matcher = FilterMatcher::new(query, filters)?;

        let matched: Vec<&RawRecord> = self
            .records
            .iter()
            .filter(|record| normalize_record(record).is_some_and(|entry| matcher.matches(&entry)))
            .collect();
        let total_count = matched.len() as u64;
        let entries = matched
            .into_iter()
            .take(self.max_results)
            .cloned()
            .collect();

        Ok(SearchResponse {
            entries,
            total_count,
            query_time_ms: started.elapsed().as_millis() as u64,
        })
    }
}

/// Sample set served in mock mode, in the shape the desktop front end used
/// for browser development.
pub fn sample_records() -> Vec<RawRecord> {
    [
        json!({
            "id": "1",
            "name": "Project Documentation.pdf",
            "path": "C:\\Users\\Documents\\Project Documentation.pdf",
            "size": 2_621_440,
            "modified": "2024-01-15",
            "type": "file",
            "extension": "pdf"
        }),
        json!({
            "id": "2",
            "name": "src",
            "path": "C:\\Users\\Projects\\myapp\\src",
            "size": 0,
            "modified": "2024-01-20",
            "type": "folder"
        }),
        json!({
            "id": "3",
            "name": "config.json",
            "path": "C:\\Users\\AppData\\config.json",
            "size": 5_120,
            "modified": "2024-01-22",
            "type": "file",
            "extension": "json"
        }),
        json!({
            "id": "4",
            "name": "image.png",
            "path": "C:\\Users\\Pictures\\image.png",
            "size": 1_258_291,
            "modified": "2024-01-18",
            "type": "file",
            "extension": "png"
        }),
        json!({
            "id": "5",
            "name": "video.mp4",
            "path": "C:\\Users\\Videos\\video.mp4",
            "size": 104_857_600,
            "modified": "2024-01-10",
            "type": "file",
            "extension": "mp4"
        }),
        json!({
            "id": "6",
            "name": ".gitignore",
            "path": "C:\\Users\\Projects\\myapp\\.gitignore",
            "size": 64,
            "modified": "2024-01-20",
            "type": "file",
            "extension": "gitignore"
        }),
    ]
    .into_iter()
    .filter_map(|value| serde_json::from_value(value).ok())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::{sample_records, IndexService, MockIndex};
    use crate::filters::BackendFilters;

    #[test]
    fn sample_set_is_complete() {
        assert_eq!(sample_records().len(), 6);
    }

    #[test]
    fn mock_search_keeps_sample_order() {
        let index = MockIndex::default();
        let response = index.search("o", &BackendFilters::default()).unwrap();

        let ids: Vec<String> = response
            .entries
            .iter()
            .map(|record| record.id.as_ref().unwrap().as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["1", "3", "5"]);
        assert_eq!(response.total_count, 3);
    }

    #[test]
    fn mock_search_caps_results_but_reports_total() {
        let index = MockIndex::default().with_max_results(1);
        let response = index.search("", &BackendFilters::default()).unwrap();

        assert_eq!(response.entries.len(), 1);
        assert_eq!(response.total_count, 5);
    }

    #[test]
    fn hidden_sample_needs_include_hidden() {
        let index = MockIndex::default();
        let filters = BackendFilters {
            include_hidden: true,
            ..Default::default()
        };

        assert!(index.search("git", &BackendFilters::default()).unwrap().entries.is_empty());
        assert_eq!(index.search("git", &filters).unwrap().entries.len(), 1);
    }
}
