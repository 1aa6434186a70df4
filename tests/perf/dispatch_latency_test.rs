use std::sync::Arc;
use std::time::Instant;

use crate::dispatcher::{DispatchMode, SearchDispatcher};
use crate::index_service::MockIndex;
use crate::model::SearchFilters;
use crate::normalize::RawRecord;

fn p95_ms(samples: &mut [f64]) -> f64 {
    samples.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let last = samples.len().saturating_sub(1);
    let idx = ((last as f64) * 0.95).round() as usize;
    samples[idx.min(last)]
}

fn record(i: usize) -> RawRecord {
    RawRecord {
        id: Some(serde_json::json!(i)),
        name: Some(format!("Document_{i:05}.txt")),
        path: Some(format!("C:\\Docs\\Document_{i:05}.txt")),
        size: Some(serde_json::json!(1_024 + i)),
        modified: Some(serde_json::json!("2024-01-15T10:30:00Z")),
        is_directory: Some(false),
        extension: Some("txt".to_string()),
        ..Default::default()
    }
}

#[test]
fn mock_dispatch_p95_under_75ms() {
    let records: Vec<RawRecord> = (0..5_000).map(record).collect();
    let index = MockIndex::with_records(records).with_max_results(100);
    let mut dispatcher = SearchDispatcher::new(DispatchMode::Mock, Arc::new(index));
    let filters = SearchFilters {
        file_types: vec!["txt".to_string()],
        ..Default::default()
    };

    for _ in 0..5 {
        let _ = dispatcher.dispatch("document_04", &filters);
    }

    let mut samples = Vec::with_capacity(30);
    for _ in 0..30 {
        let start = Instant::now();
        let results = dispatcher.dispatch("document_04", &filters).unwrap_or_default();
        samples.push(start.elapsed().as_secs_f64() * 1000.0);
        assert_eq!(results.len(), 100);
    }

    let p95 = p95_ms(&mut samples);
    assert!(p95 <= 75.0, "mock dispatch p95 too high: {p95:.3}ms (budget 75.0ms)");
}
