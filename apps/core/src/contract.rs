use serde::{Deserialize, Serialize};

use crate::filters::BackendFilters;
use crate::normalize::RawRecord;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub filters: BackendFilters,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchResponse {
    #[serde(default)]
    pub entries: Vec<RawRecord>,
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub query_time_ms: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReadyResponse {
    pub ready: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum IndexRequest {
    CheckReady,
    Search(SearchRequest),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum IndexResponse {
    Ready(ReadyResponse),
    Search(SearchResponse),
}
