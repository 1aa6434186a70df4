use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Folder,
    Url,
}

impl EntryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Folder => "folder",
            Self::Url => "url",
        }
    }
}

/// Sentinel timestamp for records without a usable modification time.
pub fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::default()
}

/// Canonical result row shown by the launcher, whatever shape the index
/// service produced it in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultEntry {
    pub id: String,
    pub name: String,
    pub path: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
    pub kind: EntryKind,
    pub extension: Option<String>,
}

impl ResultEntry {
    /// Entry standing in for a navigable URL. The URL doubles as the path.
    pub fn url(url: &str) -> Self {
        Self {
            id: url.to_string(),
            name: url.to_string(),
            path: url.to_string(),
            size: 0,
            modified: epoch(),
            kind: EntryKind::Url,
            extension: None,
        }
    }

    pub fn is_folder(&self) -> bool {
        self.kind == EntryKind::Folder
    }
}

/// Structured filters edited next to the query box.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
    pub file_types: Vec<String>,
    pub size_min: Option<u64>,
    pub size_max: Option<u64>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub include_hidden: bool,
    pub case_sensitive: bool,
    pub use_regex: bool,
    pub search_content: bool,
    pub directories_only: bool,
    pub files_only: bool,
}

/// One immutable (text, filters) pair. Each edit produces a new one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub text: String,
    pub filters: SearchFilters,
}

impl Query {
    pub fn new(text: impl Into<String>, filters: SearchFilters) -> Self {
        Self {
            text: text.into(),
            filters,
        }
    }

    pub fn trimmed(&self) -> &str {
        self.text.trim()
    }

    pub fn is_blank(&self) -> bool {
        self.trimmed().is_empty()
    }
}
