use chrono::{DateTime, SecondsFormat, Utc};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::index_service::IndexError;
use crate::model::{ResultEntry, SearchFilters};

/// File-type token that admits directories.
pub const FOLDER_FILE_TYPE: &str = "folder";

/// Filters in the index service's wire schema. Unset bounds are omitted
/// from the JSON rather than sent as `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendFilters {
    #[serde(default)]
    pub file_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_min: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_max: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_to: Option<String>,
    #[serde(default)]
    pub include_hidden: bool,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default)]
    pub use_regex: bool,
    #[serde(default)]
    pub search_content: bool,
    #[serde(default)]
    pub directories_only: bool,
    #[serde(default)]
    pub files_only: bool,
}

impl From<&SearchFilters> for BackendFilters {
    fn from(value: &SearchFilters) -> Self {
        Self {
            file_types: value.file_types.clone(),
            size_min: value.size_min,
            size_max: value.size_max,
            date_from: value.date_from.as_ref().map(iso_timestamp),
            date_to: value.date_to.as_ref().map(iso_timestamp),
            include_hidden: value.include_hidden,
            case_sensitive: value.case_sensitive,
            use_regex: value.use_regex,
            search_content: value.search_content,
            directories_only: value.directories_only,
            files_only: value.files_only,
        }
    }
}

/// `2024-01-20T00:00:00.000Z`
pub fn iso_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

enum NameMatcher {
    Substring { needle: String, case_sensitive: bool },
    Pattern(Regex),
}

impl NameMatcher {
    fn is_match(&self, name: &str) -> bool {
        match self {
            Self::Substring {
                needle,
                case_sensitive: true,
            } => name.contains(needle.as_str()),
            Self::Substring { needle, .. } => name.to_lowercase().contains(needle.as_str()),
            Self::Pattern(pattern) => pattern.is_match(name),
        }
    }
}

/// Applies a query and [`BackendFilters`] to typed entries. Used by the
/// in-memory index so it filters exactly the way the schema describes.
pub struct FilterMatcher<'a> {
    name: NameMatcher,
    filters: &'a BackendFilters,
    file_types: Vec<String>,
    date_from: Option<DateTime<Utc>>,
    date_to: Option<DateTime<Utc>>,
}

impl<'a> FilterMatcher<'a> {
    pub fn new(query: &str, filters: &'a BackendFilters) -> Result<Self, IndexError> {
        let query = query.trim();
        let name = if filters.use_regex {
            let pattern = RegexBuilder::new(query)
                .case_insensitive(!filters.case_sensitive)
                .build()
                .map_err(|error| IndexError::InvalidQuery(format!("invalid regex pattern: {error}")))?;
            NameMatcher::Pattern(pattern)
        } else if filters.case_sensitive {
            NameMatcher::Substring {
                needle: query.to_string(),
                case_sensitive: true,
            }
        } else {
            NameMatcher::Substring {
                needle: query.to_lowercase(),
                case_sensitive: false,
            }
        };

        Ok(Self {
            name,
            filters,
            file_types: filters
                .file_types
                .iter()
                .map(|kind| kind.trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|kind| !kind.is_empty())
                .collect(),
            date_from: parse_bound(filters.date_from.as_deref(), "date_from")?,
            date_to: parse_bound(filters.date_to.as_deref(), "date_to")?,
        })
    }

    pub fn matches(&self, entry: &ResultEntry) -> bool {
        let filters = self.filters;
        let folder = entry.is_folder();

        if !filters.include_hidden && entry.name.starts_with('.') {
            return false;
        }
        if (filters.directories_only && !folder) || (filters.files_only && folder) {
            return false;
        }
        if !self.file_types.is_empty() && !self.file_type_allowed(entry) {
            return false;
        }
        if !folder {
            if filters.size_min.is_some_and(|min| entry.size < min) {
                return false;
            }
            if filters.size_max.is_some_and(|max| entry.size > max) {
                return false;
            }
        }
        if self.date_from.is_some_and(|from| entry.modified < from) {
            return false;
        }
        if self.date_to.is_some_and(|to| entry.modified > to) {
            return false;
        }

        self.name.is_match(&entry.name)
    }

    fn file_type_allowed(&self, entry: &ResultEntry) -> bool {
        if entry.is_folder() {
            return self.file_types.iter().any(|kind| kind == FOLDER_FILE_TYPE);
        }
        entry
            .extension
            .as_deref()
            .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
            .is_some_and(|ext| self.file_types.iter().any(|kind| *kind == ext))
    }
}

fn parse_bound(value: Option<&str>, field: &str) -> Result<Option<DateTime<Utc>>, IndexError> {
    value
        .map(|raw| {
            DateTime::parse_from_rfc3339(raw)
                .map(|parsed| parsed.with_timezone(&Utc))
                .map_err(|error| IndexError::InvalidQuery(format!("invalid {field} '{raw}': {error}")))
        })
        .transpose()
}
