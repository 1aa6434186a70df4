use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{epoch, EntryKind, ResultEntry};

/// Epoch values above this magnitude are taken as milliseconds.
const MILLIS_THRESHOLD: f64 = 100_000_000_000.0;

/// A result record as the index service (or the sample set) hands it over.
///
/// Fields whose type varies between producers stay as raw JSON values and
/// are interpreted leniently by [`normalize_record`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_directory: Option<bool>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub entry_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
}

pub fn normalize_batch(records: impl IntoIterator<Item = RawRecord>) -> Vec<ResultEntry> {
    records
        .into_iter()
        .filter_map(|record| {
            let entry = normalize_record(&record);
            if entry.is_none() {
                tracing::warn!(id = ?record.id, name = ?record.name, "dropping record without a path");
            }
            entry
        })
        .collect()
}

/// Maps one raw record to a [`ResultEntry`].
///
/// Never fails on bad field values: those fall back to sentinels. Only a
/// record with no usable path is rejected, since nothing could open it.
pub fn normalize_record(record: &RawRecord) -> Option<ResultEntry> {
    let path = record
        .path
        .as_deref()
        .map(str::trim)
        .filter(|path| !path.is_empty())?
        .to_string();

    let kind = record_kind(record);
    let name = record
        .name
        .as_deref()
        .filter(|name| !name.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| file_name_from_path(&path).to_string());
    let id = record
        .id
        .as_ref()
        .and_then(value_to_id)
        .unwrap_or_else(|| path.clone());
    let size = record.size.as_ref().map(value_to_size).unwrap_or(0);
    let modified = record
        .modified
        .as_ref()
        .and_then(parse_timestamp)
        .unwrap_or_else(epoch);
    let extension = match kind {
        EntryKind::Folder | EntryKind::Url => None,
        EntryKind::File => record.extension.clone().filter(|ext| !ext.is_empty()),
    };

    Some(ResultEntry {
        id,
        name,
        path,
        size,
        modified,
        kind,
        extension,
    })
}

/// Accepts RFC 3339, naive date-times taken as UTC, bare dates, and epoch
/// numbers (seconds, or milliseconds when large).
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(number) => number.as_f64().and_then(epoch_number_to_datetime),
        Value::String(text) => parse_timestamp_str(text.trim()),
        _ => None,
    }
}

fn parse_timestamp_str(text: &str) -> Option<DateTime<Utc>> {
    if text.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    text.parse::<f64>().ok().and_then(epoch_number_to_datetime)
}

fn epoch_number_to_datetime(value: f64) -> Option<DateTime<Utc>> {
    if !value.is_finite() {
        return None;
    }
    let millis = if value.abs() >= MILLIS_THRESHOLD {
        value
    } else {
        value * 1000.0
    };
    DateTime::<Utc>::from_timestamp_millis(millis as i64)
}

fn record_kind(record: &RawRecord) -> EntryKind {
    if let Some(is_directory) = record.is_directory {
        return if is_directory {
            EntryKind::Folder
        } else {
            EntryKind::File
        };
    }

    match record
        .entry_type
        .as_deref()
        .map(|kind| kind.trim().to_ascii_lowercase())
        .as_deref()
    {
        Some("folder") | Some("directory") | Some("dir") => EntryKind::Folder,
        _ => EntryKind::File,
    }
}

fn value_to_id(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn value_to_size(value: &Value) -> u64 {
    match value {
        Value::Number(number) => {
            if let Some(size) = number.as_u64() {
                size
            } else {
                number
                    .as_f64()
                    .filter(|size| size.is_finite() && *size > 0.0)
                    .map(|size| size.floor() as u64)
                    .unwrap_or(0)
            }
        }
        Value::String(text) => text.trim().replace(',', "").parse::<u64>().unwrap_or(0),
        _ => 0,
    }
}

fn file_name_from_path(path: &str) -> &str {
    path.trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
}
