use chrono::{TimeZone, Utc};
use quickfind_core::model::{epoch, EntryKind};
use quickfind_core::normalize::{normalize_batch, normalize_record, RawRecord};

fn record(json: &str) -> RawRecord {
    serde_json::from_str(json).unwrap()
}

#[test]
fn live_directory_record_becomes_folder_without_extension() {
    let entry = normalize_record(&record(
        r#"{"id": 17, "name": "Projects", "path": "/home/u/Projects",
            "size": 0, "modified": "2024-01-20T08:15:00Z",
            "is_directory": true, "extension": ""}"#,
    ))
    .unwrap();

    assert_eq!(entry.kind, EntryKind::Folder);
    assert_eq!(entry.extension, None);
    assert_eq!(entry.id, "17");
    assert_eq!(entry.modified, Utc.with_ymd_and_hms(2024, 1, 20, 8, 15, 0).unwrap());
}

#[test]
fn sample_shape_record_keeps_extension() {
    let entry = normalize_record(&record(
        r#"{"id": "3", "name": "config.json", "path": "C:\\Users\\AppData\\config.json",
            "size": 5120, "modified": "2024-01-22", "type": "file", "extension": "json"}"#,
    ))
    .unwrap();

    assert_eq!(entry.kind, EntryKind::File);
    assert_eq!(entry.extension.as_deref(), Some("json"));
    assert_eq!(entry.size, 5_120);
    assert_eq!(entry.modified, Utc.with_ymd_and_hms(2024, 1, 22, 0, 0, 0).unwrap());
}

#[test]
fn malformed_fields_fall_back_to_sentinels() {
    let entry = normalize_record(&record(
        r#"{"path": "/srv/data/report.csv", "size": "lots", "modified": "yesterday"}"#,
    ))
    .unwrap();

    assert_eq!(entry.id, "/srv/data/report.csv");
    assert_eq!(entry.name, "report.csv");
    assert_eq!(entry.size, 0);
    assert_eq!(entry.modified, epoch());
}

#[test]
fn batch_drops_only_pathless_records() {
    let entries = normalize_batch(vec![
        record(r#"{"name": "ghost"}"#),
        record(r#"{"path": "/a/b.txt", "is_directory": false}"#),
        record(r#"{"path": "   ", "name": "blank"}"#),
    ]);

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].path, "/a/b.txt");
}
