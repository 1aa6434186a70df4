use quickfind_core::contract::{IndexResponse, SearchResponse};
use quickfind_core::filters::BackendFilters;
use quickfind_core::model::SearchFilters;
use quickfind_core::transport::TransportResponse;

#[test]
fn search_response_decodes_live_records() {
    let raw = r#"{"status":"ok","response":{"kind":"search","payload":{
        "entries":[{"id":1,"name":"notes.md","path":"/home/u/notes.md","size":12,
                    "modified":1705312200,"is_directory":false,"extension":"md"}],
        "total_count":1,"query_time_ms":3}}}"#;

    match serde_json::from_str::<TransportResponse>(raw).unwrap() {
        TransportResponse::Ok {
            response: IndexResponse::Search(SearchResponse { entries, total_count, .. }),
        } => {
            assert_eq!(total_count, 1);
            assert_eq!(entries[0].is_directory, Some(false));
        }
        other => panic!("unexpected response: {other:?}"),
    }
}

#[test]
fn translated_filters_omit_unset_bounds() {
    let mut filters = SearchFilters {
        files_only: true,
        size_min: Some(1_024),
        ..Default::default()
    };
    filters.file_types.push("pdf".into());

    let encoded = serde_json::to_value(BackendFilters::from(&filters)).unwrap();
    let object = encoded.as_object().unwrap();

    assert_eq!(object["size_min"], 1_024);
    assert_eq!(object["files_only"], true);
    assert!(!object.contains_key("size_max"));
    assert!(!object.contains_key("date_from"));
}
