use quickfind_core::config::{load, parse, save, validate, Config, ConfigError};

#[test]
fn default_config_is_valid() {
    let cfg = Config::default();
    assert!(validate(&cfg).is_ok());
    assert_eq!(cfg.index_endpoint, None);
    assert_eq!(cfg.debounce_ms, 300);
}

#[test]
fn missing_file_yields_defaults_at_that_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");

    let cfg = load(Some(&path)).unwrap();
    assert_eq!(cfg.config_path, path);
    assert_eq!(cfg.max_results, Config::default().max_results);
}

#[test]
fn json5_config_fills_missing_fields_with_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json5");
    std::fs::write(
        &path,
        "{\n  // local dev index\n  max_results: 50,\n  debounce_ms: 120,\n}\n",
    )
    .unwrap();

    let cfg = parse(&path, &std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(cfg.max_results, 50);
    assert_eq!(cfg.debounce_ms, 120);
    assert_eq!(cfg.connect_timeout_ms, Config::default().connect_timeout_ms);
}

#[test]
fn toml_config_declares_live_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "index_endpoint = \"127.0.0.1:7878\"\nlog_level = \"debug\"\n").unwrap();

    let cfg = parse(&path, &std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(cfg.index_endpoint.as_deref(), Some("127.0.0.1:7878"));
    assert_eq!(cfg.log_level, "debug");
}

#[test]
fn out_of_range_values_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"max_results": 2}"#).unwrap();

    assert!(matches!(load(Some(&path)), Err(ConfigError::Invalid(_))));

    let cfg = Config {
        debounce_ms: 10_000,
        ..Config::default()
    };
    assert!(validate(&cfg).is_err());
}

#[test]
fn malformed_file_reports_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ max_results: ").unwrap();

    assert!(matches!(load(Some(&path)), Err(ConfigError::Parse { .. })));
}

#[test]
fn saved_config_loads_back() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = Config {
        max_results: 42,
        config_path: dir.path().join("nested").join("config.json"),
        logs_dir: dir.path().join("logs"),
        ..Config::default()
    };

    save(&cfg).unwrap();
    let raw = std::fs::read_to_string(&cfg.config_path).unwrap();
    let loaded = parse(&cfg.config_path, &raw).unwrap();

    assert_eq!(loaded.max_results, 42);
    assert_eq!(loaded.logs_dir, cfg.logs_dir);
}
