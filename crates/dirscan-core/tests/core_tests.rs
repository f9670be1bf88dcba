use dirscan_core::{
    Concurrency, ConfigError, DEFAULT_MAX_FILE_SIZE, MAX_TAGS, ScanConfig, ScanResult, TagSet,
    Verdict,
};

#[test]
fn test_verdict_preserves_match_order() {
    let raw = r#"{
        "scanResult": 2,
        "fileName": "bundle.zip",
        "foundMalwares": [
            { "fileName": "bundle.zip/one.exe", "malwareName": "Trojan.A" },
            { "fileName": "bundle.zip/two.dll", "malwareName": "Worm.B" }
        ]
    }"#;
    let result = ScanResult::from_json(raw).unwrap();

    assert_eq!(result.verdict(), Verdict::Malware);
    let names: Vec<_> = result.malware_names().collect();
    assert_eq!(names, vec!["Trojan.A", "Worm.B"]);
    assert_eq!(result.found_malwares[1].file_name, "bundle.zip/two.dll");
}

#[test]
fn test_unknown_fields_are_ignored() {
    let raw = r#"{"fileName": "a.txt", "foundMalwares": [], "foundErrors": [{"name": "x"}]}"#;
    let result = ScanResult::from_json(raw).unwrap();
    assert_eq!(result.verdict(), Verdict::Clean);
}

#[test]
fn test_tag_limit_is_a_config_error() {
    let tags: Vec<String> = (0..=MAX_TAGS).map(|i| format!("tag{i}")).collect();
    assert_eq!(
        TagSet::new(tags).unwrap_err(),
        ConfigError::TooManyTags {
            count: MAX_TAGS + 1
        }
    );
}

#[test]
fn test_default_config() {
    let config = ScanConfig::new("/srv");
    assert_eq!(config.max_file_size, Some(DEFAULT_MAX_FILE_SIZE));
    assert_eq!(config.concurrency, Concurrency::default());
    assert!(!config.verbose);
}

#[test]
fn test_concurrency_display_round_trips() {
    for value in ["1", "250", "unlimited"] {
        let parsed: Concurrency = value.parse().unwrap();
        assert_eq!(parsed.to_string(), value);
    }
}
