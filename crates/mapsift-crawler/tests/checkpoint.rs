use mapsift_crawler::{CheckpointStore, CrawlError};

#[test]
fn save_then_load() {
    let dir = tempfile::tempdir().unwrap();
    let store = CheckpointStore::new(dir.path().join("session"));
    let urls = vec![
        "https://www.google.com/maps/place/a".to_string(),
        "https://www.google.com/maps/place/b".to_string(),
    ];

    assert!(!store.exists("New_York"));
    store.save("New_York", &urls).unwrap();
    assert!(store.exists("New_York"));
    assert_eq!(
        store.path("New_York"),
        dir.path().join("session").join("New_York_url.json")
    );
    assert_eq!(store.load("New_York").unwrap(), urls);
}

#[test]
fn file_format_is_an_object_of_urls() {
    let dir = tempfile::tempdir().unwrap();
    let store = CheckpointStore::new(dir.path());
    store.save("Paris", &["u1".to_string()]).unwrap();

    let raw = std::fs::read_to_string(store.path("Paris")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value, serde_json::json!({ "urls": ["u1"] }));
}

#[test]
fn saving_again_replaces_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let store = CheckpointStore::new(dir.path());
    store.save("Paris", &["u1".to_string(), "u2".to_string()]).unwrap();
    store.save("Paris", &["u3".to_string()]).unwrap();
    assert_eq!(store.load("Paris").unwrap(), ["u3"]);
}

#[test]
fn missing_checkpoint_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let store = CheckpointStore::new(dir.path());
    let err = store.load("Nowhere").unwrap_err();
    assert!(matches!(err, CrawlError::CheckpointMissing { ref batch_key, .. } if batch_key == "Nowhere"));
    assert!(err.is_fatal());
}

#[test]
fn corrupt_checkpoint_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let store = CheckpointStore::new(dir.path());
    std::fs::write(store.path("Paris"), "[not json").unwrap();
    assert!(matches!(store.load("Paris"), Err(CrawlError::Json(_))));
}
