mod common;

use common::*;
use mapsift_crawler::{
    CrawlDriver, CrawlError, CrawlMode, CrawlStats, CrawlTarget, CrawlerConfig, OnError,
    ProxyPool, Selectors, WriteBackSink, SENTINEL,
};

fn driver(site: &SharedSite, conf: CrawlerConfig) -> CrawlDriver<FakeFactory, MemoryStore> {
    init_logs();
    let sink = WriteBackSink::new(
        MemoryStore::default(),
        conf.sink.clone(),
        "sheet-id",
        WriteBackSink::<MemoryStore>::default_headers(),
    )
    .unwrap();
    CrawlDriver::new(
        conf,
        Selectors::default(),
        FakeFactory { site: site.clone() },
        ProxyPool::default(),
        sink,
    )
}

fn springfield() -> CrawlTarget {
    CrawlTarget::new("bakery", "Springfield", "Springfield")
}

#[test]
fn bakeries_in_springfield() {
    let sel = Selectors::default();
    let dir = tempfile::tempdir().unwrap();
    let site = site();
    let urls = publish_places(&site, 3);
    {
        let mut site = site.borrow_mut();
        for url in [&urls[0], &urls[2]] {
            let place = site.places.remove(url).unwrap();
            site.places
                .insert(url.clone(), place.with(&sel.place_website, "bakery.example"));
        }
    }

    let mut driver = driver(&site, quiet_config(dir.path()));
    let stats = driver.run(&[springfield()]).unwrap();

    assert_eq!(
        stats,
        CrawlStats {
            targets_done: 1,
            identifiers: 3,
            records_written: 3,
            ..CrawlStats::default()
        }
    );
    assert!(driver.checkpoints().exists("Springfield"));

    let rows = &driver.sink().store().sheets["Springfield"];
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0][0], "Name");
    for (row, url) in rows[1..].iter().zip(&urls) {
        assert_eq!(&row[6], url);
        assert_eq!(row[9], "bakery");
    }
    let websites: Vec<_> = rows[1..].iter().map(|r| r[4].as_str()).collect();
    assert_eq!(websites, ["bakery.example", SENTINEL, "bakery.example"]);
    assert_eq!(site.borrow().live, 0);
}

#[test]
fn failing_item_does_not_stop_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let site = site();
    let urls = publish_places(&site, 5);
    site.borrow_mut().broken.insert(urls[2].clone());

    let mut driver = driver(&site, quiet_config(dir.path()));
    let stats = driver.run(&[springfield()]).unwrap();

    assert_eq!(stats.items_failed, 1);
    assert_eq!(stats.records_written, 4);
    let names: Vec<_> = driver.sink().store().sheets["Springfield"][1..]
        .iter()
        .map(|r| r[0].clone())
        .collect();
    assert_eq!(names, ["Place 0", "Place 1", "Place 3", "Place 4"]);
}

#[test]
fn session_rotates_every_ten_items() {
    let dir = tempfile::tempdir().unwrap();
    let site = site();
    let urls = publish_places(&site, 25);

    let mut driver = driver(&site, quiet_config(dir.path()));
    let stats = driver.run(&[springfield()]).unwrap();
    assert_eq!(stats.rotations, 2);
    assert_eq!(stats.records_written, 25);

    let site = site.borrow();
    assert_eq!(site.launches, 3);
    assert_eq!(site.max_live, 1);

    // Items opened by each session, in launch order
    let mut per_session: Vec<usize> = vec![];
    for event in &site.events {
        if event == "launch" {
            per_session.push(0);
        } else if urls.contains(event) {
            *per_session.last_mut().unwrap() += 1;
        }
    }
    assert_eq!(per_session, [9, 10, 6]);
}

#[test]
fn lost_session_ends_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let site = site();
    publish_places(&site, 15);
    site.borrow_mut().launch_limit = Some(1);

    let mut driver = driver(&site, quiet_config(dir.path()));
    let err = driver.run(&[springfield()]).unwrap_err();
    assert!(matches!(err, CrawlError::NoSession(_)));

    let stats = driver.stats();
    assert_eq!(stats.records_written, 9);
    assert_eq!(stats.targets_failed, 1);
    assert_eq!(site.borrow().live, 0);
}

#[test]
fn zero_results_skip_the_target() {
    let dir = tempfile::tempdir().unwrap();
    let site = site();
    let mut driver = driver(&site, quiet_config(dir.path()));
    let stats = driver.run(&[springfield()]).unwrap();

    assert_eq!(stats.targets_failed, 1);
    assert_eq!(stats.identifiers, 0);
    assert!(!driver.checkpoints().exists("Springfield"));
    assert_eq!(driver.sink().store().append_calls, 0);
}

#[test]
fn zero_results_abort_when_failing_fast() {
    let dir = tempfile::tempdir().unwrap();
    let site = site();
    let mut conf = quiet_config(dir.path());
    conf.on_target_error = OnError::Fail;
    let mut driver = driver(&site, conf);

    let err = driver.run(&[springfield()]).unwrap_err();
    assert!(matches!(err, CrawlError::NoResults { .. }));
    assert_eq!(site.borrow().live, 0);
}

#[test]
fn targets_run_on_fresh_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let site = site();
    publish_places(&site, 2);

    let mut driver = driver(&site, quiet_config(dir.path()));
    let targets = [
        CrawlTarget::new("bakery", "New York", "New_York"),
        CrawlTarget::new("florist", "New York", "New_York"),
        CrawlTarget::new("bakery", "Paris", "Paris"),
    ];
    let stats = driver.run(&targets).unwrap();

    assert_eq!(stats.targets_done, 3);
    assert_eq!(stats.records_written, 6);
    assert_eq!(site.borrow().launches, 3);
    assert_eq!(site.borrow().typed[1], "florist in New York\n");

    let sheets = &driver.sink().store().sheets;
    assert_eq!(sheets["New_York"].len(), 5);
    assert_eq!(sheets["Paris"].len(), 3);
    assert_eq!(sheets["New_York"][3][9], "florist");
}

#[test]
fn collect_only_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let site = site();
    let urls = publish_places(&site, 3);
    let mut conf = quiet_config(dir.path());
    conf.mode = CrawlMode::CollectOnly;

    let mut driver = driver(&site, conf);
    let stats = driver.run(&[springfield()]).unwrap();

    assert_eq!(stats.identifiers, 3);
    assert_eq!(stats.records_written, 0);
    assert!(driver.sink().store().sheets.is_empty());
    assert_eq!(driver.checkpoints().load("Springfield").unwrap(), urls);
}

#[test]
fn extract_only_resumes_from_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let site = site();
    let urls = publish_places(&site, 4);
    // The search would find nothing now
    site.borrow_mut().results.clear();

    let mut conf = quiet_config(dir.path());
    conf.mode = CrawlMode::ExtractOnly;
    let mut driver = driver(&site, conf);
    driver.checkpoints().save("Springfield", &urls[1..]).unwrap();

    let stats = driver.run(&[springfield()]).unwrap();
    assert_eq!(stats.records_written, 3);
    assert!(site.borrow().typed.is_empty());
}

#[test]
fn extract_only_without_checkpoint_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let site = site();
    let mut conf = quiet_config(dir.path());
    conf.mode = CrawlMode::ExtractOnly;
    let mut driver = driver(&site, conf);

    let targets = [springfield(), CrawlTarget::new("bakery", "Paris", "Paris")];
    let err = driver.run(&targets).unwrap_err();
    assert!(matches!(err, CrawlError::CheckpointMissing { .. }));
    assert_eq!(driver.stats().targets_failed, 1);
}
