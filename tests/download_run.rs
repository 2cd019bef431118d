//! End-to-end download runs against a mock image server
//!
//! These tests drive the public API the way the `downloader` binary does: load a
//! report file, extract work items, and run them through a `BatchScheduler` backed by
//! a real `HttpFetcher`.

mod common;

use album_dl::{
    BatchScheduler, DownloadOutcome, Error, Event, FetchError, HttpFetcher, download_report,
    extract_work_items, load_report, sync_path,
};
use common::{
    expected_name, image_url, mount_image, mount_status, test_config, write_report,
};
use std::sync::Arc;
use tempfile::tempdir;
use wiremock::MockServer;

#[tokio::test]
async fn test_report_download_then_rerun_skips_everything() {
    let server = MockServer::start().await;
    let work = tempdir().unwrap();
    let dest = work.path().join("photos");

    // 5 good images, fetched exactly once across both runs
    for id in 1..=5 {
        mount_image(&server, id, 500, 1).await;
    }
    mount_status(&server, 6, 404).await;
    mount_image(&server, 7, 50, 2).await;

    let images: Vec<(u64, String)> = (1..=7).map(|id| (id, image_url(&server, id))).collect();
    let report = write_report(work.path(), &images);
    let config = test_config(&dest, 3);

    let first = download_report(&config, &report).await.unwrap();
    assert_eq!(first.total, 7);
    assert_eq!(first.downloaded, 5);
    assert_eq!(first.skipped, 0);
    assert_eq!(first.failed, 2);
    assert_eq!(first.bytes, 5 * 500);
    assert_eq!(first.processed(), first.total);

    for id in 1..=5 {
        let file = dest.join(expected_name(id));
        assert_eq!(std::fs::metadata(&file).unwrap().len(), 500, "{}", file.display());
    }
    assert!(!dest.join(expected_name(6)).exists(), "404 leaves no file");
    assert!(!dest.join(expected_name(7)).exists(), "undersized body leaves no file");

    let leftovers: Vec<_> = std::fs::read_dir(&dest)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".part"))
        .collect();
    assert!(leftovers.is_empty(), "partial files left: {leftovers:?}");

    let second = download_report(&config, &report).await.unwrap();
    assert_eq!(second.total, 7);
    assert_eq!(second.downloaded, 0);
    assert_eq!(second.skipped, 5);
    assert_eq!(second.failed, 2);
    assert_eq!(second.bytes, 0);
}

#[tokio::test]
async fn test_events_cover_every_item_and_end_with_summary() {
    let server = MockServer::start().await;
    let work = tempdir().unwrap();

    for id in 1..=4 {
        mount_image(&server, id, 200, 1).await;
    }
    mount_status(&server, 5, 500).await;

    let images: Vec<(u64, String)> = (1..=5).map(|id| (id, image_url(&server, id))).collect();
    let report = load_report(&write_report(work.path(), &images)).unwrap();
    let items = extract_work_items(&report);

    let config = test_config(&work.path().join("out"), 2);
    let fetcher = Arc::new(HttpFetcher::new(&config).unwrap());
    let scheduler = BatchScheduler::new(fetcher, &config.download);
    let mut events = scheduler.subscribe();

    let summary = scheduler.run(items).await.unwrap();
    drop(scheduler);

    let mut received = Vec::new();
    while let Ok(event) = events.recv().await {
        received.push(event);
    }

    let started = received
        .iter()
        .filter(|e| matches!(e, Event::BatchStarted { .. }))
        .count();
    assert_eq!(started, 3, "5 items at width 2");

    let failures: Vec<_> = received
        .iter()
        .filter_map(|e| match e {
            Event::ItemFinished { outcome: DownloadOutcome::Failed(err), .. } => Some(err.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(failures, vec![FetchError::Http { status: 500 }]);

    let finished = received
        .iter()
        .filter(|e| matches!(e, Event::ItemFinished { .. }))
        .count();
    assert_eq!(finished, 5);

    match received.last() {
        Some(Event::RunCompleted(last)) => {
            assert_eq!(last.downloaded, summary.downloaded);
            assert_eq!(last.failed, 1);
        }
        other => panic!("expected RunCompleted last, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_report_is_fatal() {
    let work = tempdir().unwrap();
    let config = test_config(&work.path().join("out"), 2);

    let err = download_report(&config, &work.path().join("missing.json"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert!(!work.path().join("out").exists());
}

#[tokio::test]
async fn test_occupied_destination_is_fatal() {
    let server = MockServer::start().await;
    let work = tempdir().unwrap();
    mount_image(&server, 1, 500, 0).await;

    let report = write_report(work.path(), &[(1, image_url(&server, 1))]);
    let occupied = work.path().join("photos");
    std::fs::write(&occupied, b"not a directory").unwrap();

    let err = download_report(&test_config(&occupied, 2), &report)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotADirectory(_)));
}

#[tokio::test]
async fn test_downloaded_files_sync_to_capture_time() {
    let server = MockServer::start().await;
    let work = tempdir().unwrap();
    let dest = work.path().join("photos");

    for id in 1..=3 {
        mount_image(&server, id, 300, 1).await;
    }
    let images: Vec<(u64, String)> = (1..=3).map(|id| (id, image_url(&server, id))).collect();
    let report = write_report(work.path(), &images);

    let summary = download_report(&test_config(&dest, 3), &report).await.unwrap();
    assert_eq!(summary.downloaded, 3);

    let synced = sync_path(&dest, 2, |_, _, _, _| {}).unwrap();
    assert_eq!(synced.updated, 3);
    assert!(synced.failed.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_duplicate_images_in_one_batch_resolve_to_a_skip() {
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/img/1.jpg"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(common::image_bytes(200_000))
                .set_delay(Duration::from_millis(100)),
        )
        .mount(&server)
        .await;

    let work = tempdir().unwrap();
    let dest = work.path().join("photos");
    let url = image_url(&server, 1);
    let report = write_report(work.path(), &[(1, url.clone()), (1, url)]);

    let summary = download_report(&test_config(&dest, 2), &report).await.unwrap();

    assert_eq!(summary.total, 2);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.downloaded, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(
        std::fs::read(dest.join(expected_name(1))).unwrap(),
        common::image_bytes(200_000)
    );
    let names: Vec<_> = std::fs::read_dir(&dest)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec![expected_name(1)]);
}
