//! Integration tests for single-file transfers

use crate::{
    content, download_settings, fast_retry, mount_file, range_mock, spawn_stalling_server,
    test_downloader,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use sumi_mirror::download::{DownloadSettings, ManualPauseGate, NeverPause};
use sumi_mirror::{DownloadOutcome, SkipReason};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn file_url(server: &MockServer, route: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), route)).expect("Failed to parse URL")
}

#[tokio::test]
async fn test_fresh_download_writes_whole_file() {
    let server = MockServer::start().await;
    let body = content(2048);
    mount_file(&server, "/pub/file1.bin", &body).await;

    let dir = TempDir::new().unwrap();
    let downloader = test_downloader(
        download_settings(512),
        Arc::new(NeverPause),
        CancellationToken::new(),
    );

    let report = downloader
        .fetch(&file_url(&server, "/pub/file1.bin"), dir.path())
        .await;

    assert_eq!(
        report.outcome,
        DownloadOutcome::Completed {
            bytes_written: 2048,
            resumed_from: None
        }
    );
    assert_eq!(report.attempts, 1);
    assert_eq!(report.path, Some(dir.path().join("file1.bin")));
    assert_eq!(std::fs::read(dir.path().join("file1.bin")).unwrap(), body);
}

#[tokio::test]
async fn test_resume_appends_missing_tail() {
    let server = MockServer::start().await;
    let body = content(2048);
    range_mock("/file1.bin", &body, 1024)
        .expect(1)
        .mount(&server)
        .await;
    mount_file(&server, "/file1.bin", &body).await;

    let dir = TempDir::new().unwrap();
    let local = dir.path().join("file1.bin");
    std::fs::write(&local, &body[..1024]).unwrap();

    let downloader = test_downloader(
        download_settings(8192),
        Arc::new(NeverPause),
        CancellationToken::new(),
    );
    let report = downloader
        .fetch(&file_url(&server, "/file1.bin"), dir.path())
        .await;

    assert_eq!(
        report.outcome,
        DownloadOutcome::Completed {
            bytes_written: 1024,
            resumed_from: Some(1024)
        }
    );
    // Prefix kept, tail appended, nothing duplicated
    assert_eq!(std::fs::read(&local).unwrap(), body);
}

#[tokio::test]
async fn test_complete_file_is_skipped_after_probe() {
    let server = MockServer::start().await;
    let body = content(2048);

    Mock::given(method("HEAD"))
        .and(path("/file1.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let local = dir.path().join("file1.bin");
    std::fs::write(&local, &body).unwrap();
    let before = std::fs::metadata(&local).unwrap().modified().unwrap();

    let downloader = test_downloader(
        download_settings(8192),
        Arc::new(NeverPause),
        CancellationToken::new(),
    );
    let report = downloader
        .fetch(&file_url(&server, "/file1.bin"), dir.path())
        .await;

    assert_eq!(
        report.outcome,
        DownloadOutcome::Skipped(SkipReason::AlreadyComplete)
    );
    assert_eq!(std::fs::metadata(&local).unwrap().modified().unwrap(), before);
}

#[tokio::test]
async fn test_oversized_local_copy_is_replaced() {
    let server = MockServer::start().await;
    let body = content(2048);
    mount_file(&server, "/file1.bin", &body).await;

    let dir = TempDir::new().unwrap();
    let local = dir.path().join("file1.bin");
    std::fs::write(&local, vec![0xAA; 4096]).unwrap();

    let downloader = test_downloader(
        download_settings(8192),
        Arc::new(NeverPause),
        CancellationToken::new(),
    );
    let report = downloader
        .fetch(&file_url(&server, "/file1.bin"), dir.path())
        .await;

    assert!(report.outcome.is_success());
    assert_eq!(std::fs::read(&local).unwrap(), body);
}

#[tokio::test]
async fn test_ignored_range_restarts_from_zero() {
    let server = MockServer::start().await;
    let body = content(2048);
    // No range mock: the server answers every GET with the whole body
    mount_file(&server, "/file1.bin", &body).await;

    let dir = TempDir::new().unwrap();
    let local = dir.path().join("file1.bin");
    std::fs::write(&local, &body[..1024]).unwrap();

    let downloader = test_downloader(
        download_settings(8192),
        Arc::new(NeverPause),
        CancellationToken::new(),
    );
    let report = downloader
        .fetch(&file_url(&server, "/file1.bin"), dir.path())
        .await;

    assert_eq!(
        report.outcome,
        DownloadOutcome::Completed {
            bytes_written: 2048,
            resumed_from: None
        }
    );
    assert_eq!(std::fs::read(&local).unwrap().len(), 2048);
    assert_eq!(std::fs::read(&local).unwrap(), body);
}

#[tokio::test]
async fn test_failed_probe_is_terminal() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let downloader = test_downloader(
        download_settings(8192),
        Arc::new(NeverPause),
        CancellationToken::new(),
    );
    let report = downloader
        .fetch(&file_url(&server, "/gone.bin"), dir.path())
        .await;

    assert!(matches!(report.outcome, DownloadOutcome::Failed { .. }));
    assert_eq!(report.attempts, 1);
    assert!(!dir.path().join("gone.bin").exists());
}

#[tokio::test]
async fn test_unavailable_transfer_is_retried() {
    let server = MockServer::start().await;
    let body = content(1500);

    Mock::given(method("GET"))
        .and(path("/busy.bin"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_file(&server, "/busy.bin", &body).await;

    let dir = TempDir::new().unwrap();
    let downloader = test_downloader(
        download_settings(8192),
        Arc::new(NeverPause),
        CancellationToken::new(),
    );
    let report = downloader
        .fetch(&file_url(&server, "/busy.bin"), dir.path())
        .await;

    assert!(report.outcome.is_success());
    assert_eq!(report.attempts, 2);
    assert_eq!(std::fs::read(dir.path().join("busy.bin")).unwrap(), body);
}

#[tokio::test]
async fn test_retries_exhausted_reports_failure() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content(64)))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let downloader = test_downloader(
        download_settings(8192),
        Arc::new(NeverPause),
        CancellationToken::new(),
    );
    let report = downloader
        .fetch(&file_url(&server, "/broken.bin"), dir.path())
        .await;

    match report.outcome {
        DownloadOutcome::Failed { cause } => assert!(cause.contains("500"), "{}", cause),
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(report.attempts, 3);
}

#[tokio::test]
async fn test_silent_server_times_out_and_retries() {
    let server = MockServer::start().await;
    let body = content(1200);

    Mock::given(method("GET"))
        .and(path("/slow.bin"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_file(&server, "/slow.bin", &body).await;

    let dir = TempDir::new().unwrap();
    let settings = DownloadSettings {
        read_timeout: Duration::from_millis(200),
        ..download_settings(8192)
    };
    let downloader = test_downloader(settings, Arc::new(NeverPause), CancellationToken::new());

    let started = Instant::now();
    let report = downloader
        .fetch(&file_url(&server, "/slow.bin"), dir.path())
        .await;

    assert!(started.elapsed() < Duration::from_secs(4));
    assert_eq!(
        report.outcome,
        DownloadOutcome::Completed {
            bytes_written: 1200,
            resumed_from: None
        }
    );
    assert_eq!(report.attempts, 2);
    assert_eq!(std::fs::read(dir.path().join("slow.bin")).unwrap(), body);
}

#[tokio::test]
async fn test_silent_server_fails_after_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content(64)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let settings = DownloadSettings {
        read_timeout: Duration::from_millis(200),
        retry: fast_retry(2),
        ..download_settings(8192)
    };
    let downloader = test_downloader(settings, Arc::new(NeverPause), CancellationToken::new());
    let report = downloader
        .fetch(&file_url(&server, "/hung.bin"), dir.path())
        .await;

    match report.outcome {
        DownloadOutcome::Failed { cause } => assert!(cause.contains("No data"), "{}", cause),
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(report.attempts, 2);
}

#[tokio::test]
async fn test_body_stalled_after_last_byte_reports_completed() {
    let body = content(2000);
    let base = spawn_stalling_server(body.clone()).await;

    let dir = TempDir::new().unwrap();
    let settings = DownloadSettings {
        read_timeout: Duration::from_millis(200),
        ..download_settings(512)
    };
    let downloader = test_downloader(settings, Arc::new(NeverPause), CancellationToken::new());
    let url = Url::parse(&format!("{}/stuck.bin", base)).unwrap();
    let report = downloader.fetch(&url, dir.path()).await;

    // The first attempt wrote every byte before stalling; the retry finds
    // the file complete and still credits this run with the transfer
    assert_eq!(
        report.outcome,
        DownloadOutcome::Completed {
            bytes_written: 2000,
            resumed_from: None
        }
    );
    assert_eq!(report.attempts, 2);
    assert_eq!(std::fs::read(dir.path().join("stuck.bin")).unwrap(), body);
}

#[tokio::test]
async fn test_unusable_name_skipped_without_request() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let downloader = test_downloader(
        download_settings(8192),
        Arc::new(NeverPause),
        CancellationToken::new(),
    );

    let report = downloader
        .fetch(&file_url(&server, "/pub/"), dir.path())
        .await;

    assert_eq!(
        report.outcome,
        DownloadOutcome::Skipped(SkipReason::InvalidName)
    );
    assert!(report.path.is_none());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_encoded_separators_stay_inside_folder() {
    let server = MockServer::start().await;
    let body = content(100);
    mount_file(&server, "/pub/..%2F..%2Fevil.bin", &body).await;

    let root = TempDir::new().unwrap();
    let folder = root.path().join("mirror");
    std::fs::create_dir(&folder).unwrap();

    let downloader = test_downloader(
        download_settings(8192),
        Arc::new(NeverPause),
        CancellationToken::new(),
    );
    let report = downloader
        .fetch(&file_url(&server, "/pub/..%2F..%2Fevil.bin"), &folder)
        .await;

    assert!(report.outcome.is_success());
    let path = report.path.unwrap();
    assert_eq!(path.parent(), Some(folder.as_path()));
    assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn test_speed_limit_slows_transfer() {
    let server = MockServer::start().await;
    let body = content(2048);
    mount_file(&server, "/slow.bin", &body).await;

    let dir = TempDir::new().unwrap();
    let downloader = test_downloader(
        download_settings(1024),
        Arc::new(NeverPause),
        CancellationToken::new(),
    );

    let started = Instant::now();
    let report = downloader
        .fetch_with_limit(&file_url(&server, "/slow.bin"), dir.path(), Some(4096))
        .await;

    assert!(report.outcome.is_success());
    // Two 1 KiB chunks at 4 KiB/s sleep about 250ms each
    assert!(started.elapsed() >= Duration::from_millis(450));
}

#[tokio::test]
async fn test_pause_holds_transfer_until_resume() {
    let server = MockServer::start().await;
    let body = content(2048);
    mount_file(&server, "/paused.bin", &body).await;

    let dir = TempDir::new().unwrap();
    let gate = ManualPauseGate::shared();
    gate.pause();

    let downloader = Arc::new(test_downloader(
        download_settings(512),
        gate.clone(),
        CancellationToken::new(),
    ));

    let url = file_url(&server, "/paused.bin");
    let folder = dir.path().to_path_buf();
    let task = {
        let downloader = downloader.clone();
        tokio::spawn(async move { downloader.fetch(&url, &folder).await })
    };

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!task.is_finished());

    gate.resume();
    let report = task.await.unwrap();

    assert!(report.outcome.is_success());
    assert_eq!(std::fs::read(dir.path().join("paused.bin")).unwrap(), body);
}

#[tokio::test]
async fn test_cancelled_transfer_resumes_on_next_run() {
    let server = MockServer::start().await;
    let body = content(2048);
    range_mock("/big.bin", &body, 512)
        .expect(1)
        .mount(&server)
        .await;
    mount_file(&server, "/big.bin", &body).await;

    let dir = TempDir::new().unwrap();
    let local = dir.path().join("big.bin");
    let url = file_url(&server, "/big.bin");

    // First run: paused after the first chunk, then cancelled
    let gate = ManualPauseGate::shared();
    gate.pause();
    let cancel = CancellationToken::new();
    let downloader = Arc::new(test_downloader(
        download_settings(512),
        gate.clone(),
        cancel.clone(),
    ));
    let task = {
        let downloader = downloader.clone();
        let url = url.clone();
        let folder = dir.path().to_path_buf();
        tokio::spawn(async move { downloader.fetch(&url, &folder).await })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();
    let report = task.await.unwrap();

    assert_eq!(report.outcome, DownloadOutcome::Cancelled);
    assert_eq!(std::fs::metadata(&local).unwrap().len(), 512);

    // Second run picks up at the partial size
    let downloader = test_downloader(
        download_settings(512),
        Arc::new(NeverPause),
        CancellationToken::new(),
    );
    let report = downloader.fetch(&url, dir.path()).await;

    assert_eq!(
        report.outcome,
        DownloadOutcome::Completed {
            bytes_written: 1536,
            resumed_from: Some(512)
        }
    );
    assert_eq!(std::fs::read(&local).unwrap(), body);
}

#[tokio::test]
async fn test_concurrent_writers_to_one_path_serialize() {
    let server = MockServer::start().await;
    let body = content(4096);
    mount_file(&server, "/shared.bin", &body).await;

    let dir = TempDir::new().unwrap();
    let downloader = test_downloader(
        download_settings(512),
        Arc::new(NeverPause),
        CancellationToken::new(),
    );
    let url = file_url(&server, "/shared.bin");

    let (first, second) = tokio::join!(
        downloader.fetch(&url, dir.path()),
        downloader.fetch(&url, dir.path())
    );

    let mut outcomes = vec![first.outcome, second.outcome];
    outcomes.sort_by_key(|o| o.is_skipped());
    assert!(outcomes[0].is_success() && !outcomes[0].is_skipped());
    assert_eq!(
        outcomes[1],
        DownloadOutcome::Skipped(SkipReason::AlreadyComplete)
    );
    assert_eq!(std::fs::read(dir.path().join("shared.bin")).unwrap(), body);
}
