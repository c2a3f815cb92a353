use super::{build_zip, landing_html, mount_repo, test_config};
use crate::crawler::RepoCrawler;
use crate::crawler::pipeline::crawl_repo;
use crate::error::Error;
use crate::types::{JobState, RepoReference};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn publishes_filtered_sources_and_removes_lock() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    let archive = build_zip(&[
        ("repo-main/main.go", b"package main"),
        ("repo-main/README.md", b"# readme"),
    ]);
    mount_repo(&server, "/alpha/one", archive).await;

    let crawler = RepoCrawler::new(test_config(&server.uri(), temp.path())).unwrap();
    let outcome = crawl_repo(&crawler, RepoReference::new("/alpha/one")).await;

    assert_eq!(outcome.state, JobState::Published);
    assert!(outcome.error.is_none());
    let dest = temp.path().join("alpha_one");
    assert!(dest.join("repo-main/main.go").is_file());
    assert!(
        !dest.join("repo-main/README.md").exists(),
        "only matching-suffix entries may be published"
    );
    assert!(
        !temp.path().join("_alpha_one").exists(),
        "lock directory must be gone after publish"
    );
}

#[tokio::test]
async fn lock_contention_skips_without_network_calls() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    // another pipeline (or process) holds the lock
    std::fs::create_dir(temp.path().join("_alpha_one")).unwrap();

    let crawler = RepoCrawler::new(test_config(&server.uri(), temp.path())).unwrap();
    let outcome = crawl_repo(&crawler, RepoReference::new("/alpha/one")).await;

    assert_eq!(outcome.state, JobState::Skipped);
    assert!(
        temp.path().join("_alpha_one").is_dir(),
        "a foreign lock must be left in place"
    );
    assert!(
        server.received_requests().await.unwrap().is_empty(),
        "a contended job must not touch the network"
    );
}

#[tokio::test]
async fn existing_destination_skips_idempotently() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("alpha_one");
    std::fs::create_dir(&dest).unwrap();
    std::fs::write(dest.join("main.go"), b"package original").unwrap();

    let crawler = RepoCrawler::new(test_config(&server.uri(), temp.path())).unwrap();
    let outcome = crawl_repo(&crawler, RepoReference::new("/alpha/one")).await;

    assert_eq!(outcome.state, JobState::Skipped);
    assert!(
        !temp.path().join("_alpha_one").exists(),
        "the skip path must release its own lock"
    );
    assert_eq!(
        std::fs::read(dest.join("main.go")).unwrap(),
        b"package original",
        "a published destination must never be modified"
    );
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn resolve_failure_abandons_and_cleans_lock() {
    // nothing mounted: the landing page 404s and the budget is zero
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();

    let crawler = RepoCrawler::new(test_config(&server.uri(), temp.path())).unwrap();
    let outcome = crawl_repo(&crawler, RepoReference::new("/alpha/one")).await;

    assert_eq!(outcome.state, JobState::Failed);
    assert!(matches!(
        outcome.error,
        Some(Error::ExhaustedRetries { .. })
    ));
    assert!(!temp.path().join("_alpha_one").exists());
    assert!(!temp.path().join("alpha_one").exists());
}

#[tokio::test]
async fn download_exhaustion_abandons_and_cleans_lock() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    // landing resolves but the archive endpoint keeps failing
    Mock::given(method("GET"))
        .and(path("/alpha/one"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(landing_html("/alpha/one/archive/main.zip")),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/alpha/one/archive/main.zip"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let crawler = RepoCrawler::new(test_config(&server.uri(), temp.path())).unwrap();
    let outcome = crawl_repo(&crawler, RepoReference::new("/alpha/one")).await;

    assert_eq!(outcome.state, JobState::Failed);
    assert!(matches!(
        outcome.error,
        Some(Error::ExhaustedRetries { attempts: 1, .. })
    ));
    assert!(!temp.path().join("_alpha_one").exists());
    assert!(
        !temp.path().join("alpha_one").exists(),
        "no partial destination may ever appear"
    );
}

#[tokio::test]
async fn malformed_landing_page_fails_only_that_repository() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .and(path("/alpha/one"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>no archive link</html>"))
        .mount(&server)
        .await;

    let crawler = RepoCrawler::new(test_config(&server.uri(), temp.path())).unwrap();
    let outcome = crawl_repo(&crawler, RepoReference::new("/alpha/one")).await;

    assert_eq!(outcome.state, JobState::Failed);
    assert!(matches!(
        outcome.error,
        Some(Error::MalformedLandingPage { .. })
    ));
    assert!(!temp.path().join("_alpha_one").exists());
}

#[tokio::test]
async fn corrupt_archive_abandons_and_cleans_lock() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    mount_repo(&server, "/alpha/one", b"this is not a zip".to_vec()).await;

    let crawler = RepoCrawler::new(test_config(&server.uri(), temp.path())).unwrap();
    let outcome = crawl_repo(&crawler, RepoReference::new("/alpha/one")).await;

    assert_eq!(outcome.state, JobState::Failed);
    assert!(matches!(outcome.error, Some(Error::Zip(_))));
    assert!(!temp.path().join("_alpha_one").exists());
    assert!(!temp.path().join("alpha_one").exists());
}

#[tokio::test]
async fn concurrent_pipelines_for_same_reference_publish_exactly_once() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    let archive = build_zip(&[("repo-main/main.go", b"package main")]);
    mount_repo(&server, "/alpha/one", archive).await;

    let crawler = RepoCrawler::new(test_config(&server.uri(), temp.path())).unwrap();
    let reference = RepoReference::new("/alpha/one");
    let (a, b) = tokio::join!(
        crawl_repo(&crawler, reference.clone()),
        crawl_repo(&crawler, reference.clone())
    );

    let outcomes = [&a, &b];
    let published = outcomes
        .iter()
        .filter(|o| o.state == JobState::Published)
        .count();
    let skipped = outcomes
        .iter()
        .filter(|o| o.state == JobState::Skipped)
        .count();
    assert_eq!(published, 1, "exactly one pipeline may publish");
    assert_eq!(skipped, 1, "the loser must skip");
    assert_eq!(
        server.received_requests().await.unwrap().len(),
        2,
        "the skipped pipeline must perform no network calls"
    );
    assert!(temp.path().join("alpha_one").is_dir());
    assert!(!temp.path().join("_alpha_one").exists());
}

#[tokio::test]
async fn cancellation_during_download_abandons_lock() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .and(path("/alpha/one"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(landing_html("/alpha/one/archive/main.zip")),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/alpha/one/archive/main.zip"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(build_zip(&[("main.go", b"package main")]))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let crawler = RepoCrawler::new(test_config(&server.uri(), temp.path())).unwrap();
    let task = {
        let crawler = crawler.clone();
        tokio::spawn(async move { crawl_repo(&crawler, RepoReference::new("/alpha/one")).await })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    crawler.shutdown();
    let outcome = task.await.unwrap();

    assert_eq!(outcome.state, JobState::Failed);
    assert!(matches!(outcome.error, Some(Error::Cancelled)));
    assert!(
        !temp.path().join("_alpha_one").exists(),
        "a cancelled pipeline must release its lock"
    );
    assert!(!temp.path().join("alpha_one").exists());
}
