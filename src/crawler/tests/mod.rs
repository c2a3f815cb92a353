//! Shared fixtures for crawl engine tests

mod pipeline;

use crate::config::{Config, FetchConfig, Language};
use crate::types::Event;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Crawl configuration pointed at a mock server, with delays compressed
/// so retry/exhaustion paths run in milliseconds
pub(crate) fn test_config(server_uri: &str, root: &Path) -> Config {
    Config {
        language: Language::Go,
        root_dir: root.to_path_buf(),
        base_url: format!("{server_uri}/"),
        start_url: Some(format!("{server_uri}/search1")),
        max_concurrent_downloads: 5,
        fetch: FetchConfig {
            listing_retry_delay: Duration::from_millis(10),
            retry_delay: Duration::from_millis(10),
            politeness_delay: Duration::ZERO,
            resolve_retries: 0,
            download_retries: 0,
        },
        page_timeout: Duration::from_secs(10),
        shutdown_grace: Duration::from_secs(2),
        ..Default::default()
    }
}

/// Build an in-memory zip archive from (name, content) pairs
pub(crate) fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut cursor);
        let options =
            zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Stored);
        for (name, content) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap();
    }
    cursor.into_inner()
}

pub(crate) fn listing_html(repos: &[&str], next_href: &str) -> String {
    let mut items = String::new();
    for repo in repos {
        items.push_str(&format!(r#"<li><h3><a href="{repo}">{repo}</a></h3></li>"#));
    }
    format!(
        r#"<html><body>
        <ul class="repo-list">{items}</ul>
        <div class="pagination"><a class="next_page" href="{next_href}">Next</a></div>
        </body></html>"#
    )
}

pub(crate) fn landing_html(archive_href: &str) -> String {
    format!(
        r#"<html><body><a class="get-repo-btn" href="{archive_href}">Download ZIP</a></body></html>"#
    )
}

/// Mount one listing page at `page_path`
pub(crate) async fn mount_listing(
    server: &MockServer,
    page_path: &str,
    repos: &[&str],
    next_href: &str,
) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_html(repos, next_href)))
        .mount(server)
        .await;
}

/// Mount one repository: a landing page at `reference` plus its archive
pub(crate) async fn mount_repo(server: &MockServer, reference: &str, archive: Vec<u8>) {
    let archive_path = format!("{reference}/archive/main.zip");
    Mock::given(method("GET"))
        .and(path(reference))
        .respond_with(ResponseTemplate::new(200).set_body_string(landing_html(&archive_path)))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(archive_path.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(archive))
        .mount(server)
        .await;
}

/// Wait (bounded) for the next `PageCompleted` event, discarding others
pub(crate) async fn next_page_completed(
    rx: &mut tokio::sync::broadcast::Receiver<Event>,
) -> (usize, usize, usize) {
    loop {
        match tokio::time::timeout(Duration::from_secs(10), rx.recv()).await {
            Ok(Ok(Event::PageCompleted {
                published,
                skipped,
                failed,
            })) => return (published, skipped, failed),
            Ok(Ok(_)) => continue,
            Ok(Err(e)) => panic!("event channel closed: {e}"),
            Err(_) => panic!("timed out waiting for PageCompleted"),
        }
    }
}
