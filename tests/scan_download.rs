//! End-to-end test: scan a stub HTML page, then download what it references.

use std::sync::mpsc as std_mpsc;
use std::thread;
use std::time::Duration;

use tokio::sync::mpsc;
use url::Url;

use gifgrab::config::Settings;
use gifgrab::fetch::HttpClient;
use gifgrab::models::RunContext;
use gifgrab::services::{DownloadEvent, DownloadService};
use gifgrab::strategies::{Pipeline, ResolvedVia};

static WEBP_BODY: &[u8] = b"RIFF\x1a\x00\x00\x00WEBPVP8 ";
static GIF_BODY: &[u8] = b"GIF89a\x01\x00\x01\x00";

// The script URL is absolute: only markup attributes are resolved against
// the page URL, the raw-text pass matches full URLs.
fn gallery_html(base_url: &str) -> String {
    format!(
        r#"<!doctype html>
<html>
  <body>
    <img data-src="/media/first.gif" alt="">
    <a href="/media/second.webp">download</a>
    <img src="/media/first.gif">
    <img src="/photo.jpeg">
    <script>var preload = {{"next": "{base_url}/media/third.gif"}};</script>
  </body>
</html>
"#
    )
}

fn spawn_gallery_server() -> (String, std_mpsc::Sender<()>, thread::JoinHandle<()>) {
    let server = tiny_http::Server::http("127.0.0.1:0").expect("start tiny_http server");
    let addr = server.server_addr();
    let base_url = format!("http://{addr}");

    let (shutdown_tx, shutdown_rx) = std_mpsc::channel::<()>();

    let page_body = gallery_html(&base_url);
    let handle = thread::spawn(move || loop {
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        let request = match server.recv_timeout(Duration::from_millis(50)) {
            Ok(Some(req)) => req,
            Ok(None) => continue,
            Err(_) => break,
        };

        let path = request.url().split('?').next().unwrap_or("").to_string();
        let (status, body, content_type): (u16, Vec<u8>, &str) = match path.as_str() {
            "/gallery" => (200, page_body.as_bytes().to_vec(), "text/html; charset=utf-8"),
            "/media/first.gif" => (200, GIF_BODY.to_vec(), "image/gif"),
            "/media/second.webp" => (200, WEBP_BODY.to_vec(), "image/webp"),
            // Referenced from the inline script; served only as a miss so
            // one target exercises the failure path.
            "/media/third.gif" => (404, b"gone".to_vec(), "text/plain"),
            _ => (404, b"not found".to_vec(), "text/plain"),
        };

        let header =
            tiny_http::Header::from_bytes(&b"Content-Type"[..], content_type.as_bytes())
                .expect("build header");
        let response = tiny_http::Response::from_data(body)
            .with_status_code(status)
            .with_header(header);
        let _ = request.respond(response);
    });

    (base_url, shutdown_tx, handle)
}

#[tokio::test]
async fn scan_then_download_a_gallery_page() {
    let (base_url, shutdown_tx, server) = spawn_gallery_server();
    let dir = tempfile::tempdir().unwrap();
    let page_url = Url::parse(&format!("{base_url}/gallery")).unwrap();

    let mut settings = Settings::default();
    settings.capture.enabled = false;
    settings.request_timeout_secs = 5;

    let client = HttpClient::new(
        Duration::from_secs(settings.request_timeout_secs),
        Duration::ZERO,
    );
    let pipeline = Pipeline::new(client.clone(), &settings);

    let outcome = pipeline.resolve(&page_url, settings.max_downloads, None).await;
    assert_eq!(outcome.via, ResolvedVia::Scan);
    assert!(outcome.notice.is_none());

    // first.gif deduplicated, photo.jpeg filtered; scan order preserved.
    let urls: Vec<String> = outcome
        .targets
        .iter()
        .map(|t| t.candidates()[0].to_string())
        .collect();
    assert_eq!(
        urls,
        vec![
            format!("{base_url}/media/first.gif"),
            format!("{base_url}/media/second.webp"),
            format!("{base_url}/media/third.gif"),
        ]
    );

    let ctx = RunContext::new(page_url, settings.max_downloads)
        .with_output_dir(dir.path().to_path_buf());
    let service = DownloadService::new(
        client.with_referer(ctx.referer().to_string()),
        settings.formats.clone(),
    );

    let (tx, mut rx) = mpsc::channel::<DownloadEvent>(100);
    let drain = tokio::spawn(async move { while rx.recv().await.is_some() {} });

    let summary = service.download_all(&outcome.targets, &ctx, tx).await.unwrap();
    let _ = drain.await;

    assert_eq!(summary.ok_count, 2);
    assert_eq!(summary.fail_count, 1);
    assert_eq!(
        std::fs::read(dir.path().join("first.gif")).unwrap(),
        GIF_BODY
    );
    assert_eq!(
        std::fs::read(dir.path().join("second.webp")).unwrap(),
        WEBP_BODY
    );
    assert!(!dir.path().join("third.gif").exists());

    let _ = shutdown_tx.send(());
    let _ = server.join();
}

#[tokio::test]
async fn empty_page_resolves_to_nothing_without_capture() {
    let (base_url, shutdown_tx, server) = spawn_gallery_server();
    let page_url = Url::parse(&format!("{base_url}/nothing-here")).unwrap();

    let mut settings = Settings::default();
    settings.capture.enabled = false;
    settings.request_timeout_secs = 5;

    let client = HttpClient::new(Duration::from_secs(5), Duration::ZERO);
    let pipeline = Pipeline::new(client, &settings);

    let outcome = pipeline.resolve(&page_url, settings.max_downloads, None).await;
    assert!(outcome.targets.is_empty());
    assert_eq!(outcome.via, ResolvedVia::Nothing);

    let _ = shutdown_tx.send(());
    let _ = server.join();
}
