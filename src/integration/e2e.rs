//! End-to-end tests: HTTP request in, transcoder output out
//!
//! Upstream stations are served by an in-process axum server and ffmpeg is
//! replaced by a shell script, so the whole path from router to child
//! process runs without network access or media tools.

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;
use futures_util::StreamExt;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt;

use crate::http::create_router;
use crate::integration::fixtures::{
    test_config, wait_until, write_echo_transcoder, RequestLog, TestServer,
};
use crate::state::AppState;
use crate::stations::StationRegistry;

/// Upstream with a live stream, a redirect to it, and a PLS pointing at the
/// redirect. Only `/live` is logged.
fn upstream_app(log: RequestLog) -> Router {
    async fn live(State(log): State<RequestLog>, method: Method) -> &'static str {
        log.record(&method, "/live");
        "endless audio"
    }

    async fn pls(headers: HeaderMap) -> String {
        let host = headers
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .unwrap_or_default();
        format!(
            "[playlist]\nNumberOfEntries=1\nFile1=http://{}/redirect\nTitle1=Test\nVersion=2\n",
            host
        )
    }

    Router::new()
        .route("/live", get(live))
        .route("/redirect", get(|| async { Redirect::temporary("/live") }))
        .route("/radio.pls", get(pls))
        .with_state(log)
}

fn write_stations(dir: &Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("stations.toml");
    std::fs::write(&path, body).unwrap();
    path
}

fn relay_app(transcoder: &Path, stations_file: &Path) -> Router {
    let config = test_config(transcoder, stations_file);
    let stations = StationRegistry::from_file(stations_file).unwrap();
    create_router(Arc::new(AppState::new(config, stations).unwrap()))
}

async fn get_station(app: Router, name: &str) -> Response {
    let request = Request::builder()
        .uri(format!("/s/{}", name))
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap().into_response()
}

async fn body_lines(response: Response) -> Vec<String> {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec())
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

fn arg_after<'a>(lines: &'a [String], flag: &str) -> Option<&'a str> {
    let pos = lines.iter().position(|l| l == flag)?;
    lines.get(pos + 1).map(String::as_str)
}

#[tokio::test]
async fn test_direct_station_relays_transcoder_output() {
    let log = RequestLog::default();
    let upstream = TestServer::new(upstream_app(log.clone())).await;

    let dir = tempfile::tempdir().unwrap();
    let transcoder = write_echo_transcoder(dir.path());
    let stations = write_stations(
        dir.path(),
        &format!("[live]\nurl = \"{}\"\nformat = \"adts\"\n", upstream.url("/live")),
    );

    let response = get_station(relay_app(&transcoder, &stations), "live").await;

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::CONTENT_TYPE], "audio/aac");
    assert_eq!(headers[header::CACHE_CONTROL], "no-store, max-age=0");
    assert_eq!(headers[header::CONNECTION], "close");

    let lines = body_lines(response).await;
    assert_eq!(arg_after(&lines, "-i"), Some(upstream.url("/live").as_str()));
    assert_eq!(arg_after(&lines, "-user_agent"), Some("relay-test/1.0"));
    assert_eq!(arg_after(&lines, "-f"), Some("adts"));

    // The stream body is never downloaded during resolution
    assert_eq!(log.entries(), vec!["HEAD /live"]);
}

#[tokio::test]
async fn test_pls_station_resolves_through_redirect() {
    let log = RequestLog::default();
    let upstream = TestServer::new(upstream_app(log.clone())).await;

    let dir = tempfile::tempdir().unwrap();
    let transcoder = write_echo_transcoder(dir.path());
    let stations = write_stations(
        dir.path(),
        &format!(
            "[radio]\nurl = \"{}\"\nfmt = \"flac\"\nbits = 24\nrate = 48000\n",
            upstream.url("/radio.pls")
        ),
    );

    let response = get_station(relay_app(&transcoder, &stations), "radio").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/flac");

    let lines = body_lines(response).await;
    assert_eq!(arg_after(&lines, "-i"), Some(upstream.url("/redirect").as_str()));
    assert_eq!(arg_after(&lines, "-sample_fmt"), Some("s24"));
    assert_eq!(arg_after(&lines, "-ar"), Some("48000"));
    assert!(log.entries().is_empty());
}

#[tokio::test]
async fn test_client_disconnect_stops_transcoder() {
    use std::os::unix::fs::PermissionsExt;

    let log = RequestLog::default();
    let upstream = TestServer::new(upstream_app(log)).await;

    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("transcoder.pid");
    let transcoder = dir.path().join("looping-ffmpeg");
    std::fs::write(
        &transcoder,
        format!(
            "#!/bin/sh\necho $$ > {}\nwhile true; do printf 'data'; sleep 0.05; done\n",
            pid_file.display()
        ),
    )
    .unwrap();
    std::fs::set_permissions(&transcoder, std::fs::Permissions::from_mode(0o755)).unwrap();

    let stations = write_stations(
        dir.path(),
        &format!("[live]\nurl = \"{}\"\nformat = \"mpegts\"\n", upstream.url("/live")),
    );

    let response = get_station(relay_app(&transcoder, &stations), "live").await;
    assert_eq!(response.headers()[header::CONTENT_TYPE], "video/MP2T");

    let mut body = response.into_body().into_data_stream();
    let first = body.next().await.unwrap().unwrap();
    assert!(!first.is_empty());

    let pid: i32 = std::fs::read_to_string(&pid_file)
        .unwrap()
        .trim()
        .parse()
        .unwrap();
    drop(body);

    let gone = wait_until(Duration::from_secs(5), || {
        kill(Pid::from_raw(pid), None).is_err()
    })
    .await;
    assert!(gone);
}

#[tokio::test]
async fn test_unresolvable_station_is_bad_gateway() {
    let dir = tempfile::tempdir().unwrap();
    let transcoder = write_echo_transcoder(dir.path());
    let stations = write_stations(dir.path(), "[gone]\nurl = \"http://127.0.0.1:1/live\"\n");

    let response = get_station(relay_app(&transcoder, &stations), "gone").await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let lines = body_lines(response).await;
    assert!(lines[0].starts_with("Failed to resolve source: "));
}
