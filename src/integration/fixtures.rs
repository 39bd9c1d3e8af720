//! Test fixtures for integration tests
//!
//! Provides a throwaway upstream HTTP server, a request recorder, and a
//! stand-in transcoder script so the relay pipeline can be exercised without
//! real radio stations or ffmpeg.

use axum::http::Method;
use axum::Router;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

use crate::config::ServerConfig;

/// Upstream HTTP server bound to an ephemeral localhost port
pub struct TestServer {
    addr: SocketAddr,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    pub async fn new(router: Router) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        let server = axum::serve(listener, router).with_graceful_shutdown(async {
            shutdown_rx.await.ok();
        });

        tokio::spawn(async move {
            server.await.unwrap();
        });

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Absolute URL for `path` on this server
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
    }
}

/// Records `"<METHOD> <path>"` for every request a handler sees
#[derive(Debug, Clone, Default)]
pub struct RequestLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl RequestLog {
    pub fn record(&self, method: &Method, path: &str) {
        self.entries
            .lock()
            .unwrap()
            .push(format!("{} {}", method, path));
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }
}

/// Write an executable shell script standing in for ffmpeg.
///
/// The script prints each argument it received on its own line, which lets
/// tests assert on the exact invocation through the relayed body.
#[cfg(unix)]
pub fn write_echo_transcoder(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-ffmpeg");
    std::fs::write(&path, "#!/bin/sh\nprintf '%s\\n' \"$@\"\n").unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Server configuration with short timeouts suitable for tests
pub fn test_config(transcoder: &Path, stations_file: &Path) -> ServerConfig {
    let mut config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        user_agent: "relay-test/1.0".to_string(),
        stations_file: stations_file.to_string_lossy().to_string(),
        ..Default::default()
    };
    config.transcoder.program = transcoder.to_string_lossy().to_string();
    config.transcoder.terminate_grace_ms = 200;
    config.relay.stall_timeout_secs = 2;
    config.relay.poll_interval_ms = 10;
    config.http.resolve_timeout_secs = 5;
    config.http.read_timeout_secs = 5;
    config
}

/// Poll until `f` holds or `timeout` elapses
pub async fn wait_until<F: Fn() -> bool>(timeout: Duration, f: F) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if f() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    f()
}
