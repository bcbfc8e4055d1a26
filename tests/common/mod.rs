//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use tenant_host::config::HostConfig;
use tenant_host::host::Host;
use tenant_host::http::HttpServer;

/// A temporary tenants root populated file by file.
pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn root(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Write a file under the tenants root, creating parent directories.
    pub fn write(&self, relative: &str, content: &str) {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    #[allow(dead_code)]
    pub fn remove(&self, relative: &str) {
        std::fs::remove_file(self.dir.path().join(relative)).unwrap();
    }
}

/// Default host configuration pointed at a fixture root.
pub fn host_config(root: &Path) -> HostConfig {
    let mut config = HostConfig::default();
    config.tenancy.root = root.display().to_string();
    config
}

/// Build a host and run the startup loads.
pub async fn start_host(config: HostConfig) -> Arc<Host> {
    let host = Host::new(config);
    host.load_capabilities().await;
    host.load_all_tenants();
    host
}

/// Spawn the HTTP server on an ephemeral port.
#[allow(dead_code)]
pub async fn spawn_server(host: &Arc<Host>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(host.clone());
    tokio::spawn(async move {
        let _ = server.run(listener).await;
    });
    addr
}

/// Issue one HTTP/1.1 request over a raw socket, so tests can control the
/// Host header exactly. Returns the status code and body.
#[allow(dead_code)]
pub async fn raw_request(
    addr: SocketAddr,
    method: &str,
    path: &str,
    headers: &[(&str, &str)],
) -> (u16, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();

    let mut request = format!("{method} {path} HTTP/1.1\r\n");
    let mut has_host = false;
    for (name, value) in headers {
        if name.eq_ignore_ascii_case("host") {
            has_host = true;
        }
        request.push_str(&format!("{name}: {value}\r\n"));
    }
    if !has_host {
        request.push_str(&format!("Host: {addr}\r\n"));
    }
    request.push_str("Connection: close\r\n\r\n");

    stream.write_all(request.as_bytes()).await.unwrap();
    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();

    let text = String::from_utf8_lossy(&raw).to_string();
    let status = text
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .expect("malformed status line");
    let body = text
        .split_once("\r\n\r\n")
        .map(|(_, body)| body.to_string())
        .unwrap_or_default();
    (status, body)
}
