//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use country_gateway::config::settings::GatewaySettings;
use country_gateway::{AppContext, GatewayServer, Shutdown};

/// One request as seen by a mock backend.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// Path plus query, exactly as sent.
    pub target: String,
    /// Lower-cased header names, in arrival order.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// A backend that records every request and answers with a fixed response.
pub struct MockBackend {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockBackend {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> RecordedRequest {
        self.requests().pop().expect("backend received no request")
    }
}

/// Start a recording backend on an ephemeral port.
pub async fn start_recording_backend(
    status: u16,
    body: &'static str,
    headers: &'static [(&'static str, &'static str)],
) -> MockBackend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));

    let recorded = requests.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let recorded = recorded.clone();
                    tokio::spawn(async move {
                        if let Some(request) = read_request(&mut socket).await {
                            recorded.lock().unwrap().push(request);
                        }
                        let mut response = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n",
                            status_line(status),
                            body.len()
                        );
                        for (name, value) in headers {
                            response.push_str(&format!("{name}: {value}\r\n"));
                        }
                        response.push_str("\r\n");
                        response.push_str(body);
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    MockBackend { addr, requests }
}

fn status_line(status: u16) -> &'static str {
    match status {
        200 => "200 OK",
        201 => "201 Created",
        404 => "404 Not Found",
        418 => "418 I'm a teapot",
        500 => "500 Internal Server Error",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    }
}

async fn read_request(socket: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split(' ');
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();

    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k == "content-length")
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buf[header_end + 4..].to_vec();
    while body.len() < content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    Some(RecordedRequest {
        method,
        target,
        headers,
        body,
    })
}

/// A configuration directory under the OS temp dir, removed on drop.
pub struct TestConfigDir {
    path: PathBuf,
}

impl TestConfigDir {
    /// US on `atomic`, DE on `upvest` (disabled for `stage`).
    pub fn new(atomic_url: &str, upvest_url: &str) -> Self {
        let path = std::env::temp_dir().join(format!("gateway-it-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(path.join("services")).unwrap();
        let dir = Self { path };

        dir.write(
            "countries.yaml",
            r#"
countries:
  US:
    service: atomic
  DE:
    service: upvest
    environments:
      stage: false
"#,
        );
        dir.write(
            "services/atomic.yaml",
            &format!(
                r#"
service:
  name: atomic
  base_url: {atomic_url}
  endpoints:
    GetAccount:
      method: GET
      uri: /accounts
    GetTransactions:
      method: GET
      uri: /accounts/{{id}}/transactions
"#
            ),
        );
        dir.write(
            "services/upvest.yaml",
            &format!(
                r#"
service:
  name: upvest
  base_url: {upvest_url}
  endpoints:
    GetAccount:
      method: GET
      uri: /accounts
    CreateOrder:
      method: POST
      uri: /orders
"#
            ),
        );
        dir
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, relative: &str, content: &str) {
        fs::write(self.path.join(relative), content).unwrap();
    }
}

impl Drop for TestConfigDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

/// Default settings for a gateway reading `dir`.
pub fn settings_for(dir: &TestConfigDir, environment: &str) -> GatewaySettings {
    let mut settings = GatewaySettings {
        config_dir: dir.path().to_path_buf(),
        environment: Some(environment.to_string()),
        ..GatewaySettings::default()
    };
    settings.listener.bind_address = "127.0.0.1:0".to_string();
    settings.upstream.timeout_secs = 5;
    settings
}

/// A gateway serving on an ephemeral port.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub context: AppContext,
    pub shutdown: Shutdown,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn start_gateway(settings: GatewaySettings) -> TestGateway {
    let context = AppContext::initialize(settings).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = GatewayServer::new(context.clone());
    tokio::spawn(server.run(listener, shutdown.subscribe()));

    TestGateway {
        addr,
        context,
        shutdown,
    }
}

/// Client that never pools connections, so each test request is independent.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
