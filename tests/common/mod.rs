//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::StatusCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use vvproxy::config::ShimVariant;
use vvproxy::http::Forwarder;
use vvproxy::{CompatShim, ProxyServer, Shutdown};

/// What the mock backend answers with.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub body: String,
    pub headers: Vec<(&'static str, String)>,
}

impl MockResponse {
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            headers: vec![("Content-Type", "application/json".to_string())],
        }
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            headers: vec![("Content-Type", "text/plain".to_string())],
        }
    }

    pub fn no_content() -> Self {
        Self {
            status: 204,
            body: String::new(),
            headers: Vec::new(),
        }
    }
}

/// Request line seen by the mock backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seen {
    pub method: String,
    pub target: String,
}

/// Log of requests received by a mock backend.
pub type SeenLog = Arc<Mutex<Vec<Seen>>>;

/// Bind an ephemeral port on localhost.
pub async fn ephemeral_listener() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// A localhost port with nothing listening on it.
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Start a programmable mock backend. `f` gets `(method, target)`.
pub async fn start_programmable_backend<F, Fut>(f: F) -> (SocketAddr, SeenLog)
where
    F: Fn(String, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = MockResponse> + Send + 'static,
{
    let (listener, addr) = ephemeral_listener().await;
    let f = Arc::new(f);
    let seen: SeenLog = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let f = f.clone();
                    let log = log.clone();
                    tokio::spawn(async move {
                        let _ = serve_one(socket, f, log).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, seen)
}

/// Start a mock backend that routes on the request target only.
pub async fn start_routed_backend<F>(route: F) -> (SocketAddr, SeenLog)
where
    F: Fn(&str) -> MockResponse + Send + Sync + 'static,
{
    let route = Arc::new(route);
    start_programmable_backend(move |_method, target| {
        let route = route.clone();
        async move { route(&target) }
    })
    .await
}

async fn serve_one<F, Fut>(
    mut socket: TcpStream,
    f: Arc<F>,
    log: SeenLog,
) -> std::io::Result<()>
where
    F: Fn(String, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = MockResponse> + Send + 'static,
{
    let (method, target) = read_request(&mut socket).await?;
    log.lock().unwrap().push(Seen {
        method: method.clone(),
        target: target.clone(),
    });

    let response = f(method, target).await;
    let reason = StatusCode::from_u16(response.status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown");

    let mut head = format!("HTTP/1.1 {} {}\r\n", response.status, reason);
    for (name, value) in &response.headers {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    if response.status != 204 {
        head.push_str(&format!("Content-Length: {}\r\n", response.body.len()));
    }
    head.push_str("Connection: close\r\n\r\n");

    socket.write_all(head.as_bytes()).await?;
    if response.status != 204 {
        socket.write_all(response.body.as_bytes()).await?;
    }
    socket.shutdown().await?;
    tokio::time::sleep(Duration::from_millis(10)).await;
    Ok(())
}

/// Read one request head plus its `Content-Length` body.
async fn read_request(socket: &mut TcpStream) -> std::io::Result<(String, String)> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let target = request_line.next().unwrap_or_default().to_string();

    let content_length = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let mut received = buf.len() - head_end;
    while received < content_length {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        received += n;
    }

    Ok((method, target))
}

/// Start a proxy in front of `backend_port`. Returns its address and the
/// shutdown handle that stops it.
pub async fn start_proxy(backend_port: u16, shim: CompatShim) -> (SocketAddr, Shutdown) {
    let forwarder = Forwarder::new("127.0.0.1", backend_port, false).unwrap();
    let server = ProxyServer::new("test-engine", forwarder, shim);
    let (listener, addr) = ephemeral_listener().await;

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    (addr, shutdown)
}

/// Shim with no asset directory worth reading.
pub fn shim(variant: ShimVariant) -> CompatShim {
    CompatShim::new(variant, "/nonexistent/assets")
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
