use anyhow::Context as _;
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::routing::any;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Pick an unused TCP port on localhost.
///
/// Note: this does not reserve the port; it's still possible for another process to bind it
/// before you do. Tests use it mostly to get a port nothing is listening on.
///
/// # Errors
///
/// Returns an error if binding an ephemeral localhost port fails or if the bound socket's
/// local address cannot be read.
pub fn pick_unused_port() -> anyhow::Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0").context("bind ephemeral port")?;
    Ok(listener.local_addr()?.port())
}

/// A request received by [`FakeMockServer`].
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

impl CapturedRequest {
    /// Body parsed as JSON (`Null` if it is not valid JSON).
    #[must_use]
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap_or(serde_json::Value::Null)
    }
}

#[derive(Debug, Clone)]
struct Scripted {
    status: StatusCode,
    body: String,
    delay: Duration,
}

#[derive(Default)]
struct FakeState {
    captured: Mutex<Vec<CapturedRequest>>,
    scripts: Mutex<HashMap<String, Scripted>>,
}

/// In-process stand-in for a MockServer instance.
///
/// Records every request and answers each path with a scripted status/body (default: `200`
/// with an empty body). Shuts down when dropped.
pub struct FakeMockServer {
    addr: SocketAddr,
    state: Arc<FakeState>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl FakeMockServer {
    /// Bind `127.0.0.1:0` and start serving.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn start() -> anyhow::Result<Self> {
        let state = Arc::new(FakeState::default());
        let app = Router::new()
            .route("/{*path}", any(handle))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("bind fake mockserver")?;
        let addr = listener.local_addr().context("fake mockserver local_addr")?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });
        let handle = tokio::spawn(async move {
            let _ = server.await;
        });

        Ok(Self {
            addr,
            state,
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    #[must_use]
    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Answer `path` with `status` and `body` from now on.
    pub fn respond(&self, path: &str, status: u16, body: impl Into<String>) {
        self.respond_after(path, status, body, Duration::ZERO);
    }

    /// Like [`Self::respond`], but wait `delay` before answering.
    pub fn respond_after(&self, path: &str, status: u16, body: impl Into<String>, delay: Duration) {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        self.state.scripts.lock().insert(
            path.to_string(),
            Scripted {
                status,
                body: body.into(),
                delay,
            },
        );
    }

    /// Every request received so far, in arrival order.
    #[must_use]
    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.state.captured.lock().clone()
    }

    /// Requests received for `path`, in arrival order.
    #[must_use]
    pub fn requests_to(&self, path: &str) -> Vec<CapturedRequest> {
        self.state
            .captured
            .lock()
            .iter()
            .filter(|r| r.path == path)
            .cloned()
            .collect()
    }

    /// Stop serving and wait for the server task to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for FakeMockServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

async fn handle(
    State(state): State<Arc<FakeState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    let path = uri.path().to_string();
    state.captured.lock().push(CapturedRequest {
        method: method.as_str().to_string(),
        path: path.clone(),
        query: uri.query().map(str::to_string),
        content_type: headers
            .get(axum::http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: String::from_utf8_lossy(&body).into_owned(),
    });

    let scripted = state.scripts.lock().get(&path).cloned();
    let Some(scripted) = scripted else {
        return (StatusCode::OK, String::new());
    };
    if !scripted.delay.is_zero() {
        tokio::time::sleep(scripted.delay).await;
    }
    (scripted.status, scripted.body)
}

/// A TCP peer that reads one HTTP request per connection and answers with fixed raw bytes.
///
/// For responses a well-behaved HTTP server would never produce: non-HTTP replies, bodies
/// shorter than their `Content-Length`.
pub struct RawPeer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl RawPeer {
    /// Bind `127.0.0.1:0` and answer every connection with `reply`, then close it.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn start(reply: impl Into<Vec<u8>>) -> anyhow::Result<Self> {
        let reply: Arc<[u8]> = reply.into().into();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("bind raw peer")?;
        let addr = listener.local_addr().context("raw peer local_addr")?;

        let handle = tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let reply = reply.clone();
                tokio::spawn(async move {
                    if read_request(&mut stream).await.is_err() {
                        return;
                    }
                    let _ = stream.write_all(&reply).await;
                    let _ = stream.shutdown().await;
                });
            }
        });

        Ok(Self { addr, handle })
    }

    #[must_use]
    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

impl Drop for RawPeer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Consume headers and a `Content-Length` body so closing the socket does not reset it.
async fn read_request(stream: &mut tokio::net::TcpStream) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);

        let Some(header_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
        let content_length = headers
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if buf.len() >= header_end + 4 + content_length {
            return Ok(());
        }
    }
}
