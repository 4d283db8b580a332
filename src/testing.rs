// src/testing.rs
//
// Test doubles shared by the module tests: a scripted HTTP server and an
// in-memory object sink.

use crate::error::BoxError;
use crate::store::{Destination, ObjectSink};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    time::timeout,
};
use url::Url;

#[derive(Debug, Clone)]
pub struct Scripted {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub body: Vec<u8>,
}

impl Scripted {
    pub fn status(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }
}

/// Local HTTP server replaying `script` one response per request; the last
/// entry repeats once the script runs out. Request lines are recorded in
/// arrival order.
pub struct ScriptedServer {
    pub url: Url,
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl ScriptedServer {
    pub async fn start(script: Vec<Scripted>) -> Self {
        assert!(!script.is_empty(), "script needs at least one response");
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let (counter, lines) = (hits.clone(), requests.clone());

        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let Some(head) = read_request(&mut stream).await else {
                    continue;
                };
                lines
                    .lock()
                    .unwrap()
                    .push(head.lines().next().unwrap_or_default().to_string());

                let n = counter.fetch_add(1, Ordering::SeqCst);
                let reply = script.get(n).unwrap_or(&script[script.len() - 1]);
                let reason = StatusCode::from_u16(reply.status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or("Unknown");

                let mut head = format!(
                    "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n",
                    reply.status,
                    reason,
                    reply.body.len()
                );
                for (name, value) in &reply.headers {
                    head.push_str(&format!("{}: {}\r\n", name, value));
                }
                head.push_str("\r\n");

                let _ = stream.write_all(head.as_bytes()).await;
                let _ = stream.write_all(&reply.body).await;
                let _ = stream.shutdown().await;
                // let the client close first so unread bytes never reset the socket
                let mut rest = [0u8; 1024];
                let _ = timeout(Duration::from_millis(200), async {
                    while matches!(stream.read(&mut rest).await, Ok(n) if n > 0) {}
                })
                .await;
            }
        });

        Self {
            url: Url::parse(&format!("http://{}/dataset.xls", addr)).unwrap(),
            addr,
            hits,
            requests,
        }
    }

    /// Base URL for clients that take an endpoint rather than a full URL.
    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Request lines seen so far, e.g. `DELETE /b/key?uploadId=1 HTTP/1.1`.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// Read one request, body included, and return its head.
async fn read_request(stream: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        if let Some(i) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break i + 4;
        }
        let n = stream.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };
    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();

    let header = |name: &str| {
        head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim().to_ascii_lowercase())
        })
    };
    if header("expect").as_deref() == Some("100-continue") {
        let _ = stream.write_all(b"HTTP/1.1 100 Continue\r\n\r\n").await;
    }

    let mut body = buf.split_off(head_end);
    if let Some(len) = header("content-length").and_then(|v| v.parse::<usize>().ok()) {
        while body.len() < len {
            let n = stream.read(&mut chunk).await.unwrap_or(0);
            if n == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..n]);
        }
    } else if header("transfer-encoding").is_some_and(|v| v.contains("chunked")) {
        while !body.ends_with(b"0\r\n\r\n") {
            let n = stream.read(&mut chunk).await.unwrap_or(0);
            if n == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..n]);
        }
    }
    Some(head)
}

/// Client that ignores proxy settings from the environment.
pub fn local_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

pub type SinkCalls = Arc<Mutex<Vec<(Destination, Bytes)>>>;

/// Records every `put`; fails all of them when `fail` is set.
pub struct MemorySink {
    name: &'static str,
    fail: bool,
    calls: SinkCalls,
}

impl MemorySink {
    pub fn succeeding(name: &'static str) -> Self {
        Self {
            name,
            fail: false,
            calls: SinkCalls::default(),
        }
    }

    pub fn failing(name: &'static str) -> Self {
        Self {
            fail: true,
            ..Self::succeeding(name)
        }
    }

    pub fn calls(&self) -> SinkCalls {
        self.calls.clone()
    }
}

#[async_trait]
impl ObjectSink for MemorySink {
    fn name(&self) -> &str {
        self.name
    }

    async fn put(&self, dest: &Destination, body: Bytes) -> Result<(), BoxError> {
        self.calls.lock().unwrap().push((dest.clone(), body));
        if self.fail {
            return Err(format!("{} sink refused write", self.name).into());
        }
        Ok(())
    }
}
