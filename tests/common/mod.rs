//! Shared mock servers for probe tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use phaseprobe::config::{EndpointSpec, TargetConfig};
use phaseprobe::http::params::Params;
use phaseprobe::http::request::Method;
use phaseprobe::probe::ProbeSettings;

/// What the mock server does once it has read a request.
#[derive(Clone)]
pub enum Reply {
    /// Write these bytes, then close.
    Send(Vec<u8>),
    /// Keep the connection open without answering.
    Stall,
    /// Close without writing anything.
    Close,
}

impl Reply {
    pub fn ok(body: &str) -> Self {
        Reply::Send(
            format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            )
            .into_bytes(),
        )
    }

    pub fn raw(bytes: &[u8]) -> Self {
        Reply::Send(bytes.to_vec())
    }
}

pub struct MockServer {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl MockServer {
    /// Raw bytes of every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<Vec<u8>> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_text(&self, index: usize) -> String {
        String::from_utf8_lossy(&self.requests()[index]).into_owned()
    }

    pub fn target(&self, endpoints: Vec<EndpointSpec>) -> TargetConfig {
        TargetConfig {
            scheme: "http".to_string(),
            host: "127.0.0.1".to_string(),
            port: self.addr.port(),
            endpoints,
        }
    }
}

/// Starts a server on an ephemeral port that answers by request path.
pub async fn start_mock_server<F>(route: F) -> MockServer
where
    F: Fn(&str) -> Reply + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let route = Arc::new(route);

    let seen = requests.clone();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };

            let route = route.clone();
            let seen = seen.clone();
            tokio::spawn(async move {
                let Some(request) = read_request(&mut socket).await else {
                    return;
                };
                let path = request_path(&request);
                seen.lock().unwrap().push(request);

                match route(&path) {
                    Reply::Send(bytes) => {
                        let _ = socket.write_all(&bytes).await;
                        let _ = socket.shutdown().await;
                    }
                    Reply::Stall => {
                        tokio::time::sleep(Duration::from_secs(30)).await;
                    }
                    Reply::Close => {}
                }
            });
        }
    });

    MockServer { addr, requests }
}

/// Returns a local port nothing is listening on.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

/// Reads the request head and, when announced, its body.
async fn read_request(socket: &mut TcpStream) -> Option<Vec<u8>> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    loop {
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_string();
            let content_length = head
                .lines()
                .find_map(|l| {
                    let (k, v) = l.split_once(':')?;
                    k.eq_ignore_ascii_case("content-length")
                        .then(|| v.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);

            if buf.len() >= end + 4 + content_length {
                return Some(buf);
            }
        }

        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

fn request_path(request: &[u8]) -> String {
    let text = String::from_utf8_lossy(request);
    let target = text.split_whitespace().nth(1).unwrap_or("/");
    target.split('?').next().unwrap_or("/").to_string()
}

pub fn get(path: &str, query: Params) -> EndpointSpec {
    EndpointSpec {
        path: path.to_string(),
        method: Method::GET,
        query_params: query,
        body_params: Params::new(),
    }
}

pub fn post(path: &str, body: Params) -> EndpointSpec {
    EndpointSpec {
        path: path.to_string(),
        method: Method::POST,
        query_params: Params::new(),
        body_params: body,
    }
}

pub fn fast_settings() -> ProbeSettings {
    ProbeSettings {
        read_timeout: Duration::from_millis(300),
        ..ProbeSettings::default()
    }
}
