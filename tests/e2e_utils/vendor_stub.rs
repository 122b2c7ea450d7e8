#![cfg(test)]
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use url::Url;

/// Minimal HTTP server standing in for a lease vendor. Answers every
/// request with one canned status and body, and records everything it
/// served: the path-and-query per request, plus the raw request head
/// for header assertions.
pub struct VendorStub {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
    raw_requests: Arc<Mutex<Vec<String>>>,
    _server_handle: JoinHandle<()>,
}

impl VendorStub {
    pub async fn start(status: u16, body: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let requests = Arc::new(Mutex::new(Vec::new()));
        let raw_requests = Arc::new(Mutex::new(Vec::new()));
        let body = body.to_string();

        let server_handle = {
            let requests = requests.clone();
            let raw_requests = raw_requests.clone();
            tokio::spawn(async move {
                loop {
                    match listener.accept().await {
                        Ok((socket, _addr)) => {
                            let requests = requests.clone();
                            let raw_requests = raw_requests.clone();
                            let body = body.clone();
                            tokio::spawn(async move {
                                Self::handle_connection(socket, status, body, requests, raw_requests)
                                    .await;
                            });
                        }
                        Err(_) => break,
                    }
                }
            })
        };

        Ok(Self {
            addr,
            requests,
            raw_requests,
            _server_handle: server_handle,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> Url {
        Url::parse(&format!("http://{}", self.addr)).unwrap()
    }

    /// Request targets served so far, in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Raw request heads served so far, in arrival order.
    pub fn raw_requests(&self) -> Vec<String> {
        self.raw_requests.lock().unwrap().clone()
    }

    async fn handle_connection(
        mut socket: TcpStream,
        status: u16,
        body: String,
        requests: Arc<Mutex<Vec<String>>>,
        raw_requests: Arc<Mutex<Vec<String>>>,
    ) {
        let mut buffer = vec![0; 4096];
        match socket.read(&mut buffer).await {
            Ok(n) if n > 0 => {
                let request = String::from_utf8_lossy(&buffer[..n]);
                eprintln!("[VendorStub] Received request:\n{}", request);
                raw_requests.lock().unwrap().push(request.to_string());

                if let Some(first_line) = request.lines().next() {
                    let parts: Vec<&str> = first_line.split_whitespace().collect();
                    if parts.len() >= 2 {
                        requests.lock().unwrap().push(parts[1].to_string());
                    }
                }

                let reason = match status {
                    200 => "OK",
                    401 => "Unauthorized",
                    500 => "Internal Server Error",
                    502 => "Bad Gateway",
                    _ => "Canned",
                };
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    reason,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
            }
            _ => {}
        }
    }
}
