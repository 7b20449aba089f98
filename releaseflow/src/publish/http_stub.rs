//! One-shot HTTP server used to exercise the clients over a real socket.

use std::collections::HashMap;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// What the server received.
#[derive(Debug, Clone)]
pub(crate) struct CapturedRequest {
    pub method: String,
    pub path: String,
    /// Header names are lowercased.
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Value of a `multipart/form-data` field, assuming a text body.
    pub fn form_field(&self, name: &str) -> Option<String> {
        let body = self.body_text();
        let marker = format!("; name=\"{name}\"");
        let rest = &body[body.find(&marker)? + marker.len()..];
        let rest = &rest[rest.find("\r\n\r\n")? + 4..];
        let end = rest.find("\r\n--")?;
        Some(rest[..end].to_string())
    }
}

/// Accepts a single connection and answers it with a canned response.
pub(crate) struct StubServer {
    pub base_url: String,
    handle: JoinHandle<CapturedRequest>,
}

impl StubServer {
    pub async fn respond(status: u16, body: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let body = body.to_string();

        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (reader, mut writer) = stream.into_split();
            let request = read_request(&mut BufReader::new(reader)).await;

            let response = format!(
                "HTTP/1.1 {status} Stub\r\n\
                 content-type: application/json\r\n\
                 content-length: {}\r\n\
                 connection: close\r\n\r\n{body}",
                body.len()
            );
            writer.write_all(response.as_bytes()).await.unwrap();
            writer.shutdown().await.ok();
            request
        });

        Self {
            base_url: format!("http://{addr}"),
            handle,
        }
    }

    /// Waits for the captured request.
    pub async fn request(self) -> CapturedRequest {
        self.handle.await.unwrap()
    }
}

/// A base URL nothing is listening on.
pub(crate) async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

async fn read_request(reader: &mut BufReader<OwnedReadHalf>) -> CapturedRequest {
    let mut line = String::new();
    reader.read_line(&mut line).await.unwrap();
    let mut parts = line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let mut headers = HashMap::new();
    loop {
        line.clear();
        reader.read_line(&mut line).await.unwrap();
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            break;
        }
        if let Some((name, value)) = trimmed.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    let body = if let Some(len) = headers.get("content-length") {
        let mut body = vec![0u8; len.parse().unwrap()];
        reader.read_exact(&mut body).await.unwrap();
        body
    } else if headers
        .get("transfer-encoding")
        .is_some_and(|v| v.eq_ignore_ascii_case("chunked"))
    {
        read_chunked(reader).await
    } else {
        Vec::new()
    };

    CapturedRequest {
        method,
        path,
        headers,
        body,
    }
}

async fn read_chunked(reader: &mut BufReader<OwnedReadHalf>) -> Vec<u8> {
    let mut body = Vec::new();
    let mut line = String::new();
    loop {
        line.clear();
        reader.read_line(&mut line).await.unwrap();
        let size_field = line.trim_end().split(';').next().unwrap_or_default();
        let size = usize::from_str_radix(size_field, 16).unwrap();
        if size == 0 {
            // trailers, then the terminating blank line
            loop {
                line.clear();
                reader.read_line(&mut line).await.unwrap();
                if line.trim_end().is_empty() {
                    return body;
                }
            }
        }
        let start = body.len();
        body.resize(start + size, 0);
        reader.read_exact(&mut body[start..]).await.unwrap();
        let mut crlf = [0u8; 2];
        reader.read_exact(&mut crlf).await.unwrap();
    }
}
