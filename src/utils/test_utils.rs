use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

use crate::core::acquire::ResponseAcquirer;
use crate::core::message::ConversationMessage;
use crate::core::transport::AgentHandle;

/// Canned reply for one request path.
#[derive(Clone)]
pub enum StubReply {
    /// Sent in one write.
    Full { status: u16, content_type: String, body: String },
    /// Sent as separate writes so the client sees several body chunks.
    Chunked {
        content_type: String,
        chunks: Vec<String>,
        delay: Duration,
    },
    /// Sends the chunks without a content length, then keeps the connection
    /// open without finishing the body.
    Stalled { content_type: String, chunks: Vec<String> },
    /// Accepts the request and never answers.
    Hang,
}

impl StubReply {
    pub fn json(status: u16, body: Value) -> Self {
        StubReply::Full {
            status,
            content_type: "application/json".to_string(),
            body: body.to_string(),
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        StubReply::Full {
            status,
            content_type: "text/plain".to_string(),
            body: body.to_string(),
        }
    }

    pub fn event_stream(chunks: &[&str]) -> Self {
        Self::slow_event_stream(chunks, Duration::from_millis(10))
    }

    /// Event stream pausing `delay` after every chunk.
    pub fn slow_event_stream(chunks: &[&str], delay: Duration) -> Self {
        StubReply::Chunked {
            content_type: "text/event-stream".to_string(),
            chunks: chunks.iter().map(|chunk| chunk.to_string()).collect(),
            delay,
        }
    }

    pub fn stalled_event_stream(chunks: &[&str]) -> Self {
        StubReply::Stalled {
            content_type: "text/event-stream".to_string(),
            chunks: chunks.iter().map(|chunk| chunk.to_string()).collect(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CapturedRequest {
    pub path: String,
    pub body: Value,
}

/// Minimal HTTP/1.1 backend serving canned replies by path.
pub struct StubServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    task: tokio::task::JoinHandle<()>,
}

impl StubServer {
    pub async fn start(routes: Vec<(&str, StubReply)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("listener should bind");
        let addr = listener.local_addr().expect("local addr should resolve");
        let routes: Arc<HashMap<String, StubReply>> = Arc::new(
            routes
                .into_iter()
                .map(|(path, reply)| (path.to_string(), reply))
                .collect(),
        );
        let requests = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&requests);

        let task = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let routes = Arc::clone(&routes);
                let captured = Arc::clone(&captured);
                tokio::spawn(async move {
                    let _ = serve_connection(stream, routes, captured).await;
                });
            }
        });

        Self {
            base_url: format!("http://{addr}/api"),
            requests,
            task,
        }
    }

    pub async fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn paths(&self) -> Vec<String> {
        self.requests()
            .await
            .into_iter()
            .map(|request| request.path)
            .collect()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve_connection(
    mut stream: TcpStream,
    routes: Arc<HashMap<String, StubReply>>,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
) -> Result<(), String> {
    let (request_line, body) = read_http_request(&mut stream).await?;
    let path = request_line
        .split_whitespace()
        .nth(1)
        .unwrap_or_default()
        .to_string();
    let body = serde_json::from_slice(&body).unwrap_or(Value::Null);
    captured.lock().await.push(CapturedRequest {
        path: path.clone(),
        body,
    });

    let reply = routes
        .get(&path)
        .cloned()
        .unwrap_or_else(|| StubReply::text(404, "not found"));

    match reply {
        StubReply::Full {
            status,
            content_type,
            body,
        } => {
            let response = format!(
                "HTTP/1.1 {status} {}\r\ncontent-type: {content_type}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                reason_phrase(status),
                body.len()
            );
            stream
                .write_all(response.as_bytes())
                .await
                .map_err(|err| err.to_string())?;
        }
        StubReply::Chunked {
            content_type,
            chunks,
            delay,
        } => {
            let total: usize = chunks.iter().map(String::len).sum();
            let head = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: {content_type}\r\ncontent-length: {total}\r\nconnection: close\r\n\r\n"
            );
            stream
                .write_all(head.as_bytes())
                .await
                .map_err(|err| err.to_string())?;
            for chunk in chunks {
                stream
                    .write_all(chunk.as_bytes())
                    .await
                    .map_err(|err| err.to_string())?;
                stream.flush().await.map_err(|err| err.to_string())?;
                tokio::time::sleep(delay).await;
            }
        }
        StubReply::Stalled {
            content_type,
            chunks,
        } => {
            let head = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: {content_type}\r\nconnection: close\r\n\r\n"
            );
            stream
                .write_all(head.as_bytes())
                .await
                .map_err(|err| err.to_string())?;
            for chunk in chunks {
                stream
                    .write_all(chunk.as_bytes())
                    .await
                    .map_err(|err| err.to_string())?;
            }
            stream.flush().await.map_err(|err| err.to_string())?;
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        StubReply::Hang => {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
    }

    let _ = stream.shutdown().await;
    Ok(())
}

async fn read_http_request(stream: &mut TcpStream) -> Result<(String, Vec<u8>), String> {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; 4096];
    let header_end = loop {
        let read = stream
            .read(&mut chunk)
            .await
            .map_err(|err| err.to_string())?;
        if read == 0 {
            return Err("Unexpected EOF while reading HTTP headers".to_string());
        }
        buffer.extend_from_slice(&chunk[..read]);
        if let Some(pos) = buffer.windows(4).position(|window| window == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default().to_string();
    let content_length = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buffer[header_end..].to_vec();
    while body.len() < content_length {
        let read = stream
            .read(&mut chunk)
            .await
            .map_err(|err| err.to_string())?;
        if read == 0 {
            return Err("Unexpected EOF while reading HTTP body".to_string());
        }
        body.extend_from_slice(&chunk[..read]);
    }
    body.truncate(content_length);

    Ok((request_line, body))
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Status",
    }
}

/// Acquirer whose HTTP client ignores proxy settings from the environment.
pub fn test_acquirer() -> ResponseAcquirer {
    let client = reqwest::Client::builder()
        .no_proxy()
        .build()
        .expect("client should build");
    ResponseAcquirer::with_client(client)
}

/// In-process agent returning a fixed result and recording what it saw.
pub struct ScriptedAgent {
    pub result: Result<Value, String>,
    pub delay: Option<Duration>,
    pub seen: Mutex<Vec<(Vec<ConversationMessage>, String)>>,
}

impl ScriptedAgent {
    pub fn replying(result: Value) -> Self {
        Self {
            result: Ok(result),
            delay: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            delay: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl AgentHandle for ScriptedAgent {
    async fn generate(
        &self,
        messages: &[ConversationMessage],
        thread_id: &str,
    ) -> Result<Value, String> {
        self.seen
            .lock()
            .await
            .push((messages.to_vec(), thread_id.to_string()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.result.clone()
    }
}
