use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use reqwest::Url;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub target: String,
    pub headers: Vec<(String, String)>,
}

impl RecordedRequest {
    pub fn query(&self, key: &str) -> Option<String> {
        let url = Url::parse(&format!("http://localhost{}", self.target)).ok()?;
        url.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

pub enum Reply {
    Json(String),
    /// Keep the connection open without answering.
    Silent,
}

type Responder = Arc<dyn Fn(&RecordedRequest) -> Reply + Send + Sync>;

/// Minimal stand-in for `powercontroller.py`, one request per connection.
pub struct MockController {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    task: JoinHandle<()>,
}

impl MockController {
    pub async fn start<F>(responder: F) -> Self
    where
        F: Fn(&RecordedRequest) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let responder: Responder = Arc::new(responder);

        let recorded = requests.clone();
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let recorded = recorded.clone();
                let responder = responder.clone();
                tokio::spawn(async move {
                    let _ = Self::serve(stream, recorded, responder).await;
                });
            }
        });

        Self {
            addr,
            requests,
            task,
        }
    }

    /// Answers every request as a controller whose relays do what they are told.
    pub async fn echo() -> Self {
        Self::start(|request| {
            let relay = request.query("switch").unwrap_or_default();
            let status = match request.query("action").as_deref() {
                Some("on") => "on",
                _ => "off",
            };
            Reply::Json(serde_json::json!({ "relay": relay, "status": status }).to_string())
        })
        .await
    }

    pub fn host(&self) -> String {
        self.addr.to_string()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    async fn serve(
        stream: TcpStream,
        recorded: Arc<Mutex<Vec<RecordedRequest>>>,
        responder: Responder,
    ) -> std::io::Result<()> {
        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        reader.read_line(&mut line).await?;
        let target = line.split_whitespace().nth(1).unwrap_or_default().to_string();

        let mut headers = Vec::new();
        loop {
            line.clear();
            if reader.read_line(&mut line).await? == 0 {
                break;
            }
            let header = line.trim_end();
            if header.is_empty() {
                break;
            }
            if let Some((name, value)) = header.split_once(':') {
                headers.push((name.trim().to_string(), value.trim().to_string()));
            }
        }

        let request = RecordedRequest { target, headers };
        recorded.lock().push(request.clone());

        match responder(&request) {
            Reply::Json(body) => {
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let mut stream = reader.into_inner();
                stream.write_all(response.as_bytes()).await?;
                stream.shutdown().await?;
            }
            Reply::Silent => {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
        }
        Ok(())
    }
}

impl Drop for MockController {
    fn drop(&mut self) {
        self.task.abort();
    }
}
