//! Mock OpenAI Realtime server
//!
//! Accepts a single WebSocket connection, records the handshake headers and
//! every client event, answers `session.update` with `session.updated`, and
//! lets the test push arbitrary server frames.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

/// How long `wait_for` polls before giving up.
const WAIT_TIMEOUT: Duration = Duration::from_secs(3);

/// Headers captured during the WebSocket handshake.
#[derive(Debug, Clone, Default)]
pub struct Handshake {
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub openai_beta: Option<String>,
}

enum Push {
    Text(String),
    Close,
}

pub struct RealtimeMock {
    /// Base URL to hand to the client (no query string)
    pub url: String,
    handshake: Arc<Mutex<Option<Handshake>>>,
    received: Arc<Mutex<Vec<Value>>>,
    client_closed: Arc<AtomicBool>,
    push_tx: mpsc::UnboundedSender<Push>,
}

impl RealtimeMock {
    /// Bind to an ephemeral port and serve one connection.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock listener");
        let addr = listener.local_addr().expect("Mock listener has no address");

        let handshake = Arc::new(Mutex::new(None));
        let received = Arc::new(Mutex::new(Vec::new()));
        let client_closed = Arc::new(AtomicBool::new(false));
        let (push_tx, mut push_rx) = mpsc::unbounded_channel::<Push>();

        let handshake_slot = handshake.clone();
        let received_log = received.clone();
        let closed_flag = client_closed.clone();

        tokio::spawn(async move {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };

            let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                let header = |name: &str| {
                    req.headers()
                        .get(name)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string)
                };
                *handshake_slot.lock().unwrap() = Some(Handshake {
                    path: req.uri().path().to_string(),
                    query: req.uri().query().map(str::to_string),
                    authorization: header("authorization"),
                    openai_beta: header("openai-beta"),
                });
                Ok(resp)
            };

            let Ok(ws) = tokio_tungstenite::accept_hdr_async(stream, callback).await else {
                return;
            };
            let (mut write, mut read) = ws.split();

            let created = json!({
                "type": "session.created",
                "event_id": "evt_created",
                "session": { "id": "sess_mock", "model": "gpt-4o-realtime-preview-2024-10-01" }
            });
            if write
                .send(Message::Text(created.to_string().into()))
                .await
                .is_err()
            {
                return;
            }

            loop {
                tokio::select! {
                    incoming = read.next() => match incoming {
                        Some(Ok(Message::Text(text))) => {
                            let Ok(value) = serde_json::from_str::<Value>(&text) else {
                                continue;
                            };
                            let is_update = value["type"] == "session.update";
                            received_log.lock().unwrap().push(value);
                            if is_update {
                                let updated = json!({
                                    "type": "session.updated",
                                    "event_id": "evt_updated",
                                    "session": { "id": "sess_mock" }
                                });
                                let _ = write.send(Message::Text(updated.to_string().into())).await;
                            }
                        }
                        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                            closed_flag.store(true, Ordering::SeqCst);
                            break;
                        }
                        Some(Ok(_)) => {}
                    },
                    push = push_rx.recv() => match push {
                        Some(Push::Text(text)) => {
                            let _ = write.send(Message::Text(text.into())).await;
                        }
                        Some(Push::Close) | None => {
                            let _ = write.send(Message::Close(None)).await;
                            break;
                        }
                    },
                }
            }
        });

        Self {
            url: format!("ws://{}/v1/realtime", addr),
            handshake,
            received,
            client_closed,
            push_tx,
        }
    }

    /// Send a server event to the client.
    pub fn push(&self, event: Value) {
        let _ = self.push_tx.send(Push::Text(event.to_string()));
    }

    /// Send a raw text frame, valid JSON or not.
    pub fn push_raw(&self, text: &str) {
        let _ = self.push_tx.send(Push::Text(text.to_string()));
    }

    /// Close the connection from the server side.
    pub fn close(&self) {
        let _ = self.push_tx.send(Push::Close);
    }

    pub fn handshake(&self) -> Option<Handshake> {
        self.handshake.lock().unwrap().clone()
    }

    /// All client events received so far.
    pub fn received(&self) -> Vec<Value> {
        self.received.lock().unwrap().clone()
    }

    pub fn received_types(&self) -> Vec<String> {
        self.received()
            .iter()
            .filter_map(|v| v["type"].as_str().map(str::to_string))
            .collect()
    }

    pub fn client_closed(&self) -> bool {
        self.client_closed.load(Ordering::SeqCst)
    }

    /// Wait until `count` events of `event_type` have arrived and return them.
    pub async fn wait_for(&self, event_type: &str, count: usize) -> Vec<Value> {
        let deadline = tokio::time::Instant::now() + WAIT_TIMEOUT;
        loop {
            let matching: Vec<Value> = self
                .received()
                .into_iter()
                .filter(|v| v["type"] == event_type)
                .collect();
            if matching.len() >= count {
                return matching;
            }
            if tokio::time::Instant::now() >= deadline {
                panic!(
                    "Timed out waiting for {} x {}; received {:?}",
                    count,
                    event_type,
                    self.received_types()
                );
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Wait until the client has closed its side.
    pub async fn wait_closed(&self) {
        let deadline = tokio::time::Instant::now() + WAIT_TIMEOUT;
        while !self.client_closed() {
            if tokio::time::Instant::now() >= deadline {
                panic!("Timed out waiting for the client to close");
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}
