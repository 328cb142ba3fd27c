//! Twilio Media Streams over an axum WebSocket.
//!
//! The socket is split: a spawned sender task drains an mpsc channel of
//! outgoing messages so sends never wait on the network, while `recv` reads
//! the stream half directly.

use std::time::Duration;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitStream;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::base::{TelephonyError, TelephonyEvent, TelephonyFrame, TelephonyResult, TelephonySide};
use super::messages::{encode_outbound, parse_inbound};

/// Channel buffer size for outgoing frames.
const CHANNEL_BUFFER_SIZE: usize = 1024;

/// How long `close` waits for queued frames to flush.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Telephony side backed by a Twilio Media Streams WebSocket.
pub struct TwilioMediaStream {
    receiver: SplitStream<WebSocket>,
    outgoing: Option<mpsc::Sender<Message>>,
    sender_task: Option<JoinHandle<()>>,
    closed: bool,
}

impl TwilioMediaStream {
    /// Take ownership of an upgraded socket.
    pub fn new(socket: WebSocket) -> Self {
        let (mut sender, receiver) = socket.split();
        let (tx, mut rx) = mpsc::channel::<Message>(CHANNEL_BUFFER_SIZE);

        let sender_task = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                let is_close = matches!(message, Message::Close(_));
                if let Err(e) = sender.send(message).await {
                    error!("Failed to send telephony frame: {}", e);
                    break;
                }
                if is_close {
                    break;
                }
            }
            debug!("Telephony sender task finished");
        });

        Self {
            receiver,
            outgoing: Some(tx),
            sender_task: Some(sender_task),
            closed: false,
        }
    }
}

#[async_trait]
impl TelephonySide for TwilioMediaStream {
    async fn recv(&mut self) -> Option<TelephonyResult<TelephonyEvent>> {
        if self.closed {
            return None;
        }

        loop {
            match self.receiver.next().await {
                Some(Ok(Message::Text(text))) => return Some(parse_inbound(&text)),
                Some(Ok(Message::Binary(data))) => {
                    return Some(Err(TelephonyError::MalformedFrame(format!(
                        "unexpected binary frame of {} bytes",
                        data.len()
                    ))));
                }
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                Some(Ok(Message::Close(frame))) => {
                    info!("Telephony WebSocket closed by peer: {:?}", frame);
                    self.closed = true;
                    return None;
                }
                Some(Err(e)) => {
                    self.closed = true;
                    return Some(Err(TelephonyError::Transport(e.to_string())));
                }
                None => {
                    self.closed = true;
                    return None;
                }
            }
        }
    }

    async fn send(&mut self, frame: TelephonyFrame) -> TelephonyResult<()> {
        let outgoing = self.outgoing.as_ref().ok_or(TelephonyError::Closed)?;
        let text = encode_outbound(frame)?;
        outgoing
            .send(Message::Text(text.into()))
            .await
            .map_err(|_| TelephonyError::Closed)
    }

    async fn close(&mut self) -> TelephonyResult<()> {
        if let Some(outgoing) = self.outgoing.take() {
            // The peer may already be gone; the close frame is best effort.
            let _ = outgoing.send(Message::Close(None)).await;
        }

        if let Some(mut task) = self.sender_task.take()
            && tokio::time::timeout(CLOSE_TIMEOUT, &mut task).await.is_err()
        {
            debug!("Telephony sender task did not finish, aborting");
            task.abort();
        }

        self.closed = true;
        Ok(())
    }
}
