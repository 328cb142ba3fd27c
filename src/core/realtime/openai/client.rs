//! OpenAI Realtime API client implementation.
//!
//! This module provides the OpenAI Realtime client that implements the
//! `AssistantSide` trait using OpenAI's WebSocket-based Realtime API.
//!
//! # API Reference
//!
//! - Endpoint: `wss://api.openai.com/v1/realtime?model=<model>`
//! - Protocol: WebSocket with JSON events
//! - Audio: base64 encoded, format chosen by the session configuration
//!
//! # Threading
//!
//! The client is owned by exactly one relay session. A spawned connection
//! task owns the socket; commands reach it through a bounded channel and
//! translated server events come back through another. When the socket
//! closes the task exits and the event channel ends, which is how the
//! session learns the assistant is gone.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use http::HeaderValue;
use http::header::AUTHORIZATION;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tracing::{debug, error, info, trace, warn};

use super::config::{OPENAI_REALTIME_BETA, OPENAI_REALTIME_URL, OpenAIRealtimeModel};
use super::messages::{ClientEvent, ConversationItem, ServerEvent, ServerMessage, SessionConfig};
use crate::core::realtime::base::{
    AssistantCommand, AssistantEvent, AssistantSide, ConnectionState, RealtimeConfig,
    RealtimeError, RealtimeResult,
};

/// Channel capacity for WebSocket message sending.
const WS_CHANNEL_CAPACITY: usize = 256;

/// Channel capacity for translated server events.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// How long `disconnect` waits for the connection task to send its close frame.
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(2);

// =============================================================================
// OpenAI Realtime Client
// =============================================================================

/// OpenAI Realtime API client implementation.
///
/// There is no reconnection: a dropped assistant connection ends the call leg.
pub struct OpenAIRealtime {
    /// Configuration
    config: RealtimeConfig,
    /// Parsed model
    model: OpenAIRealtimeModel,
    /// Connection state
    state: ConnectionState,
    /// WebSocket sender channel
    ws_sender: Option<mpsc::Sender<ClientEvent>>,
    /// Translated server events
    event_rx: Option<mpsc::Receiver<RealtimeResult<AssistantEvent>>>,
    /// Connection task handle
    connection_handle: Option<JoinHandle<()>>,
}

impl OpenAIRealtime {
    /// Create a new client. Fails when no API key is configured.
    pub fn new(config: RealtimeConfig) -> RealtimeResult<Self> {
        if config.api_key.is_empty() {
            return Err(RealtimeError::AuthenticationFailed(
                "API key is required".to_string(),
            ));
        }

        let model = if config.model.is_empty() {
            OpenAIRealtimeModel::default()
        } else {
            OpenAIRealtimeModel::from_str_or_default(&config.model)
        };

        Ok(Self {
            config,
            model,
            state: ConnectionState::Disconnected,
            ws_sender: None,
            event_rx: None,
            connection_handle: None,
        })
    }

    /// Get the configured model.
    pub fn model(&self) -> OpenAIRealtimeModel {
        self.model
    }

    /// Build the WebSocket URL with model parameter.
    fn build_ws_url(&self) -> String {
        let base = if self.config.url.is_empty() {
            OPENAI_REALTIME_URL
        } else {
            self.config.url.as_str()
        };
        format!("{}?model={}", base, self.model.as_str())
    }

    /// Map a relay command onto the client events that express it.
    fn command_events(command: AssistantCommand) -> Vec<ClientEvent> {
        match command {
            AssistantCommand::Configure(settings) => vec![ClientEvent::SessionUpdate {
                session: SessionConfig::from(&settings),
            }],
            AssistantCommand::AppendAudio { payload } => {
                vec![ClientEvent::InputAudioBufferAppend { audio: payload }]
            }
            AssistantCommand::Truncate {
                item_id,
                content_index,
                audio_end_ms,
            } => vec![ClientEvent::ConversationItemTruncate {
                item_id,
                content_index,
                audio_end_ms,
            }],
            AssistantCommand::Greet { text } => vec![
                ClientEvent::ConversationItemCreate {
                    item: ConversationItem::user_text(text),
                },
                ClientEvent::ResponseCreate,
            ],
        }
    }

    /// Translate a raw server frame into a relay event.
    ///
    /// Returns `None` for frames the relay drops: unparseable payloads and
    /// audio deltas without audio.
    fn translate_server_message(text: &str, log_event_types: &[String]) -> Option<AssistantEvent> {
        let message = match ServerMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("Failed to parse server event: {} - {}", e, text);
                return None;
            }
        };

        if log_event_types.iter().any(|t| *t == message.event_type) {
            info!(event_type = %message.event_type, "Received event: {}", text);
        }

        match message.event {
            ServerEvent::SessionCreated { session } => {
                info!("OpenAI Realtime session created: {}", session.id);
                Some(AssistantEvent::SessionCreated {
                    session_id: session.id,
                })
            }
            ServerEvent::SessionUpdated { session } => {
                debug!("OpenAI Realtime session updated: {}", session.id);
                Some(AssistantEvent::SessionUpdated)
            }
            ServerEvent::Error { error } => {
                error!(
                    "OpenAI Realtime error: {} - {}",
                    error.error_type, error.message
                );
                Some(AssistantEvent::Error {
                    message: format!("{}: {}", error.error_type, error.message),
                })
            }
            ServerEvent::SpeechStarted { audio_start_ms, .. } => {
                debug!("Speech started at {}ms", audio_start_ms);
                Some(AssistantEvent::SpeechStarted { audio_start_ms })
            }
            ServerEvent::SpeechStopped { audio_end_ms, .. } => {
                debug!("Speech stopped at {}ms", audio_end_ms);
                Some(AssistantEvent::SpeechStopped { audio_end_ms })
            }
            ServerEvent::AudioDelta { delta, item_id, .. } => {
                if delta.is_empty() {
                    trace!("Ignoring empty audio delta");
                    return None;
                }
                Some(AssistantEvent::AudioDelta {
                    payload: delta,
                    item_id,
                })
            }
            ServerEvent::AudioDone { item_id, .. } => Some(AssistantEvent::AudioDone { item_id }),
            ServerEvent::ResponseDone { response } => {
                debug!("Response done: {}", response.id);
                Some(AssistantEvent::ResponseDone {
                    response_id: response.id,
                })
            }
            ServerEvent::Unknown => Some(AssistantEvent::Other {
                event_type: message.event_type,
            }),
        }
    }
}

#[async_trait]
impl AssistantSide for OpenAIRealtime {
    async fn connect(&mut self) -> RealtimeResult<()> {
        if self.is_ready() {
            return Ok(());
        }

        self.state = ConnectionState::Connecting;

        let url = self.build_ws_url();
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| RealtimeError::InvalidConfiguration(e.to_string()))?;
        let auth = HeaderValue::from_str(&format!("Bearer {}", self.config.api_key))
            .map_err(|e| RealtimeError::InvalidConfiguration(e.to_string()))?;
        request.headers_mut().insert(AUTHORIZATION, auth);
        request
            .headers_mut()
            .insert("OpenAI-Beta", HeaderValue::from_static(OPENAI_REALTIME_BETA));

        let (ws_stream, _response) = match tokio_tungstenite::connect_async(request).await {
            Ok(connection) => connection,
            Err(e) => {
                self.state = ConnectionState::Failed;
                return Err(RealtimeError::ConnectionFailed(e.to_string()));
            }
        };

        info!(model = %self.model, "Connected to OpenAI Realtime API");

        let (mut ws_sink, mut ws_stream) = ws_stream.split();
        let (tx, mut rx) = mpsc::channel::<ClientEvent>(WS_CHANNEL_CAPACITY);
        let (event_tx, event_rx) =
            mpsc::channel::<RealtimeResult<AssistantEvent>>(EVENT_CHANNEL_CAPACITY);
        let log_event_types = self.config.log_event_types.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    outgoing = rx.recv() => {
                        let Some(event) = outgoing else {
                            // All senders dropped: the session asked us to close.
                            if let Err(e) = ws_sink.send(Message::Close(None)).await {
                                debug!("Failed to send close frame: {}", e);
                            }
                            break;
                        };

                        let json = match serde_json::to_string(&event) {
                            Ok(j) => j,
                            Err(e) => {
                                error!("Failed to serialize event: {}", e);
                                continue;
                            }
                        };

                        if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                            error!("Failed to send WebSocket message: {}", e);
                            let _ = event_tx
                                .send(Err(RealtimeError::WebSocketError(e.to_string())))
                                .await;
                            break;
                        }
                    }

                    incoming = ws_stream.next() => {
                        match incoming {
                            Some(Ok(Message::Text(text))) => {
                                if let Some(event) =
                                    Self::translate_server_message(&text, &log_event_types)
                                    && event_tx.send(Ok(event)).await.is_err()
                                {
                                    break;
                                }
                            }
                            Some(Ok(Message::Close(frame))) => {
                                info!("Disconnected from OpenAI Realtime API: {:?}", frame);
                                break;
                            }
                            Some(Ok(Message::Ping(data))) => {
                                if let Err(e) = ws_sink.send(Message::Pong(data)).await {
                                    error!("Failed to send pong: {}", e);
                                }
                            }
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                error!("WebSocket error: {}", e);
                                let _ = event_tx
                                    .send(Err(RealtimeError::WebSocketError(e.to_string())))
                                    .await;
                                break;
                            }
                            None => {
                                info!("OpenAI Realtime stream ended");
                                break;
                            }
                        }
                    }
                }
            }
            debug!("OpenAI Realtime connection task finished");
        });

        self.ws_sender = Some(tx);
        self.event_rx = Some(event_rx);
        self.connection_handle = Some(handle);
        self.state = ConnectionState::Connected;

        Ok(())
    }

    async fn disconnect(&mut self) -> RealtimeResult<()> {
        // Dropping the sender makes the connection task close the socket.
        self.ws_sender = None;

        if let Some(mut handle) = self.connection_handle.take()
            && tokio::time::timeout(DISCONNECT_TIMEOUT, &mut handle)
                .await
                .is_err()
        {
            warn!("OpenAI Realtime connection task did not finish, aborting");
            handle.abort();
        }

        self.event_rx = None;
        self.state = ConnectionState::Disconnected;
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.state == ConnectionState::Connected && self.ws_sender.is_some()
    }

    fn get_connection_state(&self) -> ConnectionState {
        self.state
    }

    async fn send_command(&mut self, command: AssistantCommand) -> RealtimeResult<()> {
        let sender = self.ws_sender.as_ref().ok_or(RealtimeError::NotConnected)?;
        for event in Self::command_events(command) {
            sender
                .send(event)
                .await
                .map_err(|_| RealtimeError::NotConnected)?;
        }
        Ok(())
    }

    async fn next_event(&mut self) -> Option<RealtimeResult<AssistantEvent>> {
        let rx = self.event_rx.as_mut()?;
        let event = rx.recv().await;
        if event.is_none() {
            self.state = ConnectionState::Disconnected;
            self.ws_sender = None;
        }
        event
    }
}

// =============================================================================
// Tests
// =============================================================================
