//! Base traits and types for the assistant side of a relayed call.
//!
//! This module defines the provider-agnostic abstraction the relay session
//! talks to: a bidirectional event stream carrying commands toward the
//! voice assistant and events back from it.
//!
//! Audio payloads are carried as opaque base64 text. The relay never decodes
//! or transcodes assistant audio; the configured format is used for both
//! input and output so telephony frames can pass straight through.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failures on the assistant connection. Every variant ends the call.
#[derive(Debug, Error)]
pub enum RealtimeError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Not connected")]
    NotConnected,
}

pub type RealtimeResult<T> = Result<T, RealtimeError>;

/// Connection configuration for a realtime provider.
#[derive(Debug, Clone, Default)]
pub struct RealtimeConfig {
    pub api_key: String,

    /// Model to use (e.g., "gpt-4o-realtime-preview-2024-10-01")
    pub model: String,

    /// WebSocket endpoint override. Empty means the provider default.
    pub url: String,

    /// Server event types logged verbatim when received
    pub log_event_types: Vec<String>,
}

/// Turn detection mode requested from the assistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnDetectionMode {
    /// The assistant detects speech boundaries itself
    #[default]
    ServerVad,
    /// No automatic detection; turns are committed explicitly
    Manual,
}

impl TurnDetectionMode {
    /// Parse from string, with fallback to default.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "manual" | "none" | "off" => Self::Manual,
            _ => Self::ServerVad,
        }
    }
}

impl fmt::Display for TurnDetectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnDetectionMode::ServerVad => write!(f, "server_vad"),
            TurnDetectionMode::Manual => write!(f, "manual"),
        }
    }
}

/// Session settings sent once the assistant connection is ready.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    /// Synthesis voice
    pub voice: String,
    /// System instructions
    pub instructions: String,
    /// Audio encoding used for both input and output
    pub audio_format: String,
    /// Turn detection mode
    pub turn_detection: TurnDetectionMode,
    /// Response modalities
    pub modalities: Vec<String>,
    /// Sampling temperature
    pub temperature: f32,
}

/// Lifecycle of the assistant connection, as reported by `get_connection_state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Connected => write!(f, "Connected"),
            ConnectionState::Failed => write!(f, "Failed"),
        }
    }
}

/// Commands the relay sends toward the assistant.
#[derive(Debug, Clone, PartialEq)]
pub enum AssistantCommand {
    /// Configure the session (sent exactly once per session)
    Configure(SessionSettings),

    /// Append caller audio to the assistant's input buffer
    AppendAudio {
        /// Base64-encoded audio, passed through untouched
        payload: String,
    },

    /// Truncate an assistant utterance at the point the caller stopped hearing it
    Truncate {
        /// Utterance (conversation item) identifier
        item_id: String,
        /// Content part index within the item
        content_index: u32,
        /// Milliseconds of audio actually played to the caller
        audio_end_ms: u64,
    },

    /// Inject a user text turn and ask the assistant to respond to it
    Greet {
        /// Prompt text
        text: String,
    },
}

/// Events received from the assistant.
#[derive(Debug, Clone, PartialEq)]
pub enum AssistantEvent {
    /// The assistant created the session and is ready for configuration
    SessionCreated {
        /// Provider session identifier
        session_id: String,
    },

    /// The assistant accepted a session configuration
    SessionUpdated,

    /// A chunk of synthesized audio
    AudioDelta {
        /// Base64-encoded audio
        payload: String,
        /// Utterance the chunk belongs to
        item_id: Option<String>,
    },

    /// Audio generation finished for an utterance
    AudioDone {
        /// Utterance identifier
        item_id: Option<String>,
    },

    /// The caller started speaking
    SpeechStarted {
        /// Assistant-side audio offset in milliseconds
        audio_start_ms: u64,
    },

    /// The caller stopped speaking
    SpeechStopped {
        /// Assistant-side audio offset in milliseconds
        audio_end_ms: u64,
    },

    /// A response finished
    ResponseDone {
        /// Response identifier
        response_id: String,
    },

    /// The provider reported an error
    Error {
        /// Error message
        message: String,
    },

    /// Any other event, kept for observability
    Other {
        /// Provider event type
        event_type: String,
    },
}

impl AssistantEvent {
    /// Provider-agnostic name used in logs.
    pub fn kind(&self) -> &str {
        match self {
            AssistantEvent::SessionCreated { .. } => "session_created",
            AssistantEvent::SessionUpdated => "session_updated",
            AssistantEvent::AudioDelta { .. } => "audio_delta",
            AssistantEvent::AudioDone { .. } => "audio_done",
            AssistantEvent::SpeechStarted { .. } => "speech_started",
            AssistantEvent::SpeechStopped { .. } => "speech_stopped",
            AssistantEvent::ResponseDone { .. } => "response_done",
            AssistantEvent::Error { .. } => "error",
            AssistantEvent::Other { event_type } => event_type,
        }
    }
}

/// The assistant side of a relayed call.
///
/// Implementations own one connection to a realtime voice assistant. Sends
/// are fire-and-forget but must preserve order. `next_event` yields `None`
/// once the connection has closed; it must be cancel-safe because the relay
/// polls it alongside the telephony side.
#[async_trait]
pub trait AssistantSide: Send {
    /// Open the connection. Returning `Ok` means the transport is open.
    async fn connect(&mut self) -> RealtimeResult<()>;

    /// Close the connection. Closing an already closed side is a no-op.
    async fn disconnect(&mut self) -> RealtimeResult<()>;

    /// Check if the side is connected and ready.
    fn is_ready(&self) -> bool;

    fn get_connection_state(&self) -> ConnectionState;

    /// Send a control message.
    async fn send_command(&mut self, command: AssistantCommand) -> RealtimeResult<()>;

    /// Send one chunk of caller audio.
    async fn send_audio(&mut self, payload: String) -> RealtimeResult<()> {
        self.send_command(AssistantCommand::AppendAudio { payload })
            .await
    }

    /// Receive the next event, or `None` once the connection is closed.
    async fn next_event(&mut self) -> Option<RealtimeResult<AssistantEvent>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_state_display() {
        assert_eq!(ConnectionState::Connected.to_string(), "Connected");
        assert_eq!(ConnectionState::Disconnected.to_string(), "Disconnected");
        assert_eq!(ConnectionState::Connecting.to_string(), "Connecting");
    }

    #[test]
    fn test_error_display() {
        let err = RealtimeError::ConnectionFailed("test".to_string());
        assert!(err.to_string().contains("Connection failed"));

        let err = RealtimeError::NotConnected;
        assert_eq!(err.to_string(), "Not connected");
    }

    #[test]
    fn test_turn_detection_parse() {
        assert_eq!(
            TurnDetectionMode::from_str_or_default("server_vad"),
            TurnDetectionMode::ServerVad
        );
        assert_eq!(
            TurnDetectionMode::from_str_or_default("MANUAL"),
            TurnDetectionMode::Manual
        );
        assert_eq!(
            TurnDetectionMode::from_str_or_default("none"),
            TurnDetectionMode::Manual
        );
        assert_eq!(
            TurnDetectionMode::from_str_or_default("bogus"),
            TurnDetectionMode::ServerVad
        );
    }

    #[test]
    fn test_event_kind() {
        let event = AssistantEvent::AudioDelta {
            payload: "AAAA".to_string(),
            item_id: None,
        };
        assert_eq!(event.kind(), "audio_delta");

        let event = AssistantEvent::Other {
            event_type: "rate_limits.updated".to_string(),
        };
        assert_eq!(event.kind(), "rate_limits.updated");
    }
}
