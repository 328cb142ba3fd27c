//! JSON events exchanged with the OpenAI Realtime API.
//!
//! The relay only writes five client event types: `session.update`,
//! `input_audio_buffer.append`, `conversation.item.create`,
//! `conversation.item.truncate` and `response.create`.
//!
//! On the way in it decodes the handful of server events that drive a call
//! (session lifecycle, caller speech boundaries, response audio, errors).
//! Every other type parses as [`ServerEvent::Unknown`] so it can still be
//! logged by name.

use serde::{Deserialize, Serialize};

use crate::core::realtime::base::{SessionSettings, TurnDetectionMode};

// =============================================================================
// Session Configuration
// =============================================================================

/// Body of a `session.update`; unset fields keep the server's value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_detection: Option<TurnDetection>,

    /// The relay uses the same format in both directions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_format: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_audio_format: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub modalities: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl From<&SessionSettings> for SessionConfig {
    fn from(settings: &SessionSettings) -> Self {
        let turn_detection = match settings.turn_detection {
            TurnDetectionMode::ServerVad => TurnDetection::ServerVad {
                threshold: None,
                prefix_padding_ms: None,
                silence_duration_ms: None,
            },
            TurnDetectionMode::Manual => TurnDetection::None {},
        };

        Self {
            turn_detection: Some(turn_detection),
            input_audio_format: Some(settings.audio_format.clone()),
            output_audio_format: Some(settings.audio_format.clone()),
            voice: Some(settings.voice.clone()),
            instructions: Some(settings.instructions.clone()),
            modalities: Some(settings.modalities.clone()),
            temperature: Some(settings.temperature),
        }
    }
}

/// `turn_detection` object; `none` disables server VAD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TurnDetection {
    /// Server-side VAD
    #[serde(rename = "server_vad")]
    ServerVad {
        /// Activation threshold
        #[serde(default, skip_serializing_if = "Option::is_none")]
        threshold: Option<f32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prefix_padding_ms: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        silence_duration_ms: Option<u32>,
    },
    /// No turn detection
    #[serde(rename = "none")]
    None {},
}

// =============================================================================
// Conversation Items
// =============================================================================

/// Conversation item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationItem {
    /// Item ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Item type
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Content parts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<ContentPart>>,
}

impl ConversationItem {
    /// A user message carrying a single text part.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            id: None,
            item_type: "message".to_string(),
            role: Some("user".to_string()),
            content: Some(vec![ContentPart {
                content_type: "input_text".to_string(),
                text: Some(text.into()),
            }]),
        }
    }
}

/// One content part of a conversation item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub content_type: String,
    /// Text content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

// =============================================================================
// Client Events (sent to server)
// =============================================================================

/// Events the relay writes to the socket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "session.update")]
    SessionUpdate {
        /// Session configuration
        session: SessionConfig,
    },

    /// Caller audio, forwarded as received
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend {
        audio: String,
    },

    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate {
        /// Item to create
        item: ConversationItem,
    },

    /// Cut an assistant item at the point playback stopped
    #[serde(rename = "conversation.item.truncate")]
    ConversationItemTruncate {
        item_id: String,
        content_index: u32,
        audio_end_ms: u64,
    },

    #[serde(rename = "response.create")]
    ResponseCreate,
}

// =============================================================================
// Server Events (received from server)
// =============================================================================

/// Server events the relay decodes.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Error occurred
    #[serde(rename = "error")]
    Error {
        /// Error details
        error: ApiError,
    },

    /// Session created
    #[serde(rename = "session.created")]
    SessionCreated {
        /// Session information
        session: Session,
    },

    /// Session updated
    #[serde(rename = "session.updated")]
    SessionUpdated {
        /// Session information
        session: Session,
    },

    /// Server VAD heard the caller start talking
    #[serde(rename = "input_audio_buffer.speech_started")]
    SpeechStarted {
        /// Offset into the input audio buffer
        #[serde(default)]
        audio_start_ms: u64,
        /// Item ID
        #[serde(default)]
        item_id: Option<String>,
    },

    #[serde(rename = "input_audio_buffer.speech_stopped")]
    SpeechStopped {
        #[serde(default)]
        audio_end_ms: u64,
        /// Item ID
        #[serde(default)]
        item_id: Option<String>,
    },

    /// One chunk of synthesized speech
    #[serde(rename = "response.audio.delta")]
    AudioDelta {
        /// Response ID
        #[serde(default)]
        response_id: Option<String>,
        /// Item ID
        #[serde(default)]
        item_id: Option<String>,
        /// Base64 in the session's output format; may be empty
        #[serde(default)]
        delta: String,
    },

    /// Audio done
    #[serde(rename = "response.audio.done")]
    AudioDone {
        /// Response ID
        #[serde(default)]
        response_id: Option<String>,
        /// Item ID
        #[serde(default)]
        item_id: Option<String>,
    },

    /// Response done
    #[serde(rename = "response.done")]
    ResponseDone {
        /// Response information
        response: Response,
    },

    /// Any event type the relay does not act on
    #[serde(other)]
    Unknown,
}

/// A parsed server event together with its wire type name.
#[derive(Debug, Clone)]
pub struct ServerMessage {
    /// Value of the `type` field
    pub event_type: String,
    /// Parsed event
    pub event: ServerEvent,
}

impl ServerMessage {
    /// Parse a text frame from the server.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        let event_type = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string();
        let event = serde_json::from_value(value)?;
        Ok(Self { event_type, event })
    }
}

// =============================================================================
// Supporting Types
// =============================================================================

/// Payload of an `error` event.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiError {
    /// Error type
    #[serde(rename = "type", default)]
    pub error_type: String,
    /// Error code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Error message
    #[serde(default)]
    pub message: String,
}

/// Session information.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Session {
    /// Session ID
    #[serde(default)]
    pub id: String,
    /// Model used
    #[serde(default)]
    pub model: Option<String>,
    /// Voice
    #[serde(default)]
    pub voice: Option<String>,
    /// Input audio format
    #[serde(default)]
    pub input_audio_format: Option<String>,
    /// Output audio format
    #[serde(default)]
    pub output_audio_format: Option<String>,
}

/// Response information.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Response {
    /// Response ID
    #[serde(default)]
    pub id: String,
    /// Response status
    #[serde(default)]
    pub status: Option<String>,
}

// =============================================================================
// Tests
// =============================================================================
