//! Base traits and types for the telephony side of a relayed call.
//!
//! The telephony side delivers caller audio as small timestamped frames and
//! plays back whatever synthesized frames the relay sends it. Acknowledgment
//! marks let the relay learn which of its frames have actually been played.

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur on the telephony connection.
#[derive(Debug, Error)]
pub enum TelephonyError {
    /// A frame could not be parsed. The frame is dropped and the call goes on.
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// The underlying transport failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// The connection is already closed
    #[error("Connection closed")]
    Closed,
}

impl TelephonyError {
    /// Whether the error ends the call leg.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, TelephonyError::MalformedFrame(_))
    }
}

/// Result type for telephony operations.
pub type TelephonyResult<T> = Result<T, TelephonyError>;

/// Events received from the telephony side.
#[derive(Debug, Clone, PartialEq)]
pub enum TelephonyEvent {
    /// Transport handshake; carries no call state
    Connected,

    /// A media stream started
    Start {
        /// Stream identifier every outbound frame must carry
        stream_id: String,
        /// Call identifier, when the provider sends one
        call_id: Option<String>,
    },

    /// One frame of caller audio
    Media {
        /// Media clock in milliseconds since the stream started
        timestamp_ms: u64,
        /// Base64-encoded audio
        payload: String,
    },

    /// Playback acknowledgment for a previously sent mark
    Mark {
        /// Mark name
        name: String,
    },

    /// The stream ended
    Stop,

    /// A keypad digit
    Dtmf {
        /// The digit pressed
        digit: String,
    },

    /// Any other event, kept for observability
    Other {
        /// Provider event name
        event: String,
    },
}

impl TelephonyEvent {
    /// Name used in logs.
    pub fn kind(&self) -> &str {
        match self {
            TelephonyEvent::Connected => "connected",
            TelephonyEvent::Start { .. } => "start",
            TelephonyEvent::Media { .. } => "media",
            TelephonyEvent::Mark { .. } => "mark",
            TelephonyEvent::Stop => "stop",
            TelephonyEvent::Dtmf { .. } => "dtmf",
            TelephonyEvent::Other { event } => event,
        }
    }
}

/// Frames the relay sends to the telephony side.
#[derive(Debug, Clone, PartialEq)]
pub enum TelephonyFrame {
    /// Synthesized audio to play to the caller
    Media {
        /// Stream the frame belongs to
        stream_id: String,
        /// Base64-encoded audio, passed through untouched
        payload: String,
    },

    /// Ask for an acknowledgment once everything sent so far has played
    Mark {
        /// Stream the mark belongs to
        stream_id: String,
        /// Mark name echoed back in the acknowledgment
        name: String,
    },

    /// Discard all buffered playback
    Clear {
        /// Stream to clear
        stream_id: String,
    },
}

/// The telephony side of a relayed call.
///
/// `recv` yields `None` once the connection has closed and must be
/// cancel-safe, since the relay polls it alongside the assistant side.
/// Malformed inbound frames surface as [`TelephonyError::MalformedFrame`]
/// so the relay can log and skip them.
#[async_trait]
pub trait TelephonySide: Send {
    /// Receive the next event, or `None` once the connection is closed.
    async fn recv(&mut self) -> Option<TelephonyResult<TelephonyEvent>>;

    /// Send one frame. Frames are delivered in send order.
    async fn send(&mut self, frame: TelephonyFrame) -> TelephonyResult<()>;

    /// Close the connection. Closing an already closed side is a no-op.
    async fn close(&mut self) -> TelephonyResult<()>;
}
