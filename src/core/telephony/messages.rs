//! Twilio Media Streams wire frames.
//!
//! Inbound events (sent by Twilio):
//! - connected - WebSocket handshake
//! - start - Stream metadata, including `streamSid`
//! - media - One base64 audio frame with its media timestamp
//! - mark - Playback acknowledgment for a mark we sent
//! - dtmf - Keypad digit
//! - stop - Stream ended
//!
//! Outbound events (sent to Twilio):
//! - media - Audio to play
//! - mark - Request an acknowledgment
//! - clear - Drop buffered audio

use serde::{Deserialize, Deserializer, Serialize};

use super::base::{TelephonyError, TelephonyEvent, TelephonyFrame};

/// Mark name attached to every synthesized audio frame.
pub const RESPONSE_PART_MARK: &str = "responsePart";

// =============================================================================
// Inbound
// =============================================================================

/// Inbound Twilio events the relay understands.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
enum TwilioInbound {
    Connected,
    Start { start: StartMetadata },
    Media { media: MediaPayload },
    Mark { mark: MarkPayload },
    Stop,
    Dtmf { dtmf: DtmfPayload },
}

/// Stream metadata carried by a `start` event.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartMetadata {
    stream_sid: String,
    #[serde(default)]
    call_sid: Option<String>,
}

/// Inbound audio frame.
#[derive(Debug, Clone, Deserialize)]
struct MediaPayload {
    #[serde(deserialize_with = "deserialize_timestamp")]
    timestamp: u64,
    payload: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MarkPayload {
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct DtmfPayload {
    #[serde(default)]
    digit: String,
}

/// Twilio sends media timestamps as decimal strings; accept numbers too.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Timestamp {
        Number(u64),
        Text(String),
    }

    match Timestamp::deserialize(deserializer)? {
        Timestamp::Number(n) => Ok(n),
        Timestamp::Text(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|e| serde::de::Error::custom(format!("invalid timestamp {s:?}: {e}"))),
    }
}

/// Parse one inbound text frame.
///
/// Unknown event names map to [`TelephonyEvent::Other`]; frames that are not
/// JSON objects with a string `event`, or whose known event is missing
/// required fields, are [`TelephonyError::MalformedFrame`].
pub fn parse_inbound(text: &str) -> Result<TelephonyEvent, TelephonyError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| TelephonyError::MalformedFrame(e.to_string()))?;

    let event = value
        .get("event")
        .and_then(|v| v.as_str())
        .ok_or_else(|| TelephonyError::MalformedFrame("missing event field".to_string()))?
        .to_string();

    if !matches!(
        event.as_str(),
        "connected" | "start" | "media" | "mark" | "stop" | "dtmf"
    ) {
        return Ok(TelephonyEvent::Other { event });
    }

    let inbound: TwilioInbound = serde_json::from_value(value)
        .map_err(|e| TelephonyError::MalformedFrame(format!("{event}: {e}")))?;

    Ok(match inbound {
        TwilioInbound::Connected => TelephonyEvent::Connected,
        TwilioInbound::Start { start } => TelephonyEvent::Start {
            stream_id: start.stream_sid,
            call_id: start.call_sid,
        },
        TwilioInbound::Media { media } => TelephonyEvent::Media {
            timestamp_ms: media.timestamp,
            payload: media.payload,
        },
        TwilioInbound::Mark { mark } => TelephonyEvent::Mark { name: mark.name },
        TwilioInbound::Stop => TelephonyEvent::Stop,
        TwilioInbound::Dtmf { dtmf } => TelephonyEvent::Dtmf { digit: dtmf.digit },
    })
}

// =============================================================================
// Outbound
// =============================================================================

#[derive(Debug, Clone, Serialize)]
struct OutboundMedia {
    payload: String,
}

/// Outbound Twilio events.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
enum TwilioOutbound {
    Media {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        media: OutboundMedia,
    },
    Mark {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        mark: MarkPayload,
    },
    Clear {
        #[serde(rename = "streamSid")]
        stream_sid: String,
    },
}

impl From<TelephonyFrame> for TwilioOutbound {
    fn from(frame: TelephonyFrame) -> Self {
        match frame {
            TelephonyFrame::Media { stream_id, payload } => TwilioOutbound::Media {
                stream_sid: stream_id,
                media: OutboundMedia { payload },
            },
            TelephonyFrame::Mark { stream_id, name } => TwilioOutbound::Mark {
                stream_sid: stream_id,
                mark: MarkPayload { name },
            },
            TelephonyFrame::Clear { stream_id } => TwilioOutbound::Clear {
                stream_sid: stream_id,
            },
        }
    }
}

/// Serialize an outbound frame to its JSON text.
pub fn encode_outbound(frame: TelephonyFrame) -> Result<String, TelephonyError> {
    serde_json::to_string(&TwilioOutbound::from(frame))
        .map_err(|e| TelephonyError::Transport(format!("serialization failed: {e}")))
}
