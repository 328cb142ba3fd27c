//! Telephony side of a relayed call.
//!
//! `TelephonySide` is the seam the relay session talks through. The
//! production implementation speaks Twilio Media Streams over the axum
//! WebSocket accepted on `/media-stream`.

mod base;
pub mod messages;
mod websocket;

pub use base::{TelephonyError, TelephonyEvent, TelephonyFrame, TelephonyResult, TelephonySide};
pub use messages::RESPONSE_PART_MARK;
pub use websocket::TwilioMediaStream;
