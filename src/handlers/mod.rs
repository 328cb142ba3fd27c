//! HTTP and WebSocket request handlers
//!
//! - `api` - Health check endpoint
//! - `call` - Call-setup responder (TwiML)
//! - `media_stream` - Telephony media stream WebSocket

pub mod api;
pub mod call;
pub mod media_stream;

pub use media_stream::media_stream_handler;
