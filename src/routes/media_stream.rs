//! Media stream WebSocket route configuration

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::call::MEDIA_STREAM_PATH;
use crate::handlers::media_stream_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Create the media stream WebSocket router
///
/// # Endpoint
///
/// `GET /media-stream` - WebSocket upgrade for Twilio Media Streams
///
/// # Protocol
///
/// The telephony provider sends `connected`, `start`, `media`, `mark` and
/// `stop` events as JSON text frames; the server answers with `media`,
/// `mark` and `clear` events tagged with the stream's `streamSid`.
pub fn create_media_stream_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(MEDIA_STREAM_PATH, get(media_stream_handler))
        .layer(TraceLayer::new_for_http())
}
