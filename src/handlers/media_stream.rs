//! Media stream WebSocket handler
//!
//! Each accepted connection is one phone call: the handler pairs the
//! telephony WebSocket with a fresh assistant connection and runs a
//! `RelaySession` until either side goes away.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use tracing::{error, info};

use crate::core::realtime::OpenAIRealtime;
use crate::core::relay::RelaySession;
use crate::core::telephony::{TelephonySide, TwilioMediaStream};
use crate::state::AppState;

/// Maximum WebSocket frame size (1 MB)
const MAX_WS_FRAME_SIZE: usize = 1024 * 1024;

/// Maximum WebSocket message size (1 MB)
const MAX_WS_MESSAGE_SIZE: usize = 1024 * 1024;

/// Media stream WebSocket handler (`GET /media-stream`)
pub async fn media_stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!("Media stream WebSocket connection upgrade requested");

    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_media_stream(socket, state))
}

async fn handle_media_stream(socket: WebSocket, state: Arc<AppState>) {
    info!("Telephony client connected");
    let mut telephony = TwilioMediaStream::new(socket);

    let assistant = match OpenAIRealtime::new(state.config.realtime_config()) {
        Ok(assistant) => assistant,
        Err(e) => {
            error!("Cannot create assistant connection: {}", e);
            let _ = telephony.close().await;
            return;
        }
    };

    let mut session = RelaySession::new(state.config.relay_config(), telephony, assistant);
    if let Some(sink) = &state.sink {
        session = session.with_sink(sink.clone());
    }

    info!(session_id = %session.session_id(), "Starting relay session");
    session.run().await;
}
