//! Call-setup responder.
//!
//! Answers the telephony provider's incoming-call webhook with TwiML that
//! connects the call audio to this server's media stream endpoint.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::{info, warn};

use crate::state::AppState;

/// Path of the media stream WebSocket.
pub const MEDIA_STREAM_PATH: &str = "/media-stream";

/// Escape text for XML content and attribute values.
fn xml_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Build the TwiML that streams the call to `wss://{host}/media-stream`.
pub fn build_twiml(host: &str, greeting: Option<&str>) -> String {
    let mut twiml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Response>\n");
    if let Some(greeting) = greeting {
        twiml.push_str(&format!("    <Say>{}</Say>\n", xml_escape(greeting)));
    }
    twiml.push_str(&format!(
        "    <Connect>\n        <Stream url=\"wss://{}{}\" />\n    </Connect>\n</Response>",
        xml_escape(host),
        MEDIA_STREAM_PATH
    ));
    twiml
}

/// Incoming call webhook (`GET` or `POST /incoming-call`)
///
/// The stream host comes from `public_host` when configured, otherwise from
/// the request's `Host` header.
pub async fn incoming_call(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let host = state.config.public_host.clone().or_else(|| {
        headers
            .get(header::HOST)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    });

    let Some(host) = host else {
        warn!("Incoming call without a Host header and no public host configured");
        return (StatusCode::BAD_REQUEST, "Missing Host header").into_response();
    };

    info!("Incoming call, streaming to wss://{}{}", host, MEDIA_STREAM_PATH);
    let twiml = build_twiml(&host, state.config.connect_greeting.as_deref());
    ([(header::CONTENT_TYPE, "text/xml")], twiml).into_response()
}
