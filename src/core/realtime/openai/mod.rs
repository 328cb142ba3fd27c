//! OpenAI Realtime API module.
//!
//! Speech-to-speech assistant over OpenAI's Realtime WebSocket API. The
//! relay uses it with G.711 u-law in both directions so telephony audio can
//! be forwarded without transcoding.
//!
//! # Supported Models
//!
//! - `gpt-4o-realtime-preview` - GPT-4o Realtime Preview
//! - `gpt-4o-realtime-preview-2024-10-01` - October 2024 version (default)
//! - `gpt-4o-realtime-preview-2024-12-17` - December 2024 version
//! - `gpt-4o-mini-realtime-preview` - Mini model for lower latency
//!
//! # Example
//!
//! ```rust,ignore
//! use call_relay::core::realtime::{AssistantSide, OpenAIRealtime, RealtimeConfig};
//!
//! let mut assistant = OpenAIRealtime::new(RealtimeConfig {
//!     api_key: "sk-...".to_string(),
//!     ..Default::default()
//! })?;
//! assistant.connect().await?;
//! assistant.send_audio(base64_ulaw_frame).await?;
//! while let Some(event) = assistant.next_event().await {
//!     println!("{}", event?.kind());
//! }
//! ```

mod client;
mod config;
mod messages;

pub use client::OpenAIRealtime;
pub use config::{
    Modality, OPENAI_REALTIME_BETA, OPENAI_REALTIME_URL, OpenAIRealtimeAudioFormat,
    OpenAIRealtimeModel, OpenAIRealtimeVoice,
};
pub use messages::{
    ClientEvent, ConversationItem, ServerEvent, ServerMessage, SessionConfig, TurnDetection,
};
