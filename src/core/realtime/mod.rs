//! Assistant side of a relayed call.
//!
//! `AssistantSide` is the seam the relay session talks through; the OpenAI
//! Realtime client is the production implementation and tests substitute
//! scripted fakes.

mod base;
pub mod openai;

pub use base::{
    AssistantCommand, AssistantEvent, AssistantSide, ConnectionState, RealtimeConfig,
    RealtimeError, RealtimeResult, SessionSettings, TurnDetectionMode,
};
pub use openai::{
    OPENAI_REALTIME_URL, OpenAIRealtime, OpenAIRealtimeAudioFormat, OpenAIRealtimeModel,
    OpenAIRealtimeVoice,
};
