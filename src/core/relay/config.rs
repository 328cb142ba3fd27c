//! Per-session relay configuration.

use std::time::Duration;

use crate::core::realtime::{SessionSettings, TurnDetectionMode};

/// Default pause between assistant connection and session configuration.
pub const DEFAULT_CONFIGURE_DELAY: Duration = Duration::from_millis(250);

/// Upper bound accepted for the configuration delay.
pub const MAX_CONFIGURE_DELAY: Duration = Duration::from_secs(10);

/// Default system instructions for the assistant.
pub const DEFAULT_SYSTEM_MESSAGE: &str = "You are a helpful and friendly voice assistant answering a phone call. \
Keep your answers short and conversational, and stop talking as soon as the caller interrupts you.";

/// Assistant event types logged verbatim unless overridden.
pub const DEFAULT_LOG_EVENT_TYPES: &[&str] = &[
    "error",
    "response.content.done",
    "rate_limits.updated",
    "response.done",
    "input_audio_buffer.committed",
    "input_audio_buffer.speech_stopped",
    "input_audio_buffer.speech_started",
    "session.created",
];

/// When the one-time session configuration is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigureTrigger {
    /// A fixed delay after the assistant connection opens
    Delay(Duration),
    /// As soon as the assistant reports `session.created`
    SessionCreated,
}

impl Default for ConfigureTrigger {
    fn default() -> Self {
        ConfigureTrigger::Delay(DEFAULT_CONFIGURE_DELAY)
    }
}

impl ConfigureTrigger {
    /// Build a trigger from its configuration name and delay.
    ///
    /// Unknown names fall back to the delay trigger; the delay is capped at
    /// [`MAX_CONFIGURE_DELAY`].
    pub fn from_parts(name: &str, delay_ms: u64) -> Self {
        match name.trim().to_lowercase().as_str() {
            "session_created" | "session.created" | "ready" => ConfigureTrigger::SessionCreated,
            _ => ConfigureTrigger::Delay(Duration::from_millis(delay_ms).min(MAX_CONFIGURE_DELAY)),
        }
    }
}

/// Everything a relay session needs besides its two sides and the sink.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Settings sent to the assistant exactly once
    pub session: SessionSettings,
    /// When to send them
    pub configure_trigger: ConfigureTrigger,
    /// Optional prompt that makes the assistant speak first
    pub initial_greeting: Option<String>,
    /// Log the barge-in timing arithmetic
    pub show_timing_math: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            session: SessionSettings {
                voice: "alloy".to_string(),
                instructions: DEFAULT_SYSTEM_MESSAGE.to_string(),
                audio_format: "g711_ulaw".to_string(),
                turn_detection: TurnDetectionMode::ServerVad,
                modalities: vec!["text".to_string(), "audio".to_string()],
                temperature: 0.8,
            },
            configure_trigger: ConfigureTrigger::default(),
            initial_greeting: None,
            show_timing_math: false,
        }
    }
}
