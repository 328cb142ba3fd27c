//! Per-call relay between the telephony side and the assistant side.
//!
//! - [`SessionState`]: the mutable state of one call
//! - [`InterruptionController`]: barge-in decisions
//! - [`RelaySession`]: owns both sides and runs the call
//! - [`AudioSink`]: where the caller-audio capture goes at hang-up

pub mod config;
pub mod interruption;
pub mod session;
pub mod sink;
pub mod state;

pub use config::{ConfigureTrigger, DEFAULT_LOG_EVENT_TYPES, DEFAULT_SYSTEM_MESSAGE, RelayConfig};
pub use interruption::{Interruption, InterruptionController};
pub use session::{RelaySession, SessionPhase};
pub use sink::{AudioSink, ObjectStoreSink, SinkError, capture_key};
pub use state::SessionState;
