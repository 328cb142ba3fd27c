pub mod realtime;
pub mod relay;
pub mod telephony;

pub use realtime::{AssistantSide, OpenAIRealtime, RealtimeConfig, RealtimeError};
pub use relay::{RelayConfig, RelaySession, SessionState};
pub use telephony::{TelephonyError, TelephonySide, TwilioMediaStream};
