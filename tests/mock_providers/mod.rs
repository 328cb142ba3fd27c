//! Mock peers for integration tests
//!
//! - [`realtime_mock`]: a local WebSocket server speaking the OpenAI Realtime
//!   event protocol, used in place of the real assistant endpoint
//! - [`scripted_sides`]: channel-driven telephony and assistant sides for
//!   driving a `RelaySession` without any network

// Each test binary uses a different subset of the helpers
#![allow(dead_code)]

pub mod realtime_mock;
pub mod scripted_sides;
