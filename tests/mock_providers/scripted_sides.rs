//! Scripted relay sides
//!
//! Both sides are driven by unbounded channels and record everything the
//! session sends into one shared, ordered log, so tests can assert on the
//! exact interleaving of assistant commands and telephony frames.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use call_relay::realtime::{
    AssistantCommand, AssistantEvent, AssistantSide, ConnectionState, RealtimeResult,
};
use call_relay::relay::{AudioSink, SinkError};
use call_relay::telephony::{TelephonyEvent, TelephonyFrame, TelephonyResult, TelephonySide};

const WAIT_TIMEOUT: Duration = Duration::from_secs(3);

/// One outbound effect of the session.
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Assistant(AssistantCommand),
    Telephony(TelephonyFrame),
    AssistantConnect,
    AssistantDisconnect,
    TelephonyClose,
}

#[derive(Clone, Default)]
pub struct EffectLog(Arc<Mutex<Vec<Sent>>>);

impl EffectLog {
    fn push(&self, sent: Sent) {
        self.0.lock().unwrap().push(sent);
    }

    pub fn snapshot(&self) -> Vec<Sent> {
        self.0.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    /// Everything after the first `skip` entries.
    pub fn since(&self, skip: usize) -> Vec<Sent> {
        self.snapshot().into_iter().skip(skip).collect()
    }

    pub fn count(&self, predicate: impl Fn(&Sent) -> bool) -> usize {
        self.snapshot().iter().filter(|s| predicate(s)).count()
    }

    /// Wait until the log holds at least `len` entries.
    pub async fn wait_len(&self, len: usize) {
        let deadline = tokio::time::Instant::now() + WAIT_TIMEOUT;
        while self.len() < len {
            if tokio::time::Instant::now() >= deadline {
                panic!(
                    "Timed out waiting for {} effects; have {:?}",
                    len,
                    self.snapshot()
                );
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

pub struct ScriptedTelephony {
    inbound: mpsc::UnboundedReceiver<TelephonyResult<TelephonyEvent>>,
    log: EffectLog,
}

#[async_trait]
impl TelephonySide for ScriptedTelephony {
    async fn recv(&mut self) -> Option<TelephonyResult<TelephonyEvent>> {
        self.inbound.recv().await
    }

    async fn send(&mut self, frame: TelephonyFrame) -> TelephonyResult<()> {
        self.log.push(Sent::Telephony(frame));
        Ok(())
    }

    async fn close(&mut self) -> TelephonyResult<()> {
        self.log.push(Sent::TelephonyClose);
        Ok(())
    }
}

pub struct ScriptedAssistant {
    events: mpsc::UnboundedReceiver<RealtimeResult<AssistantEvent>>,
    log: EffectLog,
    state: ConnectionState,
}

#[async_trait]
impl AssistantSide for ScriptedAssistant {
    async fn connect(&mut self) -> RealtimeResult<()> {
        self.state = ConnectionState::Connected;
        self.log.push(Sent::AssistantConnect);
        Ok(())
    }

    async fn disconnect(&mut self) -> RealtimeResult<()> {
        self.state = ConnectionState::Disconnected;
        self.log.push(Sent::AssistantDisconnect);
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    fn get_connection_state(&self) -> ConnectionState {
        self.state
    }

    async fn send_command(&mut self, command: AssistantCommand) -> RealtimeResult<()> {
        self.log.push(Sent::Assistant(command));
        Ok(())
    }

    async fn next_event(&mut self) -> Option<RealtimeResult<AssistantEvent>> {
        self.events.recv().await
    }
}

/// Collects capture writes in memory.
#[derive(Default)]
pub struct MemorySink {
    writes: Mutex<Vec<(String, Bytes)>>,
}

impl MemorySink {
    pub fn writes(&self) -> Vec<(String, Bytes)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl AudioSink for MemorySink {
    async fn write(&self, key: &str, audio: Bytes) -> Result<(), SinkError> {
        self.writes.lock().unwrap().push((key.to_string(), audio));
        Ok(())
    }
}

/// Handles a test keeps after moving the sides into a session.
pub struct Script {
    pub telephony: mpsc::UnboundedSender<TelephonyResult<TelephonyEvent>>,
    pub assistant: mpsc::UnboundedSender<RealtimeResult<AssistantEvent>>,
    pub log: EffectLog,
}

impl Script {
    pub fn caller(&self, event: TelephonyEvent) {
        self.telephony
            .send(Ok(event))
            .expect("session dropped the telephony side");
    }

    pub fn assistant(&self, event: AssistantEvent) {
        self.assistant
            .send(Ok(event))
            .expect("session dropped the assistant side");
    }
}

/// Build a connected pair of scripted sides.
pub fn scripted_sides() -> (ScriptedTelephony, ScriptedAssistant, Script) {
    let log = EffectLog::default();
    let (telephony_tx, inbound) = mpsc::unbounded_channel();
    let (assistant_tx, events) = mpsc::unbounded_channel();

    (
        ScriptedTelephony {
            inbound,
            log: log.clone(),
        },
        ScriptedAssistant {
            events,
            log: log.clone(),
            state: ConnectionState::Disconnected,
        },
        Script {
            telephony: telephony_tx,
            assistant: assistant_tx,
            log,
        },
    )
}

pub fn start_event(stream_id: &str) -> TelephonyEvent {
    TelephonyEvent::Start {
        stream_id: stream_id.to_string(),
        call_id: Some("CA-test".to_string()),
    }
}

pub fn media_event(timestamp_ms: u64, payload: &str) -> TelephonyEvent {
    TelephonyEvent::Media {
        timestamp_ms,
        payload: payload.to_string(),
    }
}

pub fn mark_event(name: &str) -> TelephonyEvent {
    TelephonyEvent::Mark {
        name: name.to_string(),
    }
}

pub fn audio_delta(item_id: &str, payload: &str) -> AssistantEvent {
    AssistantEvent::AudioDelta {
        payload: payload.to_string(),
        item_id: Some(item_id.to_string()),
    }
}
