//! One relayed call.
//!
//! A `RelaySession` owns both sides of a call and runs them from a single
//! task: every telephony and assistant event is handled in turn by the same
//! loop, so `SessionState` needs no locking. The loop ends when either side
//! closes, fails, or the caller hangs up; `stop` then closes whatever is
//! still open and writes the capture.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use tracing::{debug, error, info, trace, warn};

use super::config::{ConfigureTrigger, RelayConfig};
use super::interruption::InterruptionController;
use super::sink::{AudioSink, capture_key};
use super::state::SessionState;
use crate::core::realtime::{
    AssistantCommand, AssistantEvent, AssistantSide, RealtimeError, RealtimeResult,
};
use crate::core::telephony::{
    RESPONSE_PART_MARK, TelephonyError, TelephonyEvent, TelephonyFrame, TelephonyResult,
    TelephonySide,
};

/// Lifecycle of a relay session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Created, assistant not yet connected
    Open,
    /// Relaying audio
    Active,
    /// Shutting down
    Closing,
    /// Both sides closed and the capture written
    Closed,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionPhase::Open => write!(f, "open"),
            SessionPhase::Active => write!(f, "active"),
            SessionPhase::Closing => write!(f, "closing"),
            SessionPhase::Closed => write!(f, "closed"),
        }
    }
}

/// Relay between one telephony stream and one assistant connection.
pub struct RelaySession<T: TelephonySide, A: AssistantSide> {
    session_id: String,
    config: RelayConfig,
    telephony: T,
    assistant: A,
    sink: Option<Arc<dyn AudioSink>>,
    state: SessionState,
    controller: InterruptionController,
    phase: SessionPhase,
    configured: bool,
    telephony_open: bool,
    assistant_open: bool,
}

impl<T: TelephonySide, A: AssistantSide> RelaySession<T, A> {
    pub fn new(config: RelayConfig, telephony: T, assistant: A) -> Self {
        let controller = InterruptionController::new(config.show_timing_math);
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            config,
            telephony,
            assistant,
            sink: None,
            state: SessionState::new(),
            controller,
            phase: SessionPhase::Open,
            configured: false,
            telephony_open: true,
            assistant_open: false,
        }
    }

    /// Write the caller audio to `sink` when the session stops.
    pub fn with_sink(mut self, sink: Arc<dyn AudioSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Connect the assistant side.
    ///
    /// The session configuration itself is sent later, from [`run`](Self::run),
    /// according to the configured trigger.
    pub async fn start(&mut self) -> RealtimeResult<()> {
        if self.phase != SessionPhase::Open {
            return Ok(());
        }

        if let Err(e) = self.assistant.connect().await {
            error!(session_id = %self.session_id, "Failed to connect to assistant: {}", e);
            self.phase = SessionPhase::Closing;
            return Err(e);
        }

        self.assistant_open = true;
        self.phase = SessionPhase::Active;
        info!(session_id = %self.session_id, "Connected to the assistant");
        Ok(())
    }

    /// Run the call to completion.
    ///
    /// Starts the session if needed, relays until either side ends, then
    /// stops. Always leaves the session [`SessionPhase::Closed`].
    pub async fn run(&mut self) {
        if self.phase == SessionPhase::Open {
            // Connection failures are already logged; stop still flushes.
            let _ = self.start().await;
        }

        let delay = match self.config.configure_trigger {
            ConfigureTrigger::Delay(delay) => Some(delay),
            ConfigureTrigger::SessionCreated => None,
        };
        let mut configure_pending = delay.is_some() && !self.configured;
        let configure_timer = tokio::time::sleep(delay.unwrap_or_default());
        tokio::pin!(configure_timer);

        while self.phase == SessionPhase::Active {
            tokio::select! {
                _ = &mut configure_timer, if configure_pending => {
                    configure_pending = false;
                    self.send_configuration().await;
                }
                event = self.telephony.recv() => self.on_telephony(event).await,
                event = self.assistant.next_event() => self.on_assistant(event).await,
            }
        }

        self.stop().await;
    }

    /// Close both sides and write the capture.
    ///
    /// Idempotent: only the first call closes connections and writes.
    pub async fn stop(&mut self) {
        if self.phase == SessionPhase::Closed {
            return;
        }
        self.phase = SessionPhase::Closing;

        if self.assistant_open {
            self.assistant_open = false;
            if let Err(e) = self.assistant.disconnect().await {
                warn!(session_id = %self.session_id, "Error disconnecting assistant: {}", e);
            }
        }

        if self.telephony_open {
            self.telephony_open = false;
            if let Err(e) = self.telephony.close().await {
                warn!(session_id = %self.session_id, "Error closing telephony stream: {}", e);
            }
        }

        self.flush_capture().await;
        self.phase = SessionPhase::Closed;
        info!(session_id = %self.session_id, "Relay session closed");
    }

    async fn flush_capture(&mut self) {
        let audio = self.state.take_capture();
        let Some(sink) = &self.sink else {
            return;
        };

        let key = capture_key(self.state.stream_id(), &self.session_id);
        let size = audio.len();
        match sink.write(&key, audio).await {
            Ok(()) => info!(
                session_id = %self.session_id,
                "Saved {} bytes of caller audio to {}", size, key
            ),
            Err(e) => error!(
                session_id = %self.session_id,
                "Failed to save caller audio to {}: {}", key, e
            ),
        }
    }

    async fn send_configuration(&mut self) {
        if self.configured {
            return;
        }
        self.configured = true;

        debug!(session_id = %self.session_id, "Sending session update: {:?}", self.config.session);
        let command = AssistantCommand::Configure(self.config.session.clone());
        if let Err(e) = self.assistant.send_command(command).await {
            self.assistant_failed(e);
            return;
        }

        if let Some(text) = self.config.initial_greeting.clone() {
            debug!(session_id = %self.session_id, "Sending initial greeting prompt");
            if let Err(e) = self.assistant.send_command(AssistantCommand::Greet { text }).await {
                self.assistant_failed(e);
            }
        }
    }

    // -------------------------------------------------------------------------
    // Telephony side
    // -------------------------------------------------------------------------

    async fn on_telephony(&mut self, event: Option<TelephonyResult<TelephonyEvent>>) {
        match event {
            Some(Ok(event)) => self.handle_telephony_event(event).await,
            Some(Err(e)) if !e.is_fatal() => {
                warn!(session_id = %self.session_id, "Dropping telephony frame: {}", e);
            }
            Some(Err(e)) => {
                error!(session_id = %self.session_id, "Telephony connection failed: {}", e);
                self.telephony_open = false;
                self.phase = SessionPhase::Closing;
            }
            None => {
                info!(session_id = %self.session_id, "Telephony connection closed");
                self.telephony_open = false;
                self.phase = SessionPhase::Closing;
            }
        }
    }

    async fn handle_telephony_event(&mut self, event: TelephonyEvent) {
        match event {
            TelephonyEvent::Connected => {
                debug!(session_id = %self.session_id, "Telephony stream connected");
            }
            TelephonyEvent::Start { stream_id, call_id } => {
                info!(
                    session_id = %self.session_id,
                    stream_id = %stream_id,
                    call_id = ?call_id,
                    "Incoming stream has started"
                );
                self.state.begin_stream(stream_id);
            }
            TelephonyEvent::Media {
                timestamp_ms,
                payload,
            } => self.handle_media(timestamp_ms, payload).await,
            TelephonyEvent::Mark { name } => {
                if self.state.pop_ack().is_none() {
                    debug!(session_id = %self.session_id, "Mark {} with no pending acknowledgment", name);
                }
            }
            TelephonyEvent::Stop => {
                info!(session_id = %self.session_id, "Telephony stream stopped");
                self.phase = SessionPhase::Closing;
            }
            TelephonyEvent::Dtmf { digit } => {
                info!(session_id = %self.session_id, "Received DTMF digit {}", digit);
            }
            TelephonyEvent::Other { event } => {
                debug!(session_id = %self.session_id, "Ignoring telephony event {}", event);
            }
        }
    }

    async fn handle_media(&mut self, timestamp_ms: u64, payload: String) {
        let audio = match BASE64.decode(payload.as_bytes()) {
            Ok(audio) => Bytes::from(audio),
            Err(e) => {
                warn!(session_id = %self.session_id, "Dropping media frame with invalid payload: {}", e);
                return;
            }
        };

        if !self.state.observe_media(timestamp_ms) {
            debug!(
                session_id = %self.session_id,
                "Out-of-order media timestamp {}ms behind clock {}ms",
                timestamp_ms,
                self.state.media_clock()
            );
        }
        if self.config.show_timing_math {
            info!("Received media message with timestamp: {}ms", timestamp_ms);
        }

        let sent = self.assistant.send_audio(payload).await;
        self.state.capture(audio);
        if let Err(e) = sent {
            self.assistant_failed(e);
        }
    }

    // -------------------------------------------------------------------------
    // Assistant side
    // -------------------------------------------------------------------------

    async fn on_assistant(&mut self, event: Option<RealtimeResult<AssistantEvent>>) {
        match event {
            Some(Ok(event)) => self.handle_assistant_event(event).await,
            Some(Err(e)) => self.assistant_failed(e),
            None => {
                info!(session_id = %self.session_id, "Assistant connection closed");
                self.assistant_open = false;
                self.phase = SessionPhase::Closing;
            }
        }
    }

    async fn handle_assistant_event(&mut self, event: AssistantEvent) {
        match event {
            AssistantEvent::SessionCreated { session_id } => {
                debug!(session_id = %self.session_id, "Assistant session {} created", session_id);
                if self.config.configure_trigger == ConfigureTrigger::SessionCreated {
                    self.send_configuration().await;
                }
            }
            AssistantEvent::SessionUpdated => {
                debug!(session_id = %self.session_id, "Assistant session configured");
            }
            AssistantEvent::AudioDelta { payload, item_id } => {
                self.handle_audio_delta(payload, item_id).await;
            }
            AssistantEvent::AudioDone { item_id } => {
                if self.state.complete_utterance(item_id.as_deref()) {
                    debug!(session_id = %self.session_id, "Utterance played out");
                }
            }
            AssistantEvent::SpeechStarted { audio_start_ms } => {
                debug!(session_id = %self.session_id, "Caller speech started at {}ms", audio_start_ms);
                self.handle_speech_started().await;
            }
            AssistantEvent::Error { message } => {
                warn!(session_id = %self.session_id, "Assistant reported error: {}", message);
            }
            other => {
                trace!(session_id = %self.session_id, "Assistant event {}", other.kind());
            }
        }
    }

    async fn handle_audio_delta(&mut self, payload: String, item_id: Option<String>) {
        let Some(stream_id) = self.state.stream_id().map(str::to_string) else {
            warn!(session_id = %self.session_id, "Dropping assistant audio received before the stream started");
            return;
        };

        let media = TelephonyFrame::Media {
            stream_id: stream_id.clone(),
            payload,
        };
        if let Err(e) = self.telephony.send(media).await {
            self.telephony_failed(e);
            return;
        }

        if let Some(item_id) = item_id.as_deref() {
            self.state.begin_utterance(item_id);
        }
        if let Some(anchor) = self.state.anchor_response()
            && self.config.show_timing_math
        {
            info!("Setting start timestamp for new response: {}ms", anchor);
        }

        let mark = TelephonyFrame::Mark {
            stream_id,
            name: RESPONSE_PART_MARK.to_string(),
        };
        match self.telephony.send(mark).await {
            Ok(()) => self.state.push_ack(RESPONSE_PART_MARK),
            Err(e) => self.telephony_failed(e),
        }
    }

    async fn handle_speech_started(&mut self) {
        let Some(interruption) = self.controller.on_speech_started(&mut self.state) else {
            return;
        };

        info!(
            session_id = %self.session_id,
            "Caller interrupted after {}ms of playback", interruption.elapsed_ms
        );

        if let Some(truncate) = interruption.truncate
            && let Err(e) = self.assistant.send_command(truncate).await
        {
            self.assistant_failed(e);
        }
        if let Some(clear) = interruption.clear
            && let Err(e) = self.telephony.send(clear).await
        {
            self.telephony_failed(e);
        }
    }

    fn assistant_failed(&mut self, e: RealtimeError) {
        error!(session_id = %self.session_id, "Assistant connection failed: {}", e);
        self.phase = SessionPhase::Closing;
    }

    fn telephony_failed(&mut self, e: TelephonyError) {
        error!(session_id = %self.session_id, "Telephony send failed: {}", e);
        self.phase = SessionPhase::Closing;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::realtime::ConnectionState;
    use crate::core::relay::sink::SinkError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::mpsc;

    /// Outbound traffic from both sides, in send order.
    #[derive(Debug, Clone, PartialEq)]
    enum Sent {
        Assistant(AssistantCommand),
        Telephony(TelephonyFrame),
        AssistantDisconnect,
        TelephonyClose,
    }

    type Log = Arc<Mutex<Vec<Sent>>>;

    struct FakeTelephony {
        inbound: mpsc::UnboundedReceiver<TelephonyResult<TelephonyEvent>>,
        log: Log,
    }

    #[async_trait]
    impl TelephonySide for FakeTelephony {
        async fn recv(&mut self) -> Option<TelephonyResult<TelephonyEvent>> {
            self.inbound.recv().await
        }

        async fn send(&mut self, frame: TelephonyFrame) -> TelephonyResult<()> {
            self.log.lock().unwrap().push(Sent::Telephony(frame));
            Ok(())
        }

        async fn close(&mut self) -> TelephonyResult<()> {
            self.log.lock().unwrap().push(Sent::TelephonyClose);
            Ok(())
        }
    }

    struct FakeAssistant {
        events: mpsc::UnboundedReceiver<RealtimeResult<AssistantEvent>>,
        log: Log,
        state: ConnectionState,
    }

    #[async_trait]
    impl AssistantSide for FakeAssistant {
        async fn connect(&mut self) -> RealtimeResult<()> {
            self.state = ConnectionState::Connected;
            Ok(())
        }

        async fn disconnect(&mut self) -> RealtimeResult<()> {
            self.state = ConnectionState::Disconnected;
            self.log.lock().unwrap().push(Sent::AssistantDisconnect);
            Ok(())
        }

        fn is_ready(&self) -> bool {
            self.state == ConnectionState::Connected
        }

        fn get_connection_state(&self) -> ConnectionState {
            self.state
        }

        async fn send_command(&mut self, command: AssistantCommand) -> RealtimeResult<()> {
            self.log.lock().unwrap().push(Sent::Assistant(command));
            Ok(())
        }

        async fn next_event(&mut self) -> Option<RealtimeResult<AssistantEvent>> {
            self.events.recv().await
        }
    }

    #[derive(Default)]
    struct MemorySink {
        writes: Mutex<Vec<(String, Bytes)>>,
    }

    #[async_trait]
    impl AudioSink for MemorySink {
        async fn write(&self, key: &str, audio: Bytes) -> Result<(), SinkError> {
            self.writes.lock().unwrap().push((key.to_string(), audio));
            Ok(())
        }
    }

    struct Harness {
        session: RelaySession<FakeTelephony, FakeAssistant>,
        telephony_tx: mpsc::UnboundedSender<TelephonyResult<TelephonyEvent>>,
        assistant_tx: mpsc::UnboundedSender<RealtimeResult<AssistantEvent>>,
        log: Log,
        sink: Arc<MemorySink>,
    }

    fn harness(config: RelayConfig) -> Harness {
        let log: Log = Arc::default();
        let (telephony_tx, inbound) = mpsc::unbounded_channel();
        let (assistant_tx, events) = mpsc::unbounded_channel();
        let sink = Arc::new(MemorySink::default());
        let session = RelaySession::new(
            config,
            FakeTelephony {
                inbound,
                log: log.clone(),
            },
            FakeAssistant {
                events,
                log: log.clone(),
                state: ConnectionState::Disconnected,
            },
        )
        .with_session_id("sess-1")
        .with_sink(sink.clone());

        Harness {
            session,
            telephony_tx,
            assistant_tx,
            log,
            sink,
        }
    }

    fn sent(log: &Log) -> Vec<Sent> {
        log.lock().unwrap().clone()
    }

    fn start(stream_id: &str) -> TelephonyEvent {
        TelephonyEvent::Start {
            stream_id: stream_id.to_string(),
            call_id: None,
        }
    }

    fn media(timestamp_ms: u64, payload: &str) -> TelephonyEvent {
        TelephonyEvent::Media {
            timestamp_ms,
            payload: payload.to_string(),
        }
    }

    fn delta(item_id: &str) -> AssistantEvent {
        AssistantEvent::AudioDelta {
            payload: "//8=".to_string(),
            item_id: Some(item_id.to_string()),
        }
    }

    #[tokio::test]
    async fn test_media_is_forwarded_and_captured() {
        let mut h = harness(RelayConfig::default());
        h.session.handle_telephony_event(start("S1")).await;
        h.session.handle_telephony_event(media(20, "AQID")).await;

        assert_eq!(h.session.state().media_clock(), 20);
        assert_eq!(h.session.state().captured_segments(), 1);
        assert_eq!(
            sent(&h.log),
            vec![Sent::Assistant(AssistantCommand::AppendAudio {
                payload: "AQID".to_string()
            })]
        );
    }

    #[tokio::test]
    async fn test_invalid_media_payload_is_dropped() {
        let mut h = harness(RelayConfig::default());
        h.session.handle_telephony_event(start("S1")).await;
        h.session.handle_telephony_event(media(40, "%%%not-base64")).await;

        assert_eq!(h.session.state().media_clock(), 0);
        assert_eq!(h.session.state().captured_segments(), 0);
        assert!(sent(&h.log).is_empty());
    }

    #[tokio::test]
    async fn test_audio_delta_before_start_is_dropped() {
        let mut h = harness(RelayConfig::default());
        h.session.handle_assistant_event(delta("U1")).await;

        assert!(sent(&h.log).is_empty());
        assert!(h.session.state().response_anchor().is_none());
        assert!(h.session.state().current_utterance_id().is_none());
        assert_eq!(h.session.state().pending_ack_count(), 0);
    }

    #[tokio::test]
    async fn test_audio_delta_sends_media_then_mark() {
        let mut h = harness(RelayConfig::default());
        h.session.handle_telephony_event(start("S1")).await;
        h.session.handle_telephony_event(media(200, "AQID")).await;
        h.log.lock().unwrap().clear();

        h.session.handle_assistant_event(delta("U1")).await;
        h.session.handle_telephony_event(media(260, "AQID")).await;
        h.session.handle_assistant_event(delta("U1")).await;

        let state = h.session.state();
        assert_eq!(state.response_anchor(), Some(200));
        assert_eq!(state.current_utterance_id(), Some("U1"));
        assert_eq!(state.pending_ack_count(), 2);

        let log = sent(&h.log);
        assert_eq!(
            log[0],
            Sent::Telephony(TelephonyFrame::Media {
                stream_id: "S1".to_string(),
                payload: "//8=".to_string()
            })
        );
        assert_eq!(
            log[1],
            Sent::Telephony(TelephonyFrame::Mark {
                stream_id: "S1".to_string(),
                name: "responsePart".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_marks_pop_acks_and_extra_mark_is_noop() {
        let mut h = harness(RelayConfig::default());
        h.session.handle_telephony_event(start("S1")).await;
        h.session.handle_assistant_event(delta("U1")).await;
        let mark = || TelephonyEvent::Mark {
            name: "responsePart".to_string(),
        };

        h.session.handle_telephony_event(mark()).await;
        assert_eq!(h.session.state().pending_ack_count(), 0);
        h.session.handle_telephony_event(mark()).await;
        assert_eq!(h.session.state().pending_ack_count(), 0);
    }

    #[tokio::test]
    async fn test_barge_in_truncates_then_clears() {
        let mut h = harness(RelayConfig::default());
        h.session.handle_telephony_event(start("S1")).await;
        h.session.handle_telephony_event(media(200, "AQID")).await;
        h.session.handle_assistant_event(delta("U1")).await;
        h.session.handle_assistant_event(delta("U1")).await;
        h.session.handle_telephony_event(media(800, "AQID")).await;
        h.log.lock().unwrap().clear();

        h.session
            .handle_assistant_event(AssistantEvent::SpeechStarted { audio_start_ms: 0 })
            .await;

        assert_eq!(
            sent(&h.log),
            vec![
                Sent::Assistant(AssistantCommand::Truncate {
                    item_id: "U1".to_string(),
                    content_index: 0,
                    audio_end_ms: 600,
                }),
                Sent::Telephony(TelephonyFrame::Clear {
                    stream_id: "S1".to_string()
                }),
            ]
        );
        let state = h.session.state();
        assert!(state.current_utterance_id().is_none());
        assert!(state.response_anchor().is_none());
        assert_eq!(state.pending_ack_count(), 0);
    }

    #[tokio::test]
    async fn test_speech_started_with_nothing_playing_sends_nothing() {
        let mut h = harness(RelayConfig::default());
        h.session.handle_telephony_event(start("S1")).await;
        h.session
            .handle_assistant_event(AssistantEvent::SpeechStarted { audio_start_ms: 0 })
            .await;
        assert!(sent(&h.log).is_empty());
    }

    #[tokio::test]
    async fn test_audio_done_clears_once_playback_acknowledged() {
        let mut h = harness(RelayConfig::default());
        h.session.handle_telephony_event(start("S1")).await;
        h.session.handle_assistant_event(delta("U1")).await;
        h.session
            .handle_assistant_event(AssistantEvent::AudioDone {
                item_id: Some("U1".to_string()),
            })
            .await;

        // The part is still queued on the telephony side.
        assert_eq!(h.session.state().current_utterance_id(), Some("U1"));
        assert_eq!(h.session.state().response_anchor(), Some(0));

        h.session
            .handle_telephony_event(TelephonyEvent::Mark {
                name: "responsePart".to_string(),
            })
            .await;
        assert!(h.session.state().current_utterance_id().is_none());
        assert!(h.session.state().response_anchor().is_none());
    }

    #[tokio::test]
    async fn test_configuration_sent_once_with_greeting() {
        let config = RelayConfig {
            initial_greeting: Some("Greet the caller".to_string()),
            configure_trigger: ConfigureTrigger::SessionCreated,
            ..RelayConfig::default()
        };
        let mut h = harness(config.clone());
        let created = || AssistantEvent::SessionCreated {
            session_id: "sess_abc".to_string(),
        };

        h.session.handle_assistant_event(created()).await;
        h.session.handle_assistant_event(created()).await;

        assert_eq!(
            sent(&h.log),
            vec![
                Sent::Assistant(AssistantCommand::Configure(config.session.clone())),
                Sent::Assistant(AssistantCommand::Greet {
                    text: "Greet the caller".to_string()
                }),
            ]
        );
    }

    #[tokio::test]
    async fn test_session_created_ignored_with_delay_trigger() {
        let mut h = harness(RelayConfig::default());
        h.session
            .handle_assistant_event(AssistantEvent::SessionCreated {
                session_id: "sess_abc".to_string(),
            })
            .await;
        assert!(sent(&h.log).is_empty());
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let mut h = harness(RelayConfig::default());
        h.session.start().await.unwrap();
        h.session.handle_telephony_event(start("S1")).await;
        h.session.handle_telephony_event(media(20, "AQID")).await;
        h.session.handle_telephony_event(media(40, "BAU=")).await;

        h.session.stop().await;
        h.session.stop().await;

        assert_eq!(h.session.phase(), SessionPhase::Closed);
        let writes = h.sink.writes.lock().unwrap();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].0, "S1/audio.raw");
        assert_eq!(writes[0].1, Bytes::from_static(&[1, 2, 3, 4, 5]));

        let log = sent(&h.log);
        assert_eq!(
            log.iter().filter(|s| **s == Sent::AssistantDisconnect).count(),
            1
        );
        assert_eq!(log.iter().filter(|s| **s == Sent::TelephonyClose).count(), 1);
    }

    #[tokio::test]
    async fn test_run_configures_after_delay_and_stops_on_hangup() {
        let config = RelayConfig {
            configure_trigger: ConfigureTrigger::Delay(Duration::from_millis(10)),
            ..RelayConfig::default()
        };
        let mut h = harness(config);
        let telephony_tx = h.telephony_tx.clone();
        let log = h.log.clone();

        let driver = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            telephony_tx.send(Ok(start("S1"))).unwrap();
            telephony_tx.send(Ok(TelephonyEvent::Stop)).unwrap();
        });

        tokio::time::timeout(Duration::from_secs(5), h.session.run())
            .await
            .unwrap();
        driver.await.unwrap();

        let log = sent(&log);
        assert!(matches!(log[0], Sent::Assistant(AssistantCommand::Configure(_))));
        assert_eq!(
            log.iter()
                .filter(|s| matches!(s, Sent::Assistant(AssistantCommand::Configure(_))))
                .count(),
            1
        );
        assert_eq!(h.session.phase(), SessionPhase::Closed);
        assert_eq!(h.sink.writes.lock().unwrap()[0].0, "S1/audio.raw");
    }

    #[tokio::test]
    async fn test_malformed_telephony_frame_does_not_end_session() {
        let mut h = harness(RelayConfig::default());
        h.session.start().await.unwrap();
        h.session
            .on_telephony(Some(Err(TelephonyError::MalformedFrame("bad".to_string()))))
            .await;
        assert_eq!(h.session.phase(), SessionPhase::Active);

        h.session
            .on_telephony(Some(Err(TelephonyError::Transport("reset".to_string()))))
            .await;
        assert_eq!(h.session.phase(), SessionPhase::Closing);
    }

    #[tokio::test]
    async fn test_assistant_close_ends_session() {
        let mut h = harness(RelayConfig::default());
        h.session.start().await.unwrap();
        drop(h.assistant_tx);

        tokio::time::timeout(Duration::from_secs(5), h.session.run())
            .await
            .unwrap();

        let log = sent(&h.log);
        assert!(!log.contains(&Sent::AssistantDisconnect));
        assert!(log.contains(&Sent::TelephonyClose));
        assert_eq!(h.sink.writes.lock().unwrap()[0].0, "sess-1/audio.raw");
        drop(h.telephony_tx);
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_timing_math_logs_media_timestamps_at_info() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let config = RelayConfig {
            show_timing_math: true,
            ..RelayConfig::default()
        };
        let mut h = harness(config);
        h.session.handle_telephony_event(start("S1")).await;
        h.session.handle_telephony_event(media(1234, "AQID")).await;

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("Received media message with timestamp: 1234ms"));
    }
}
