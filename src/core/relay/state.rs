//! Mutable per-call state.
//!
//! Pure data: no I/O, no locking. A `SessionState` belongs to exactly one
//! relay session and is only touched from that session's event loop.

use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};

/// Per-call relay state.
///
/// `response_anchor` and `current_utterance_id` are always cleared together,
/// either by an interruption or once a finished utterance has played out.
/// Acknowledgment tokens leave the queue only from the front or all at once.
#[derive(Debug, Default)]
pub struct SessionState {
    stream_id: Option<String>,
    media_clock: u64,
    response_anchor: Option<u64>,
    current_utterance_id: Option<String>,
    pending_acks: VecDeque<String>,
    utterance_done: bool,
    capture: Vec<Bytes>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new media stream.
    ///
    /// Resets the clock, the in-flight response and the acknowledgment
    /// queue. Captured audio is kept: it belongs to the call, not the stream.
    pub fn begin_stream(&mut self, stream_id: impl Into<String>) {
        self.stream_id = Some(stream_id.into());
        self.media_clock = 0;
        self.clear_response();
    }

    pub fn stream_id(&self) -> Option<&str> {
        self.stream_id.as_deref()
    }

    /// Record an inbound media timestamp.
    ///
    /// The clock never moves backwards within a stream; an older timestamp
    /// is ignored and `false` is returned.
    pub fn observe_media(&mut self, timestamp_ms: u64) -> bool {
        if timestamp_ms < self.media_clock {
            return false;
        }
        self.media_clock = timestamp_ms;
        true
    }

    pub fn media_clock(&self) -> u64 {
        self.media_clock
    }

    /// Anchor the current response at the media clock unless already anchored.
    ///
    /// Returns the new anchor when one was set.
    pub fn anchor_response(&mut self) -> Option<u64> {
        if self.response_anchor.is_some() {
            return None;
        }
        self.response_anchor = Some(self.media_clock);
        self.response_anchor
    }

    pub fn response_anchor(&self) -> Option<u64> {
        self.response_anchor
    }

    pub fn set_current_utterance(&mut self, item_id: impl Into<String>) {
        self.current_utterance_id = Some(item_id.into());
    }

    /// Switch to the utterance an output chunk belongs to.
    ///
    /// A different utterance than the current one drops the old anchor, so
    /// the next `anchor_response` measures from this chunk. Pending acks
    /// stay queued: the caller may still be hearing the previous one.
    pub fn begin_utterance(&mut self, item_id: &str) {
        if self.current_utterance_id.as_deref() == Some(item_id) {
            return;
        }
        if self.current_utterance_id.is_some() || self.utterance_done {
            self.response_anchor = None;
        }
        self.utterance_done = false;
        self.current_utterance_id = Some(item_id.to_string());
    }

    /// The assistant finished generating `item_id` (or the current utterance
    /// when no id is given).
    ///
    /// The response is cleared as soon as every part has been acknowledged,
    /// which may be right away. Returns `true` when it was cleared.
    pub fn complete_utterance(&mut self, item_id: Option<&str>) -> bool {
        let Some(current) = self.current_utterance_id.as_deref() else {
            return false;
        };
        if item_id.is_some_and(|id| id != current) {
            return false;
        }
        self.utterance_done = true;
        self.settle_completed()
    }

    pub fn is_utterance_done(&self) -> bool {
        self.utterance_done
    }

    fn settle_completed(&mut self) -> bool {
        if self.utterance_done && self.pending_acks.is_empty() {
            self.clear_response();
            return true;
        }
        false
    }

    pub fn current_utterance_id(&self) -> Option<&str> {
        self.current_utterance_id.as_deref()
    }

    /// Queue an acknowledgment token for a frame just sent.
    pub fn push_ack(&mut self, token: impl Into<String>) {
        self.pending_acks.push_back(token.into());
    }

    /// Pop the oldest acknowledgment token. Popping an empty queue is a no-op.
    ///
    /// Popping the last token of a completed utterance clears the response.
    pub fn pop_ack(&mut self) -> Option<String> {
        let token = self.pending_acks.pop_front()?;
        self.settle_completed();
        Some(token)
    }

    pub fn pending_ack_count(&self) -> usize {
        self.pending_acks.len()
    }

    pub fn pending_acks(&self) -> impl Iterator<Item = &str> {
        self.pending_acks.iter().map(String::as_str)
    }

    /// Forget the in-flight response: anchor, utterance and pending acks.
    pub fn clear_response(&mut self) {
        self.response_anchor = None;
        self.current_utterance_id = None;
        self.pending_acks.clear();
        self.utterance_done = false;
    }

    /// Append one decoded caller audio segment.
    pub fn capture(&mut self, segment: Bytes) {
        self.capture.push(segment);
    }

    pub fn captured_segments(&self) -> usize {
        self.capture.len()
    }

    /// Drain the capture into one contiguous buffer.
    pub fn take_capture(&mut self) -> Bytes {
        let segments = std::mem::take(&mut self.capture);
        let total = segments.iter().map(Bytes::len).sum();
        let mut buffer = BytesMut::with_capacity(total);
        for segment in segments {
            buffer.extend_from_slice(&segment);
        }
        buffer.freeze()
    }
}
