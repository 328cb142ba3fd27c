//! Barge-in handling.
//!
//! When the caller starts talking over the assistant, the assistant's
//! utterance is cut at the point the caller actually heard, and any audio
//! still buffered on the telephony side is discarded.

use tracing::info;

use super::state::SessionState;
use crate::core::realtime::AssistantCommand;
use crate::core::telephony::TelephonyFrame;

/// Messages produced by one interruption, in the order they must be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct Interruption {
    /// Truncate the assistant's utterance; absent when no utterance id is known
    pub truncate: Option<AssistantCommand>,
    /// Clear buffered telephony playback; absent when no stream has started
    pub clear: Option<TelephonyFrame>,
    /// Milliseconds of the utterance the caller heard
    pub elapsed_ms: u64,
}

/// Decides when and how to interrupt the assistant.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterruptionController {
    show_timing_math: bool,
}

impl InterruptionController {
    pub fn new(show_timing_math: bool) -> Self {
        Self { show_timing_math }
    }

    /// React to the caller starting to speak.
    ///
    /// Returns `None` and leaves `state` untouched when nothing is playing
    /// out. Otherwise resets the in-flight response and returns the truncate
    /// and clear messages; the caller sends truncate first.
    pub fn on_speech_started(&self, state: &mut SessionState) -> Option<Interruption> {
        if state.pending_ack_count() == 0 {
            return None;
        }
        let anchor = state.response_anchor()?;

        let elapsed_ms = state.media_clock().saturating_sub(anchor);
        if self.show_timing_math {
            info!(
                "Calculating elapsed time for truncation: {} - {} = {}ms",
                state.media_clock(),
                anchor,
                elapsed_ms
            );
        }

        let truncate = state
            .current_utterance_id()
            .map(|item_id| AssistantCommand::Truncate {
                item_id: item_id.to_string(),
                content_index: 0,
                audio_end_ms: elapsed_ms,
            });
        if self.show_timing_math
            && let Some(AssistantCommand::Truncate { item_id, .. }) = &truncate
        {
            info!(
                "Truncating item with ID: {}, Truncated at: {}ms",
                item_id, elapsed_ms
            );
        }

        let clear = state.stream_id().map(|stream_id| TelephonyFrame::Clear {
            stream_id: stream_id.to_string(),
        });

        state.clear_response();

        Some(Interruption {
            truncate,
            clear,
            elapsed_ms,
        })
    }
}
