//! Session state. One instance, owned by the app, passed `&mut` into every
//! handler; there are no ambient globals.

use shared::settings::TutorSettings;

use crate::effect::{Effect, MessageId};

/// Connection status as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    /// The server closed the connection deliberately. Only a manual backend
    /// restart (and an explicit reconnect) recovers from this.
    Errored,
}

/// The one response currently being streamed into a chat message.
#[derive(Debug, Clone, PartialEq)]
pub struct InFlightResponse {
    pub target: MessageId,
    /// Full text received so far. Chunks are cumulative, so this is always
    /// a replacement, never an append.
    pub content: String,
}

/// A message held back while a settings change forces a reconnect.
/// Consumed exactly once, right after the next successful connection.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequest {
    pub message: String,
    pub settings: TutorSettings,
}

/// All chat-session state.
#[derive(Debug)]
pub struct SessionState {
    pub status: ConnectionStatus,
    /// Current reconnection attempt count; zero while connected.
    pub retries: u32,
    /// Set while a question is out and its answer has not completed. The
    /// send path refuses new messages while this is set.
    pub waiting_for_response: bool,
    pub in_flight: Option<InFlightResponse>,
    /// Settings attached to the previous send; the continuity check compares
    /// against these.
    pub last_used: Option<TutorSettings>,
    pub pending: Option<PendingRequest>,
    pub tutor_ready: bool,
    pub image_analyzer_ready: bool,
    next_message_id: MessageId,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            retries: 0,
            waiting_for_response: false,
            in_flight: None,
            last_used: None,
            pending: None,
            tutor_ready: false,
            image_analyzer_ready: false,
            next_message_id: 0,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }

    /// Allocate a fresh display-target handle.
    pub fn alloc_message_id(&mut self) -> MessageId {
        self.next_message_id += 1;
        self.next_message_id
    }

    /// Drop any in-progress response state. Runs on connect, disconnect and
    /// error so stale streaming state can never leak across connection
    /// boundaries. Safe to call any number of times.
    pub fn reset_response_state(&mut self) -> Vec<Effect> {
        self.in_flight = None;
        self.waiting_for_response = false;
        vec![Effect::ShowTyping(false)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_ids_are_monotonic() {
        let mut state = SessionState::new();
        let a = state.alloc_message_id();
        let b = state.alloc_message_id();
        assert!(b > a);
    }

    #[test]
    fn test_reset_clears_streaming_state() {
        let mut state = SessionState::new();
        state.waiting_for_response = true;
        state.in_flight = Some(InFlightResponse {
            target: 1,
            content: "partial".into(),
        });

        let effects = state.reset_response_state();

        assert!(state.in_flight.is_none());
        assert!(!state.waiting_for_response);
        assert_eq!(effects, vec![Effect::ShowTyping(false)]);
    }
}
