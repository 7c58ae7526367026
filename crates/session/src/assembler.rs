//! Streaming response assembly.
//!
//! Tracks the single in-flight AI response and turns start/chunk/complete
//! events into display updates. The backend sends the full response text so
//! far in every chunk (cumulative framing), so content is replaced rather
//! than appended; the tests below pin that contract.

use tracing::{debug, warn};

use crate::effect::Effect;
use crate::state::{InFlightResponse, SessionState};

/// Begin a new streamed response.
///
/// Creates the empty display target right away so the user sees the answer
/// slot before the first chunk arrives. Any previous in-flight response is
/// discarded; a well-behaved backend never does this, but a stray start
/// must not fault the client.
pub fn on_start(state: &mut SessionState) -> Vec<Effect> {
    if state.in_flight.is_some() {
        warn!("response started while another was in flight; discarding the old one");
    }
    let id = state.alloc_message_id();
    state.in_flight = Some(InFlightResponse {
        target: id,
        content: String::new(),
    });
    vec![Effect::ShowTyping(false), Effect::BeginAssistant(id)]
}

/// Replace the displayed content with the chunk's cumulative text.
///
/// A chunk with no response in flight is the recovery path: synthesize a
/// visible message for it instead of dropping the content.
pub fn on_chunk(state: &mut SessionState, content: String) -> Vec<Effect> {
    match &mut state.in_flight {
        Some(in_flight) => {
            in_flight.content = content.clone();
            vec![Effect::SetAssistantContent(in_flight.target, content)]
        }
        None => {
            warn!("response chunk arrived with nothing in flight; creating a message for it");
            let id = state.alloc_message_id();
            state.in_flight = Some(InFlightResponse {
                target: id,
                content: content.clone(),
            });
            vec![
                Effect::ShowTyping(false),
                Effect::BeginAssistant(id),
                Effect::SetAssistantContent(id, content),
            ]
        }
    }
}

/// Finish the in-flight response and unlock the send path.
///
/// Clearing `waiting_for_response` here is the single authoritative point
/// that re-admits user input.
pub fn on_complete(state: &mut SessionState) -> Vec<Effect> {
    if state.in_flight.take().is_some() {
        debug!("streaming response complete");
    }
    state.waiting_for_response = false;
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_creates_empty_target_and_hides_typing() {
        let mut state = SessionState::new();
        let effects = on_start(&mut state);

        let in_flight = state.in_flight.as_ref().unwrap();
        assert_eq!(in_flight.content, "");
        assert_eq!(
            effects,
            vec![
                Effect::ShowTyping(false),
                Effect::BeginAssistant(in_flight.target),
            ]
        );
    }

    #[test]
    fn test_chunks_replace_not_append() {
        let mut state = SessionState::new();
        on_start(&mut state);

        on_chunk(&mut state, "Photosynthesis".into());
        let effects = on_chunk(&mut state, "Photosynthesis is how plants".into());

        let in_flight = state.in_flight.as_ref().unwrap();
        assert_eq!(in_flight.content, "Photosynthesis is how plants");
        assert_eq!(
            effects,
            vec![Effect::SetAssistantContent(
                in_flight.target,
                "Photosynthesis is how plants".into()
            )]
        );
    }

    #[test]
    fn test_chunk_without_start_synthesizes_one_message() {
        let mut state = SessionState::new();
        let effects = on_chunk(&mut state, "orphan content".into());

        let in_flight = state.in_flight.as_ref().unwrap();
        let begins = effects
            .iter()
            .filter(|e| matches!(e, Effect::BeginAssistant(_)))
            .count();
        assert_eq!(begins, 1);
        assert!(effects.contains(&Effect::SetAssistantContent(
            in_flight.target,
            "orphan content".into()
        )));
    }

    #[test]
    fn test_second_start_discards_previous() {
        let mut state = SessionState::new();
        on_start(&mut state);
        let first = state.in_flight.as_ref().unwrap().target;

        on_start(&mut state);
        let second = state.in_flight.as_ref().unwrap().target;

        assert_ne!(first, second);
    }

    #[test]
    fn test_complete_unlocks_send_path() {
        let mut state = SessionState::new();
        state.waiting_for_response = true;
        on_start(&mut state);
        on_chunk(&mut state, "done".into());

        let effects = on_complete(&mut state);

        assert!(effects.is_empty());
        assert!(state.in_flight.is_none());
        assert!(!state.waiting_for_response);
    }

    #[test]
    fn test_complete_without_start_is_harmless() {
        let mut state = SessionState::new();
        on_complete(&mut state);
        assert!(state.in_flight.is_none());
    }
}
